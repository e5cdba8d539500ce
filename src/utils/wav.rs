//! PCM to WAV conversion.
//!
//! Prepends the canonical 44-byte RIFF/WAVE header to raw little-endian PCM.
//!
//! | Offset | Size | Field                              |
//! |--------|------|------------------------------------|
//! | 0      | 4    | `"RIFF"`                           |
//! | 4      | 4    | total length − 8                   |
//! | 8      | 4    | `"WAVE"`                           |
//! | 12     | 4    | `"fmt "`                           |
//! | 16     | 4    | 16 (fmt chunk size)                |
//! | 20     | 2    | 1 (PCM)                            |
//! | 22     | 2    | channels                           |
//! | 24     | 4    | sample rate                        |
//! | 28     | 4    | byte rate                          |
//! | 32     | 2    | block align                        |
//! | 34     | 2    | bits per sample                    |
//! | 36     | 4    | `"data"`                           |
//! | 40     | 4    | payload length                     |
//! | 44     | n    | payload                            |

use bytes::BufMut;

/// Size of the canonical WAV header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Layout of the PCM samples being wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for WavFormat {
    /// 16 kHz, mono, 16-bit.
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            bits_per_sample: 16,
        }
    }
}

impl WavFormat {
    /// Bytes per sample frame; saturates for formats the header cannot hold.
    pub fn block_align(&self) -> u16 {
        let bits = u32::from(self.channels) * u32::from(self.bits_per_sample);
        u16::try_from(bits / 8).unwrap_or(u16::MAX)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }
}

/// Wrap 16 kHz mono 16-bit PCM in a WAV container.
pub fn pcm_to_wav(pcm: &[u8]) -> Vec<u8> {
    pcm_to_wav_with_format(pcm, WavFormat::default())
}

/// Wrap PCM with an explicit format in a WAV container.
///
/// Size fields are 32-bit; payloads over 4 GiB saturate them.
pub fn pcm_to_wav_with_format(pcm: &[u8], format: WavFormat) -> Vec<u8> {
    let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);
    let riff_len = data_len.saturating_add((WAV_HEADER_LEN - 8) as u32);

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

    // RIFF chunk descriptor
    buf.put_slice(b"RIFF");
    buf.put_u32_le(riff_len);
    buf.put_slice(b"WAVE");

    // fmt sub-chunk
    buf.put_slice(b"fmt ");
    buf.put_u32_le(FMT_CHUNK_LEN);
    buf.put_u16_le(PCM_FORMAT);
    buf.put_u16_le(format.channels);
    buf.put_u32_le(format.sample_rate);
    buf.put_u32_le(format.byte_rate());
    buf.put_u16_le(format.block_align());
    buf.put_u16_le(format.bits_per_sample);

    // data sub-chunk
    buf.put_slice(b"data");
    buf.put_u32_le(data_len);
    buf.put_slice(pcm);

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(buf: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(buf[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn test_header_layout() {
        let pcm = vec![0x11u8; 100];
        let wav = pcm_to_wav(&pcm);

        assert_eq!(wav.len(), 144);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 136);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 1);
        assert_eq!(u32_at(&wav, 24), 16000);
        assert_eq!(u32_at(&wav, 28), 32000);
        assert_eq!(u16_at(&wav, 32), 2);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 100);
        assert_eq!(&wav[44..], &pcm[..]);
    }

    #[test]
    fn test_empty_payload() {
        let wav = pcm_to_wav(&[]);
        assert_eq!(wav.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&wav, 4), 36);
        assert_eq!(u32_at(&wav, 40), 0);
    }

    #[test]
    fn test_odd_length_payload_is_copied_verbatim() {
        let wav = pcm_to_wav(&[1, 2, 3]);
        assert_eq!(u32_at(&wav, 40), 3);
        assert_eq!(&wav[44..], &[1, 2, 3]);
    }

    #[test]
    fn test_custom_format() {
        let format = WavFormat {
            sample_rate: 48000,
            channels: 2,
            bits_per_sample: 16,
        };
        let wav = pcm_to_wav_with_format(&[0u8; 8], format);

        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 24), 48000);
        assert_eq!(u32_at(&wav, 28), 192000);
        assert_eq!(u16_at(&wav, 32), 4);
    }

    #[test]
    fn test_default_format_matches_fixed_header() {
        let pcm = [7u8; 10];
        assert_eq!(
            pcm_to_wav(&pcm),
            pcm_to_wav_with_format(&pcm, WavFormat::default())
        );
    }

    #[test]
    fn test_oversized_format_saturates() {
        let format = WavFormat {
            sample_rate: u32::MAX,
            channels: u16::MAX,
            bits_per_sample: 32,
        };
        assert_eq!(format.block_align(), u16::MAX);
        assert_eq!(format.byte_rate(), u32::MAX);

        let wav = pcm_to_wav_with_format(&[0u8; 4], format);
        assert_eq!(u16_at(&wav, 32), u16::MAX);
        assert_eq!(u32_at(&wav, 28), u32::MAX);
    }
}

pub mod payload;
pub use payload::{Payload, WebsocketMessage, create_message};
pub mod wav;
pub use wav::{WAV_HEADER_LEN, WavFormat, pcm_to_wav, pcm_to_wav_with_format};

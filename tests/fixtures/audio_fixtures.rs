//! Audio test fixtures.
//!
//! Generated PCM keeps tests reproducible and free of binary files.
//!
//! Audio format:
//! - Sample rate: 16kHz
//! - Bit depth: 16-bit signed PCM, little-endian
//! - Channels: Mono

use std::f32::consts::PI;

/// Sample rate of the generated audio (16kHz)
pub const SAMPLE_RATE: u32 = 16000;

/// 100ms at 16kHz
pub const MS_100: usize = 1600;

/// Generate silence as raw bytes
pub fn generate_silence_bytes(duration_samples: usize) -> Vec<u8> {
    vec![0u8; duration_samples * 2]
}

/// Generate a sine wave tone
pub fn generate_sine_wave(duration_samples: usize, frequency: f32, amplitude: f32) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / SAMPLE_RATE as f32;

    (0..duration_samples)
        .map(|i| ((angular_freq * i as f32).sin() * max_amplitude) as i16)
        .collect()
}

/// Generate a 440Hz (A4) reference tone
pub fn generate_a440_tone(duration_samples: usize) -> Vec<i16> {
    generate_sine_wave(duration_samples, 440.0, 0.5)
}

/// Convert i16 samples to little-endian bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

// Conversion between sample containers and normalized f64 values.

use crate::sample::{widen, Sample};
use crate::{cast, FormatTag, WaveError, WaveResult};

/// Converts samples of one sample format to and from f64 values in the range [-1.0, 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalizer {
    /// Unsigned 8-bit PCM.
    UnsignedPcm8,
    /// Signed PCM with the given number of bits (16 to 64).
    SignedPcm { bits: i32 },
    Float32,
    Float64,
    ALaw,
    MuLaw,
}

impl Normalizer {
    /// Returns the normalizer for the format tag and sample byte width.
    pub fn new(tag: FormatTag, sample_size: usize) -> WaveResult<Normalizer> {
        match (tag, sample_size) {
            (FormatTag::Pcm, 1) => Ok(Normalizer::UnsignedPcm8),
            (FormatTag::Pcm, 2..=8) => {
                let bits = i32::try_from(sample_size * 8)
                    .map_err(|_| WaveError::Param("Invalid sample size".to_string()))?;
                Ok(Normalizer::SignedPcm { bits })
            },
            (FormatTag::IeeeFloat, 4) => Ok(Normalizer::Float32),
            (FormatTag::IeeeFloat, 8) => Ok(Normalizer::Float64),
            (FormatTag::ALaw, 1) => Ok(Normalizer::ALaw),
            (FormatTag::MuLaw, 1) => Ok(Normalizer::MuLaw),
            _ => Err(WaveError::Param(format!(
                "Unsupported sample format for f64 conversion: {:?} with {} byte samples",
                tag, sample_size))),
        }
    }

    /// Decodes a sample container to f64.
    pub fn decode(&self, container: &[u8]) -> f64 {
        match self {
            Normalizer::UnsignedPcm8 => (cast::u8_to_f64(container[0]) - 128.0) / 128.0,
            Normalizer::SignedPcm { bits } => {
                let mut buf = [0u8; 8];
                widen(container, &mut buf, true);
                cast::i64_to_f64(i64::from_le_bytes(buf)) / 2f64.powi(bits - 1)
            },
            Normalizer::Float32 => f64::from(f32::from_le_container(container)),
            Normalizer::Float64 => f64::from_le_container(container),
            Normalizer::ALaw => {
                f64::from(audio_codec_algorithms::decode_alaw(container[0])) / 32768.0
            },
            Normalizer::MuLaw => {
                f64::from(audio_codec_algorithms::decode_ulaw(container[0])) / 32768.0
            },
        }
    }

    /// Encodes an f64 value to a sample container. Integer values are rounded
    /// and clamped to the range of the sample format.
    pub fn encode(&self, value: f64, container: &mut [u8]) {
        match self {
            Normalizer::UnsignedPcm8 => {
                let v = cast::f64_to_i64((value * 128.0).round()).clamp(-128, 127) + 128;
                container[0] = cast::i64_to_u8(v);
            },
            Normalizer::SignedPcm { bits } => {
                let (min, max) = if *bits >= 64 {
                    (i64::MIN, i64::MAX)
                } else {
                    (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
                };
                let v = cast::f64_to_i64((value * 2f64.powi(bits - 1)).round()).clamp(min, max);
                let bytes = v.to_le_bytes();
                let len = container.len().min(bytes.len());
                container[..len].copy_from_slice(&bytes[..len]);
            },
            Normalizer::Float32 => cast::f64_to_f32(value).write_le_container(container),
            Normalizer::Float64 => value.write_le_container(container),
            Normalizer::ALaw => {
                let v = cast::clamp_i64_to_i16(cast::f64_to_i64((value * 32768.0).round()));
                container[0] = audio_codec_algorithms::encode_alaw(v);
            },
            Normalizer::MuLaw => {
                let v = cast::clamp_i64_to_i16(cast::f64_to_i64((value * 32768.0).round()));
                container[0] = audio_codec_algorithms::encode_ulaw(v);
            },
        }
    }
}

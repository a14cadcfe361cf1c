//! Decoders for the audio payloads providers return.
//!
//! WAV, raw PCM, µ-law and A-law payloads decode to linear PCM16 samples.
//! MP3 payloads are carried as-is with their format metadata; the container
//! is already playable and nothing in our stack decompresses MPEG audio.

use bytes::Bytes;
use thiserror::Error;

/// Sample rate assumed for headerless payloads (raw PCM, G.711) when the
/// content type carries no rate parameter.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("not a RIFF/WAVE file")]
    NotWave,
    #[error("truncated WAV chunk: {0}")]
    TruncatedChunk(&'static str),
    #[error("unsupported WAV encoding: format tag {format}, {bits} bits")]
    UnsupportedWavEncoding { format: u16, bits: u16 },
    #[error("audio payload is empty")]
    Empty,
}

/// Wire encoding of an audio payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AudioEncoding {
    Wav,
    Pcm16,
    Mulaw,
    Alaw,
    Mp3,
}

/// Decoded (or carried) audio buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioData {
    /// Linear PCM16 samples ready for playback.
    Pcm {
        sample_rate: u32,
        channels: u16,
        samples: Vec<i16>,
    },
    /// A compressed container carried through unchanged.
    Encoded {
        encoding: AudioEncoding,
        sample_rate: u32,
        channels: u16,
        bytes: Bytes,
    },
}

impl AudioData {
    /// Number of sample frames, when known.
    #[must_use]
    pub fn frame_count(&self) -> Option<usize> {
        match self {
            AudioData::Pcm {
                channels, samples, ..
            } => Some(samples.len() / usize::from((*channels).max(1))),
            AudioData::Encoded { .. } => None,
        }
    }
}

/// Decode a payload according to its wire encoding.
pub fn decode(encoding: AudioEncoding, bytes: &[u8]) -> Result<AudioData, AudioError> {
    decode_with(encoding, bytes, DEFAULT_SAMPLE_RATE, 1)
}

/// Decode a headerless payload with an explicit rate and channel count.
pub fn decode_with(
    encoding: AudioEncoding,
    bytes: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<AudioData, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::Empty);
    }

    match encoding {
        AudioEncoding::Wav => decode_wav(bytes),
        AudioEncoding::Pcm16 => Ok(AudioData::Pcm {
            sample_rate,
            channels,
            samples: pcm16_samples(bytes),
        }),
        AudioEncoding::Mulaw => Ok(AudioData::Pcm {
            sample_rate,
            channels,
            samples: bytes.iter().map(|&b| mulaw_to_linear(b)).collect(),
        }),
        AudioEncoding::Alaw => Ok(AudioData::Pcm {
            sample_rate,
            channels,
            samples: bytes.iter().map(|&b| alaw_to_linear(b)).collect(),
        }),
        AudioEncoding::Mp3 => Ok(AudioData::Encoded {
            encoding: AudioEncoding::Mp3,
            sample_rate,
            channels,
            bytes: Bytes::copy_from_slice(bytes),
        }),
    }
}

fn pcm16_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Parse a RIFF/WAVE container. Only linear PCM16 data chunks are supported;
/// G.711-in-WAV payloads are expanded through the same tables as the raw
/// encodings.
fn decode_wav(bytes: &[u8]) -> Result<AudioData, AudioError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(AudioError::NotWave);
    }

    let mut format_tag: Option<u16> = None;
    let mut channels: u16 = 1;
    let mut sample_rate: u32 = DEFAULT_SAMPLE_RATE;
    let mut bits: u16 = 16;
    let mut data: Option<&[u8]> = None;

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_len = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let body_start = offset + 8;
        let body_end = body_start + chunk_len;
        if body_end > bytes.len() {
            return Err(AudioError::TruncatedChunk("chunk body exceeds file"));
        }
        let body = &bytes[body_start..body_end];

        match chunk_id {
            b"fmt " => {
                if body.len() < 16 {
                    return Err(AudioError::TruncatedChunk("fmt"));
                }
                format_tag = Some(u16::from_le_bytes([body[0], body[1]]));
                channels = u16::from_le_bytes([body[2], body[3]]);
                sample_rate = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
                bits = u16::from_le_bytes([body[14], body[15]]);
            }
            b"data" => data = Some(body),
            _ => {}
        }

        // Chunks are word-aligned
        offset = body_end + (chunk_len & 1);
    }

    let data = data.ok_or(AudioError::TruncatedChunk("data"))?;
    let format = format_tag.ok_or(AudioError::TruncatedChunk("fmt"))?;

    let samples = match (format, bits) {
        // WAVE_FORMAT_PCM
        (1, 16) => pcm16_samples(data),
        // WAVE_FORMAT_ALAW
        (6, 8) => data.iter().map(|&b| alaw_to_linear(b)).collect(),
        // WAVE_FORMAT_MULAW
        (7, 8) => data.iter().map(|&b| mulaw_to_linear(b)).collect(),
        _ => return Err(AudioError::UnsupportedWavEncoding { format, bits }),
    };

    Ok(AudioData::Pcm {
        sample_rate,
        channels,
        samples,
    })
}

const G711_BIAS: i32 = 0x84;

/// G.711 µ-law expansion to linear PCM16.
#[must_use]
pub fn mulaw_to_linear(value: u8) -> i16 {
    let u = !value;
    let mut t = i32::from(u & 0x0F) << 3;
    t += G711_BIAS;
    t <<= (u & 0x70) >> 4;
    let sample = if u & 0x80 != 0 {
        G711_BIAS - t
    } else {
        t - G711_BIAS
    };
    sample as i16
}

/// G.711 A-law expansion to linear PCM16.
#[must_use]
pub fn alaw_to_linear(value: u8) -> i16 {
    let a = value ^ 0x55;
    let mut t = i32::from(a & 0x0F) << 4;
    let seg = (a & 0x70) >> 4;
    match seg {
        0 => t += 8,
        1 => t += 0x108,
        _ => {
            t += 0x108;
            t <<= seg - 1;
        }
    }
    let sample = if a & 0x80 != 0 { t } else { -t };
    sample as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mulaw_reference_values() {
        // Values from the CCITT G.711 reference implementation
        assert_eq!(mulaw_to_linear(0x00), -32124);
        assert_eq!(mulaw_to_linear(0x80), 32124);
        assert_eq!(mulaw_to_linear(0xFF), 0);
        assert_eq!(mulaw_to_linear(0x7F), 0);
    }

    #[test]
    fn alaw_reference_values() {
        assert_eq!(alaw_to_linear(0x55), -8);
        assert_eq!(alaw_to_linear(0xD5), 8);
        assert_eq!(alaw_to_linear(0x2A), -32256);
        assert_eq!(alaw_to_linear(0xAA), 32256);
        assert_eq!(alaw_to_linear(0x7F), -848);
        assert_eq!(alaw_to_linear(0xFF), 848);
    }

    #[test]
    fn decodes_raw_pcm16() {
        let bytes = [0x01, 0x00, 0xFF, 0xFF, 0x00, 0x80];
        let audio = decode(AudioEncoding::Pcm16, &bytes).expect("pcm decodes");
        match audio {
            AudioData::Pcm {
                sample_rate,
                channels,
                samples,
            } => {
                assert_eq!(sample_rate, DEFAULT_SAMPLE_RATE);
                assert_eq!(channels, 1);
                assert_eq!(samples, vec![1, -1, i16::MIN]);
            }
            other => panic!("expected PCM, got {other:?}"),
        }
    }

    fn wav_fixture(format_tag: u16, bits: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes()); // size backfilled below
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&format_tag.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes()); // channels
        out.extend_from_slice(&44_100u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // byte rate, unused
        out.extend_from_slice(&0u16.to_le_bytes()); // block align, unused
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(u32::try_from(data.len()).unwrap()).to_le_bytes());
        out.extend_from_slice(data);
        let riff_len = u32::try_from(out.len() - 8).unwrap();
        out[4..8].copy_from_slice(&riff_len.to_le_bytes());
        out
    }

    #[test]
    fn decodes_wav_pcm16() {
        let wav = wav_fixture(1, 16, &[0x10, 0x00, 0xF0, 0xFF]);
        let audio = decode(AudioEncoding::Wav, &wav).expect("wav decodes");
        match audio {
            AudioData::Pcm {
                sample_rate,
                channels,
                samples,
            } => {
                assert_eq!(sample_rate, 44_100);
                assert_eq!(channels, 2);
                assert_eq!(samples, vec![16, -16]);
            }
            other => panic!("expected PCM, got {other:?}"),
        }
    }

    #[test]
    fn decodes_wav_mulaw() {
        let wav = wav_fixture(7, 8, &[0x00, 0x80]);
        let audio = decode(AudioEncoding::Wav, &wav).expect("wav decodes");
        match audio {
            AudioData::Pcm { samples, .. } => assert_eq!(samples, vec![-32124, 32124]),
            other => panic!("expected PCM, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_wave_bytes() {
        let err = decode(AudioEncoding::Wav, b"OggS garbage here").unwrap_err();
        assert!(matches!(err, AudioError::NotWave));
    }

    #[test]
    fn rejects_unsupported_wav_encoding() {
        let wav = wav_fixture(3, 32, &[0u8; 8]); // IEEE float
        let err = decode(AudioEncoding::Wav, &wav).unwrap_err();
        assert!(matches!(
            err,
            AudioError::UnsupportedWavEncoding { format: 3, bits: 32 }
        ));
    }

    #[test]
    fn mp3_is_carried_encoded() {
        let bytes = [0xFF, 0xFB, 0x90, 0x00];
        let audio = decode_with(AudioEncoding::Mp3, &bytes, 44_100, 2).expect("mp3 carried");
        match audio {
            AudioData::Encoded {
                encoding, bytes, ..
            } => {
                assert_eq!(encoding, AudioEncoding::Mp3);
                assert_eq!(bytes.as_ref(), &[0xFF, 0xFB, 0x90, 0x00]);
            }
            other => panic!("expected encoded, got {other:?}"),
        }
    }

    #[test]
    fn frame_count_accounts_for_channels() {
        let audio = AudioData::Pcm {
            sample_rate: 48_000,
            channels: 2,
            samples: vec![0; 10],
        };
        assert_eq!(audio.frame_count(), Some(5));
    }
}

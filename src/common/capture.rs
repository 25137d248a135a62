use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use hound::{SampleFormat, WavSpec, WavWriter};

/// Encoded media sample attached to a single record.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCapture {
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl MediaCapture {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            mime: "image/jpeg",
            bytes,
        }
    }

    /// 16-bit PCM WAV from interleaved samples.
    pub fn wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Self, hound::Error> {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for sample in samples {
                writer.write_sample(*sample)?;
            }
            writer.finalize()?;
        }

        Ok(Self {
            mime: "audio/wav",
            bytes: cursor.into_inner(),
        })
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }
}

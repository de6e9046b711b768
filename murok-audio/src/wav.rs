use std::io::Cursor;

pub const CLIP_SAMPLE_RATE_HZ: u32 = 16_000;
pub const CLIP_MIME_TYPE: &str = "audio/wav";

/// Encode mono f32 samples as 16-bit PCM WAV bytes.
pub fn encode_mono_wav(samples: &[f32], sample_rate_hz: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &s in samples {
            let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
            writer.write_sample(v)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

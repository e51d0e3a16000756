//! In-memory WAV encoding.

use std::io::{self, Cursor};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Bit depth of encoded audio.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Most mono 16-bit samples a RIFF file can describe: the RIFF size field is a
/// u32 and covers 36 header bytes plus the data.
const MAX_SAMPLES: usize = (u32::MAX as usize - 36) / 2;

/// Encode mono float samples as a 16-bit PCM WAV file.
///
/// Samples are clipped to [-1.0, 1.0] and scaled to the i16 range. The output
/// depends only on the inputs, so encoding the same waveform twice yields
/// identical bytes.
///
/// # Errors
/// Returns an error if the data chunk would exceed the 4 GiB WAV limit.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = WavSpec { channels: 1, sample_rate, bits_per_sample: BITS_PER_SAMPLE, sample_format: SampleFormat::Int };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        let mut pcm = writer.get_i16_writer(sample_count(samples.len())?);
        for &sample in samples {
            pcm.write_sample(to_pcm16(sample));
        }
        pcm.flush()?;
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Number of samples as the u32 the WAV header stores.
fn sample_count(len: usize) -> Result<u32, hound::Error> {
    if len > MAX_SAMPLES {
        return Err(hound::Error::IoError(io::Error::new(io::ErrorKind::InvalidInput, format!("{} samples exceed the WAV size limit", len))));
    }
    Ok(len as u32)
}

/// Convert a float sample to 16-bit PCM with clipping.
fn to_pcm16(sample: f32) -> i16 {
    let clipped = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    (clipped * i16::MAX as f32).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_describes_mono_pcm16() {
        let bytes = encode_wav(&[0.0; 240], 24000).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes.clone())).unwrap();
        let spec = reader.spec();

        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(reader.len(), 240);
        assert_eq!(bytes.len(), 44 + 240 * 2);
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[test]
    fn test_samples_are_clipped_and_scaled() {
        let bytes = encode_wav(&[0.0, 0.5, 1.0, -1.0, 2.0, -3.0, f32::NAN], 24000).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();

        assert_eq!(decoded, vec![0, 16384, 32767, -32767, 32767, -32767, 0]);
    }

    #[test]
    fn test_oversized_waveform_is_rejected() {
        assert_eq!(sample_count(24000).unwrap(), 24000);
        assert_eq!(sample_count(MAX_SAMPLES).unwrap() as usize, MAX_SAMPLES);
        assert!(matches!(sample_count(MAX_SAMPLES + 1), Err(hound::Error::IoError(_))));
        assert!(matches!(sample_count(usize::MAX), Err(hound::Error::IoError(_))));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 50.0).sin()).collect();
        assert_eq!(encode_wav(&samples, 24000).unwrap(), encode_wav(&samples, 24000).unwrap());
    }
}

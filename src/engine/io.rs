//! Audio file I/O for soundlab
//!
//! Reads a WAV file into a fully materialized [`SampleBuffer`] and writes a
//! buffer back out in the encoding it was loaded with. Only uncompressed PCM
//! (8/16/24/32-bit integer or 32-bit float), mono or stereo, is accepted.
//!
//! Writes never leave a partial file behind: samples go to a temp file in the
//! destination directory which is renamed over the target once finalized.

use std::io::{BufWriter, ErrorKind};
use std::path::Path;

use hound::{WavReader, WavSpec, WavWriter};
use log::{debug, info};
use tempfile::NamedTempFile;

use crate::engine::buffer::{ChannelLayout, SampleBuffer, SampleEncoding, SampleFormat};
use crate::error::{Result, SoundLabError};

/// Read a WAV file into memory
///
/// # Arguments
/// * `path` - Path to the WAV file to read
///
/// # Errors
/// * `FileNotFound` - If the file does not exist
/// * `UnsupportedFormat` - If the file is not WAV, is compressed, has more
///   than 2 channels, uses an unsupported bit depth or has a zero sample rate
/// * `EmptyAudio` - If the file holds no sample frames
pub fn read(path: &Path) -> Result<SampleBuffer> {
    if !path.exists() {
        return Err(SoundLabError::FileNotFound {
            path: path.display().to_string(),
            source: None,
        });
    }

    let reader = WavReader::open(path).map_err(|e| map_hound_error(path, e))?;

    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(SoundLabError::UnsupportedFormat {
            format: "WAV header declares a sample rate of 0 Hz".to_string(),
        });
    }
    let channels = spec.channels as usize;

    let layout = ChannelLayout::from_count(channels).ok_or_else(|| {
        SoundLabError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", channels),
        }
    })?;

    let encoding = SampleEncoding::new(spec.bits_per_sample, spec.sample_format.into())?;

    let interleaved = read_samples_as_f32(reader, encoding, path)?;
    if interleaved.is_empty() {
        return Err(SoundLabError::EmptyAudio);
    }

    let buffer = SampleBuffer::from_interleaved(&interleaved, layout, spec.sample_rate, encoding)?;

    info!(
        "Loaded {}: {} frames, {} Hz, {} channel(s), {}-bit {:?}",
        path.display(),
        buffer.len(),
        buffer.sample_rate(),
        buffer.channels(),
        encoding.bits_per_sample,
        encoding.format
    );

    Ok(buffer)
}

/// Write a buffer to a WAV file, replacing any existing file
///
/// The buffer's own encoding decides the output bit depth. Integer samples
/// are rounded and clamped to the target range.
///
/// # Errors
/// * `Io` - If the destination directory is missing or not writable
pub fn write(path: &Path, buffer: &SampleBuffer) -> Result<()> {
    let layout = buffer
        .channel_layout()
        .ok_or_else(|| SoundLabError::UnsupportedFormat {
            format: format!("{}-channel audio (only mono/stereo supported)", buffer.channels()),
        })?;
    let encoding = SampleEncoding::new(buffer.encoding().bits_per_sample, buffer.encoding().format)?;

    let spec = WavSpec {
        channels: layout.num_channels() as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: encoding.bits_per_sample,
        sample_format: encoding.format.into(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    debug!("Writing {} via temp file {}", path.display(), tmp.path().display());

    {
        let mut writer = WavWriter::new(BufWriter::new(tmp.as_file_mut()), spec)
            .map_err(hound_to_io)?;
        write_samples(&mut writer, &buffer.to_interleaved(), encoding)?;
        writer.finalize().map_err(hound_to_io)?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SoundLabError::Io(e.into()))?;

    info!(
        "Wrote {}: {} frames, {}-bit {:?}",
        path.display(),
        buffer.len(),
        encoding.bits_per_sample,
        encoding.format
    );

    Ok(())
}

/// Generate a mono test tone (sine wave) at half amplitude
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> SampleBuffer {
    let silent = SampleBuffer::new(0, ChannelLayout::Mono, sample_rate);
    silent.with_samples(vec![sine(frequency, duration_secs, sample_rate)])
}

/// Generate a stereo test tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> SampleBuffer {
    let silent = SampleBuffer::new(0, ChannelLayout::Stereo, sample_rate);
    silent.with_samples(vec![
        sine(freq_left, duration_secs, sample_rate),
        sine(freq_right, duration_secs, sample_rate),
    ])
}

fn sine(frequency: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    (0..num_samples)
        .map(|i| 0.5 * (angular_freq * i as f32).sin())
        .collect()
}

// ============================================================================
// Internal helper functions
// ============================================================================

impl From<hound::SampleFormat> for SampleFormat {
    fn from(format: hound::SampleFormat) -> Self {
        match format {
            hound::SampleFormat::Int => SampleFormat::Int,
            hound::SampleFormat::Float => SampleFormat::Float,
        }
    }
}

impl From<SampleFormat> for hound::SampleFormat {
    fn from(format: SampleFormat) -> Self {
        match format {
            SampleFormat::Int => hound::SampleFormat::Int,
            SampleFormat::Float => hound::SampleFormat::Float,
        }
    }
}

/// Classify a hound error raised while opening or decoding a file
fn map_hound_error(path: &Path, err: hound::Error) -> SoundLabError {
    match err {
        hound::Error::IoError(e) if e.kind() == ErrorKind::NotFound => {
            SoundLabError::FileNotFound {
                path: path.display().to_string(),
                source: Some(e),
            }
        }
        // Shorter than a RIFF header
        hound::Error::IoError(e) if e.kind() == ErrorKind::UnexpectedEof => {
            SoundLabError::UnsupportedFormat {
                format: "truncated file or not a WAV container".to_string(),
            }
        }
        hound::Error::IoError(e) => SoundLabError::Io(e),
        hound::Error::FormatError(reason) => SoundLabError::UnsupportedFormat {
            format: format!("not a valid WAV file ({})", reason),
        },
        hound::Error::Unsupported => SoundLabError::UnsupportedFormat {
            format: "compressed or unsupported WAV encoding".to_string(),
        },
        hound::Error::UnfinishedSample => SoundLabError::InvalidAudio {
            reason: "file ends in the middle of a sample".to_string(),
        },
        // InvalidSampleFormat, TooWide
        _ => SoundLabError::UnsupportedFormat {
            format: "sample format does not match header".to_string(),
        },
    }
}

fn hound_to_io(err: hound::Error) -> SoundLabError {
    match err {
        hound::Error::IoError(e) => SoundLabError::Io(e),
        other => SoundLabError::Io(std::io::Error::new(ErrorKind::Other, other.to_string())),
    }
}

/// Read all samples from the reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    encoding: SampleEncoding,
    path: &Path,
) -> Result<Vec<f32>> {
    let scale = 1.0 / encoding.full_scale();

    match (encoding.format, encoding.bits_per_sample) {
        (SampleFormat::Float, _) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| map_hound_error(path, e)),
        // hound hands 8-bit unsigned PCM back as signed i8
        (SampleFormat::Int, 8) => reader
            .samples::<i8>()
            .map(|s| s.map(|v| (v as f64 * scale) as f32))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| map_hound_error(path, e)),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| (v as f64 * scale) as f32))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| map_hound_error(path, e)),
        // 24-bit and 32-bit are both delivered as i32
        (SampleFormat::Int, _) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| (v as f64 * scale) as f32))
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| map_hound_error(path, e)),
    }
}

/// Quantize a normalized sample to a signed integer of the target depth
#[inline]
fn quantize(sample: f32, full_scale: f64) -> i32 {
    (sample as f64 * full_scale)
        .round()
        .clamp(-full_scale, full_scale - 1.0) as i32
}

fn write_samples<W: std::io::Write + std::io::Seek>(
    writer: &mut WavWriter<W>,
    interleaved: &[f32],
    encoding: SampleEncoding,
) -> Result<()> {
    let full_scale = encoding.full_scale();

    match (encoding.format, encoding.bits_per_sample) {
        (SampleFormat::Float, _) => {
            for &sample in interleaved {
                writer.write_sample(sample).map_err(hound_to_io)?;
            }
        }
        (SampleFormat::Int, 8) => {
            for &sample in interleaved {
                writer
                    .write_sample(quantize(sample, full_scale) as i8)
                    .map_err(hound_to_io)?;
            }
        }
        (SampleFormat::Int, 16) => {
            for &sample in interleaved {
                writer
                    .write_sample(quantize(sample, full_scale) as i16)
                    .map_err(hound_to_io)?;
            }
        }
        (SampleFormat::Int, _) => {
            for &sample in interleaved {
                writer
                    .write_sample(quantize(sample, full_scale))
                    .map_err(hound_to_io)?;
            }
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn with_encoding(buffer: SampleBuffer, encoding: SampleEncoding) -> SampleBuffer {
        SampleBuffer::from_channels(buffer.samples().to_vec(), buffer.sample_rate(), encoding)
            .unwrap()
    }

    #[test]
    fn test_generate_test_tone() {
        let buffer = generate_test_tone(440.0, 1.0, 44100);
        assert_eq!(buffer.len(), 44100);
        assert_eq!(buffer.channels(), 1);
        assert!(buffer.peak() <= 0.5 + 1e-6);
    }

    #[test]
    fn test_generate_stereo_test_tone() {
        let buffer = generate_stereo_test_tone(440.0, 880.0, 0.5, 48000);
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.len(), 24000);
        assert!((buffer.channel(0)[100] - buffer.channel(1)[100]).abs() > 0.01);
    }

    #[test]
    fn test_round_trip_16bit_is_sample_exact() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first.wav");
        let second = dir.path().join("second.wav");

        let original = generate_test_tone(440.0, 0.25, 44100);
        write(&first, &original).unwrap();
        let loaded = read(&first).unwrap();

        assert_eq!(loaded.sample_rate(), 44100);
        assert_eq!(loaded.channels(), 1);
        assert_eq!(loaded.encoding(), SampleEncoding::PCM_16);
        for (orig, imp) in original.channel(0).iter().zip(loaded.channel(0)) {
            assert!((orig - imp).abs() <= 1.0 / 32768.0);
        }

        // Once quantized, further identity passes are lossless
        write(&second, &loaded).unwrap();
        assert_eq!(read(&second).unwrap(), loaded);
    }

    #[test]
    fn test_round_trip_all_encodings_stereo() {
        let dir = tempdir().unwrap();
        let encodings = [
            SampleEncoding::PCM_8,
            SampleEncoding::PCM_24,
            SampleEncoding::PCM_32,
            SampleEncoding::FLOAT_32,
        ];

        for encoding in encodings {
            let path = dir
                .path()
                .join(format!("tone_{}_{:?}.wav", encoding.bits_per_sample, encoding.format));
            let original = with_encoding(generate_stereo_test_tone(300.0, 700.0, 0.1, 22050), encoding);

            write(&path, &original).unwrap();
            let loaded = read(&path).unwrap();

            assert_eq!(loaded.encoding(), encoding);
            assert_eq!(loaded.sample_rate(), 22050);
            assert_eq!(loaded.channels(), 2);
            assert_eq!(loaded.len(), original.len());

            let tolerance = match encoding.format {
                SampleFormat::Float => 1e-6,
                SampleFormat::Int => 1.0 / encoding.full_scale() as f32,
            };
            for ch in 0..2 {
                for (orig, imp) in original.channel(ch).iter().zip(loaded.channel(ch)) {
                    assert!(
                        (orig - imp).abs() <= tolerance,
                        "{:?}: {} vs {}",
                        encoding,
                        orig,
                        imp
                    );
                }
            }
        }
    }

    #[test]
    fn test_write_clamps_out_of_range() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hot.wav");
        let buffer =
            SampleBuffer::from_channels(vec![vec![1.5, -1.5, 1.0]], 8000, SampleEncoding::PCM_16)
                .unwrap();

        write(&path, &buffer).unwrap();
        let loaded = read(&path).unwrap();
        assert_eq!(loaded.channel(0)[0], 32767.0 / 32768.0);
        assert_eq!(loaded.channel(0)[1], -1.0);
        assert_eq!(loaded.channel(0)[2], 32767.0 / 32768.0);
    }

    #[test]
    fn test_write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        fs::write(&path, b"old contents").unwrap();

        write(&path, &generate_test_tone(100.0, 0.05, 8000)).unwrap();
        assert_eq!(read(&path).unwrap().len(), 400);
    }

    #[test]
    fn test_write_to_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.wav");

        let err = write(&path, &generate_test_tone(100.0, 0.05, 8000)).unwrap_err();
        assert!(matches!(err, SoundLabError::Io(_)), "got {:?}", err);
        assert!(!err.is_recoverable());
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_write_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        // Destination is a non-empty directory, so the final rename fails
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let result = write(&path, &generate_test_tone(100.0, 0.05, 8000));
        assert!(result.is_err());

        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_read_nonexistent_file() {
        match read(Path::new("/nonexistent/path/audio.wav")).unwrap_err() {
            SoundLabError::FileNotFound { path, .. } => assert!(path.contains("nonexistent")),
            other => panic!("Expected FileNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_read_mp3_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        let mut bytes = b"ID3\x04\x00\x00\x00\x00\x00\x00".to_vec();
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x64, 0x00, 0x00, 0x00, 0x00]);
        fs::write(&path, bytes).unwrap();

        let err = read(&path).unwrap_err();
        assert!(matches!(err, SoundLabError::UnsupportedFormat { .. }), "got {:?}", err);
    }

    #[test]
    fn test_read_tiny_file_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.wav");
        fs::write(&path, b"RI").unwrap();

        assert!(matches!(
            read(&path).unwrap_err(),
            SoundLabError::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn test_read_zero_sample_rate_is_unsupported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("norate.wav");

        // Mono 16-bit PCM, two frames, rate field zeroed
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&40u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[0x00, 0x10, 0x00, 0xF0]);
        fs::write(&path, bytes).unwrap();

        let err = read(&path).unwrap_err();
        assert!(matches!(err, SoundLabError::UnsupportedFormat { .. }), "got {:?}", err);
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_read_empty_wav() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        WavWriter::create(&path, spec).unwrap().finalize().unwrap();

        assert!(matches!(read(&path).unwrap_err(), SoundLabError::EmptyAudio));
    }

    #[test]
    fn test_read_rejects_surround() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("surround.wav");
        let spec = WavSpec {
            channels: 6,
            sample_rate: 48000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..12 {
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();

        assert!(matches!(
            read(&path).unwrap_err(),
            SoundLabError::UnsupportedFormat { .. }
        ));
    }

    #[test]
    fn test_quantize_rounds_and_clamps() {
        assert_eq!(quantize(0.5, 32768.0), 16384);
        assert_eq!(quantize(-1.0, 32768.0), -32768);
        assert_eq!(quantize(1.0, 32768.0), 32767);
        assert_eq!(quantize(2.0, 128.0), 127);
    }
}

use std::fs::File;
use std::io;
use std::path::Path;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::SoundError;

/// Interleaved `f32` PCM held fully in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedTrack {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}

/// Decodes every packet of the first audio track in `path`.
///
/// Corrupt packets are skipped; the stream ends at the first end-of-file.
pub fn decode_file(path: &Path) -> Result<DecodedTrack, SoundError> {
    let file = File::open(path).map_err(|source| SoundError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SoundError::NoTrack(path.to_path_buf()))?;
    let track_id = track.id;
    let mut channels = track
        .codec_params
        .channels
        .map(|layout| layout.count())
        .unwrap_or(0);
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<(SampleBuffer<f32>, usize)> = None;
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(Error::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(Error::ResetRequired) => {
                tracing::debug!(path = %path.display(), "stream reset requested; stopping decode");
                break;
            }
            Err(err) => return Err(err.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let capacity = decoded.capacity();
                if channels == 0 {
                    channels = spec.channels.count();
                }
                if sample_rate == 0 {
                    sample_rate = spec.rate;
                }
                let needs_buffer = match &sample_buf {
                    Some((_, frames)) => *frames < capacity,
                    None => true,
                };
                if needs_buffer {
                    sample_buf = Some((SampleBuffer::new(capacity as u64, spec), capacity));
                }
                if let Some((buf, _)) = sample_buf.as_mut() {
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
            }
            Err(Error::DecodeError(reason)) => {
                skipped += 1;
                tracing::debug!(path = %path.display(), reason, "skipping corrupt packet");
            }
            Err(Error::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err.into()),
        }
    }

    if channels == 0 || sample_rate == 0 {
        return Err(SoundError::NoTrack(path.to_path_buf()));
    }
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "some audio packets could not be decoded");
    }

    let track = DecodedTrack {
        samples,
        channels,
        sample_rate,
    };
    tracing::debug!(
        path = %path.display(),
        channels,
        sample_rate,
        duration = ?track.duration(),
        "decoded soundtrack"
    );
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Writes a 16-bit PCM WAV file.
    fn write_wav(path: &Path, channels: u16, sample_rate: u32, samples: &[i16]) {
        let data_len = (samples.len() * 2) as u32;
        let block_align = channels * 2;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for sample in samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        let mut file = File::create(path).expect("create wav");
        file.write_all(&bytes).expect("write wav");
    }

    #[test]
    fn decodes_pcm_wav() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tone.wav");
        let samples: Vec<i16> = (0..800).map(|i| if i % 2 == 0 { 16384 } else { -16384 }).collect();
        write_wav(&path, 2, 8000, &samples);

        let track = decode_file(&path).expect("decode wav");
        assert_eq!(track.channels, 2);
        assert_eq!(track.sample_rate, 8000);
        assert_eq!(track.frames(), 400);
        assert!((track.samples[0] - 0.5).abs() < 1e-3);
        assert!((track.samples[1] + 0.5).abs() < 1e-3);
        assert_eq!(track.duration(), Duration::from_millis(50));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = decode_file(&dir.path().join("absent.mp3")).expect_err("missing file");
        assert!(matches!(err, SoundError::Io { .. }));
    }

    #[test]
    fn garbage_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("noise.bin");
        std::fs::write(&path, b"definitely not audio").expect("write");
        let err = decode_file(&path).expect_err("not audio");
        assert!(matches!(err, SoundError::Unsupported(_)), "got {err:?}");
    }

    #[test]
    fn empty_track_reports_zero_duration() {
        let track = DecodedTrack {
            samples: Vec::new(),
            channels: 0,
            sample_rate: 0,
        };
        assert_eq!(track.frames(), 0);
        assert_eq!(track.duration(), Duration::ZERO);
    }
}

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::adapt::adapt;
use crate::decode::decode_file;
use crate::error::SoundError;
use crate::voice::{RenderOutcome, Voice};

/// Notifications raised on the audio thread and collected by [`SoundPlayer::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The track reached its end without looping.
    Finished,
    /// The output stream reported an error.
    StreamError(String),
}

/// A single-voice player: one decoded track routed to the default output device.
pub struct SoundPlayer {
    voice: Arc<Voice>,
    stream: cpal::Stream,
    events: Receiver<PlayerEvent>,
    start_offset: Duration,
    path: PathBuf,
}

impl SoundPlayer {
    /// Decodes `path`, adapts it to the default output device and builds a
    /// stream that stays silent until [`play`](Self::play).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SoundError> {
        let path = path.as_ref();
        let decoded = decode_file(path)?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(SoundError::NoOutputDevice)?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        let track = adapt(&decoded, config.channels as usize, config.sample_rate.0);
        tracing::debug!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            ?sample_format,
            source_channels = decoded.channels,
            source_rate = decoded.sample_rate,
            "opened audio output"
        );

        let voice = Arc::new(Voice::new(track));
        let (events_tx, events) = unbounded();
        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, &voice, events_tx)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, &voice, events_tx)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, &voice, events_tx)?,
            other => return Err(SoundError::UnsupportedSampleFormat(other.to_string())),
        };

        tracing::info!(
            path = %path.display(),
            duration = ?voice.track().duration(),
            "soundtrack loaded"
        );

        Ok(Self {
            voice,
            stream,
            events,
            start_offset: Duration::ZERO,
            path: path.to_path_buf(),
        })
    }

    /// Where [`play`](Self::play) starts from.
    pub fn set_start_offset(&mut self, offset: Duration) {
        self.start_offset = offset;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Starts playback from the start offset, restarting if already playing.
    pub fn play(&self) -> Result<(), SoundError> {
        self.voice.seek(self.offset_frames(self.start_offset));
        self.voice.set_playing(true);
        self.stream.play()?;
        Ok(())
    }

    /// Halts playback and rewinds to the beginning.
    pub fn stop(&self) {
        self.voice.set_playing(false);
        self.voice.seek(0);
    }

    pub fn set_paused(&self, paused: bool) {
        self.voice.set_playing(!paused);
    }

    pub fn is_playing(&self) -> bool {
        self.voice.is_playing()
    }

    /// Sets the volume, clamped to [0, 1].
    pub fn set_volume(&self, volume: f32) {
        self.voice.set_volume(volume);
    }

    pub fn volume(&self) -> f32 {
        self.voice.volume()
    }

    pub fn set_looping(&self, looping: bool) {
        self.voice.set_looping(looping);
    }

    pub fn is_looping(&self) -> bool {
        self.voice.is_looping()
    }

    /// Seeks to a fraction of the track in [0, 1].
    pub fn set_position(&self, fraction: f32) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let frame = (self.voice.frames() as f64 * fraction as f64).round() as usize;
        self.voice.seek(frame);
    }

    /// Playback position as a fraction of the track in [0, 1].
    pub fn position(&self) -> f32 {
        position_fraction(self.voice.cursor(), self.voice.frames())
    }

    /// Playback position in time.
    pub fn elapsed(&self) -> Duration {
        frames_to_duration(self.voice.cursor(), self.voice.track().sample_rate)
    }

    pub fn duration(&self) -> Duration {
        self.voice.track().duration()
    }

    /// Drains audio-thread events, logging each one.
    pub fn update(&self) -> Vec<PlayerEvent> {
        let events: Vec<PlayerEvent> = self.events.try_iter().collect();
        for event in &events {
            match event {
                PlayerEvent::Finished => {
                    tracing::debug!(path = %self.path.display(), "soundtrack finished")
                }
                PlayerEvent::StreamError(message) => {
                    tracing::warn!(path = %self.path.display(), error = %message, "audio stream error")
                }
            }
        }
        events
    }

    fn offset_frames(&self, offset: Duration) -> usize {
        let rate = self.voice.track().sample_rate as f64;
        (offset.as_secs_f64() * rate).round() as usize
    }
}

fn position_fraction(cursor: usize, frames: usize) -> f32 {
    if frames == 0 {
        0.0
    } else {
        (cursor as f64 / frames as f64).clamp(0.0, 1.0) as f32
    }
}

fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(frames as f64 / sample_rate as f64)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    voice: &Arc<Voice>,
    events: Sender<PlayerEvent>,
) -> Result<cpal::Stream, SoundError>
where
    T: SizedSample + FromSample<f32>,
{
    let data_voice = Arc::clone(voice);
    let data_events = events.clone();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            if data_voice.render(data) == RenderOutcome::Finished {
                let _ = data_events.send(PlayerEvent::Finished);
            }
        },
        move |err| {
            let _ = events.send(PlayerEvent::StreamError(err.to_string()));
        },
        None,
    )?;
    Ok(stream)
}

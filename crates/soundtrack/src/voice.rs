use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use cpal::{FromSample, Sample};

use crate::decode::DecodedTrack;

/// Playback state shared between the control thread and the audio callback.
///
/// The callback only touches atomics and the immutable sample data, so it
/// never blocks on the player.
#[derive(Debug)]
pub(crate) struct Voice {
    track: DecodedTrack,
    cursor: AtomicUsize,
    playing: AtomicBool,
    looping: AtomicBool,
    volume: AtomicU32,
}

/// What happened while filling one output block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderOutcome {
    Silent,
    Playing,
    Finished,
}

impl Voice {
    pub(crate) fn new(track: DecodedTrack) -> Self {
        Self {
            track,
            cursor: AtomicUsize::new(0),
            playing: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            volume: AtomicU32::new(1.0f32.to_bits()),
        }
    }

    pub(crate) fn track(&self) -> &DecodedTrack {
        &self.track
    }

    pub(crate) fn frames(&self) -> usize {
        self.track.frames()
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    pub(crate) fn seek(&self, frame: usize) {
        self.cursor.store(frame.min(self.frames()), Ordering::Release);
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    pub(crate) fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Release);
    }

    pub(crate) fn is_looping(&self) -> bool {
        self.looping.load(Ordering::Acquire)
    }

    pub(crate) fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Release);
    }

    pub(crate) fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Acquire))
    }

    /// Stores the volume clamped to [0, 1]; NaN is treated as silence.
    pub(crate) fn set_volume(&self, volume: f32) {
        let clamped = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.volume.store(clamped.to_bits(), Ordering::Release);
    }

    /// Fills an interleaved output block. Channels must already match the device.
    pub(crate) fn render<T>(&self, out: &mut [T]) -> RenderOutcome
    where
        T: Sample + FromSample<f32>,
    {
        if !self.is_playing() {
            out.fill(T::EQUILIBRIUM);
            return RenderOutcome::Silent;
        }

        let channels = self.track.channels.max(1);
        let frames = self.frames();
        let volume = self.volume();
        let looping = self.is_looping();
        let start = self.cursor();
        let mut cursor = start;
        let mut finished = false;

        for frame in out.chunks_mut(channels) {
            if cursor >= frames {
                if looping && frames > 0 {
                    cursor = 0;
                } else {
                    finished = true;
                    frame.fill(T::EQUILIBRIUM);
                    continue;
                }
            }
            let offset = cursor * channels;
            for (channel, slot) in frame.iter_mut().enumerate() {
                let value = self.track.samples[offset + channel] * volume;
                *slot = T::from_sample(value);
            }
            cursor += 1;
        }

        self.commit_block(start, cursor, finished)
    }

    /// Publishes the cursor reached by a block. A seek from the control
    /// thread since `start` wins, and then an end-of-track does not stop it.
    fn commit_block(&self, start: usize, end: usize, finished: bool) -> RenderOutcome {
        let committed = self
            .cursor
            .compare_exchange(start, end, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if finished && committed {
            self.playing.store(false, Ordering::Release);
            RenderOutcome::Finished
        } else {
            RenderOutcome::Playing
        }
    }
}

use crate::decode::DecodedTrack;

/// Converts a decoded track to the output device's channel count and sample rate.
pub fn adapt(track: &DecodedTrack, channels: usize, sample_rate: u32) -> DecodedTrack {
    let remapped = remap_channels(track, channels);
    if track.sample_rate == sample_rate || sample_rate == 0 || track.sample_rate == 0 {
        return DecodedTrack {
            samples: remapped,
            channels,
            sample_rate: if sample_rate == 0 { track.sample_rate } else { sample_rate },
        };
    }
    DecodedTrack {
        samples: resample_linear(&remapped, channels, track.sample_rate, sample_rate),
        channels,
        sample_rate,
    }
}

fn remap_channels(track: &DecodedTrack, out_channels: usize) -> Vec<f32> {
    let in_channels = track.channels;
    if in_channels == out_channels || in_channels == 0 || out_channels == 0 {
        return track.samples.clone();
    }

    let frames = track.frames();
    let mut out = Vec::with_capacity(frames * out_channels);
    for frame in track.samples.chunks_exact(in_channels) {
        if in_channels == 1 {
            out.extend(std::iter::repeat(frame[0]).take(out_channels));
        } else if out_channels == 1 {
            out.push(frame.iter().sum::<f32>() / in_channels as f32);
        } else {
            for channel in 0..out_channels {
                out.push(frame.get(channel).copied().unwrap_or(0.0));
            }
        }
    }
    out
}

fn resample_linear(samples: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Vec<f32> {
    let in_frames = samples.len() / channels;
    if in_frames == 0 {
        return Vec::new();
    }
    let out_frames = ((in_frames as u64 * to_rate as u64) / from_rate as u64).max(1) as usize;
    let step = from_rate as f64 / to_rate as f64;
    let last = in_frames - 1;

    let mut out = Vec::with_capacity(out_frames * channels);
    for index in 0..out_frames {
        let position = index as f64 * step;
        let left = (position.floor() as usize).min(last);
        let right = (left + 1).min(last);
        let frac = (position - left as f64) as f32;
        for channel in 0..channels {
            let a = samples[left * channels + channel];
            let b = samples[right * channels + channel];
            out.push(a + (b - a) * frac);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(samples: Vec<f32>, channels: usize, sample_rate: u32) -> DecodedTrack {
        DecodedTrack {
            samples,
            channels,
            sample_rate,
        }
    }

    #[test]
    fn matching_layout_is_untouched() {
        let source = track(vec![0.1, 0.2, 0.3, 0.4], 2, 48_000);
        assert_eq!(adapt(&source, 2, 48_000), source);
    }

    #[test]
    fn mono_fills_every_output_channel() {
        let source = track(vec![0.25, -0.5], 1, 44_100);
        let adapted = adapt(&source, 4, 44_100);
        assert_eq!(
            adapted.samples,
            vec![0.25, 0.25, 0.25, 0.25, -0.5, -0.5, -0.5, -0.5]
        );
        assert_eq!(adapted.channels, 4);
    }

    #[test]
    fn stereo_to_mono_averages() {
        let source = track(vec![1.0, 0.0, 0.5, 0.5], 2, 44_100);
        assert_eq!(adapt(&source, 1, 44_100).samples, vec![0.5, 0.5]);
    }

    #[test]
    fn surround_to_stereo_drops_extra_channels() {
        let source = track(vec![0.1, 0.2, 0.9, 0.9, 0.9, 0.9], 6, 44_100);
        assert_eq!(adapt(&source, 2, 44_100).samples, vec![0.1, 0.2]);
    }

    #[test]
    fn stereo_to_quad_leaves_extra_channels_silent() {
        let source = track(vec![0.1, 0.2], 2, 44_100);
        assert_eq!(adapt(&source, 4, 44_100).samples, vec![0.1, 0.2, 0.0, 0.0]);
    }

    #[test]
    fn upsampling_interpolates_between_frames() {
        let source = track(vec![0.0, 1.0], 1, 1_000);
        let adapted = adapt(&source, 1, 2_000);
        assert_eq!(adapted.sample_rate, 2_000);
        assert_eq!(adapted.samples.len(), 4);
        assert!((adapted.samples[1] - 0.5).abs() < 1e-6);
        assert!((adapted.samples[2] - 1.0).abs() < 1e-6);
        assert!((adapted.samples[3] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn downsampling_keeps_duration() {
        let source = track(vec![0.0; 44_100 * 2], 2, 44_100);
        let adapted = adapt(&source, 2, 22_050);
        assert_eq!(adapted.frames(), 22_050);
        assert_eq!(adapted.duration(), source.duration());
    }
}

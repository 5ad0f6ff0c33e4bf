//! Background soundtrack playback.
//!
//! A track is decoded up front with symphonia, adapted to the output
//! device's channel layout and sample rate, then streamed through cpal by a
//! single [`SoundPlayer`] voice. The audio callback reports end-of-track and
//! stream errors over a channel that [`SoundPlayer::update`] drains once per
//! frame.

mod adapt;
mod decode;
mod error;
mod player;
mod voice;

pub use adapt::adapt;
pub use decode::{decode_file, DecodedTrack};
pub use error::SoundError;
pub use player::{PlayerEvent, SoundPlayer};

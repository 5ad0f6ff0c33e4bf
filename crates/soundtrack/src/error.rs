use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported audio format: {0}")]
    Unsupported(String),
    #[error("{} contains no decodable audio track", .0.display())]
    NoTrack(PathBuf),
    #[error("failed to decode audio: {0}")]
    Decode(String),
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("failed to query output device configuration: {0}")]
    OutputConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("output device uses unsupported sample format {0}")]
    UnsupportedSampleFormat(String),
    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

impl From<symphonia::core::errors::Error> for SoundError {
    fn from(value: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error;
        match value {
            Error::Unsupported(what) => SoundError::Unsupported(what.to_string()),
            other => SoundError::Decode(other.to_string()),
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("No audio output device available")]
    NoOutputDevice,

    #[error("Failed to query output config: {0}")]
    Config(String),

    #[error("Unsupported sample format reported by device: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to build output stream: {0}")]
    BuildStream(String),

    #[error("Failed to start output stream: {0}")]
    PlayStream(String),

    #[error("Audio output thread failed: {0}")]
    Thread(String),

    #[error("Built without audio output support")]
    Disabled,
}

pub type AudioResult<T> = std::result::Result<T, AudioError>;

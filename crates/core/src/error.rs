use crate::session::PlaybackState;

/// Result alias that carries the custom [`BinauralError`] type.
pub type Result<T> = std::result::Result<T, BinauralError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BinauralError {
    /// The platform refused to create the audio output or the tone graph.
    #[error("audio unavailable: {0}")]
    AudioUnavailable(String),
    /// Applying a gain change to a live session failed. The controller logs
    /// this and carries on; it never leaves `set_volume`.
    #[error("failed to apply volume: {0}")]
    VolumeApply(String),
    /// A preset identifier that is not part of the catalog.
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
    /// A lifecycle event issued from a state that does not accept it.
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        event: &'static str,
        state: PlaybackState,
    },
    /// A configuration value rejected by the `reject` range policy.
    #[error("{parameter} {value} is outside [{min}, {max}]")]
    OutOfRange {
        parameter: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// Malformed configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
}

impl BinauralError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// True for failures the user should see as the "headphones required"
    /// notice rather than a plain error.
    pub fn is_audio_unavailable(&self) -> bool {
        matches!(self, Self::AudioUnavailable(_))
    }
}

impl From<&str> for BinauralError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BinauralError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

impl From<serde_json::Error> for BinauralError {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type QuadResult<T> = Result<T, QuadError>;

#[derive(thiserror::Error, Debug)]
pub enum QuadError {
    #[error("incomplete raw buffer '{path}': expected {expected} bytes, got {actual}")]
    IncompleteBuffer {
        path: String,
        expected: usize,
        actual: usize,
    },

    #[error("quadrant id {0} is out of range 1..=16")]
    InvalidQuadrant(u8),

    #[error("buffer shape error: {0}")]
    BufferShape(String),

    #[error("external tool '{tool}' not found")]
    ExternalToolNotFound { tool: String },

    #[error("external tool '{tool}' exited with {status}")]
    ExternalToolFailed { tool: String, status: String },

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("failed to write request descriptor '{path}'")]
    DescriptorWriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("a processing run is already in progress")]
    RunInProgress,

    #[error("animation error: {0}")]
    Animation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuadError {
    pub fn shape(msg: impl Into<String>) -> Self {
        Self::BufferShape(msg.into())
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ExternalToolNotFound { tool: tool.into() }
    }
}

use crate::registry::FrameType;

/// Errors that can occur during frame encoding/decoding.
///
/// Every variant except [`FrameError::Io`] and [`FrameError::ConnectionClosed`]
/// describes a malformed frame. Those two report a transport problem instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Unknown frame type, either a numeric id off the wire or a symbolic name.
    #[error("invalid frame type: {0}")]
    InvalidFrameType(String),

    /// Stream id above `MAX_STREAM_ID`, or non-zero where the type forbids it.
    #[error("invalid stream id {stream} for {frame_type} frame: {reason}")]
    InvalidStreamId {
        frame_type: FrameType,
        stream: u32,
        reason: &'static str,
    },

    /// A flag that is not registered for the frame's type.
    #[error("invalid frame flag {flag} for {frame_type} frame")]
    InvalidFrameFlag { frame_type: FrameType, flag: String },

    /// The declared length does not fit the length field.
    #[error("frame too large ({length} bytes, max {max})")]
    FrameTooLarge { length: u32, max: u32 },

    /// The payload size is not valid for the frame type.
    #[error("invalid payload size for {frame_type} frame ({size} bytes, expected {expected})")]
    InvalidPayloadSize {
        frame_type: FrameType,
        size: usize,
        expected: &'static str,
    },

    /// A symbolic settings name that is not in the settings registry.
    #[error("unknown settings id: {0}")]
    UnknownSettingsId(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

impl FrameError {
    /// True for transport failures (I/O errors and short reads).
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::ConnectionClosed)
    }

    /// True for malformed frames and invalid frame descriptions.
    pub fn is_framing(&self) -> bool {
        !self.is_io()
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

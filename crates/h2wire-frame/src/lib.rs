//! Byte-level frame codec for HTTP/2-style connections.
//!
//! Every frame is an 8-byte common header followed by a type-specific body:
//! - A 2-byte big-endian body length (always below 2^16)
//! - A 1-byte frame type and a 1-byte flags field
//! - A 4-byte big-endian stream identifier (top bit reserved)
//!
//! The [`Framer`] is stateless: [`generate`] turns a [`Frame`] into wire
//! bytes and [`parse`] reads one back from any `Read` source. Header
//! compression, flow control and stream state live above this crate.

pub mod codec;
pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod reader;
pub mod registry;
pub mod settings;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::FrameCodec;
pub use codec::{
    decode_frame, generate, generate_into, parse, FrameConfig, Framer, DEFAULT_MAX_FRAME_LENGTH,
};
pub use error::{FrameError, Result};
pub use flags::{
    DataFlag, Flags, FrameFlag, HeadersFlag, PingFlag, PushPromiseFlag, WindowUpdateFlag,
};
pub use frame::{Frame, FrameBody, PING_PAYLOAD_SIZE};
pub use header::{decode_common_header, encode_common_header, FrameHeader, HEADER_SIZE};
pub use reader::FrameReader;
pub use registry::{FrameType, Setting, MAX_FRAME_LENGTH, MAX_STREAM_ID};
pub use settings::{SettingKey, Settings};
pub use writer::FrameWriter;

//! Frame type, flag and settings registries.
//!
//! Static lookup tables shared by the encoder and the decoder. A name/bit
//! pairing exists exactly once here, so both directions always agree.

use std::fmt;
use std::str::FromStr;

use crate::error::{FrameError, Result};

/// Largest stream identifier (the top bit of the stream field is reserved).
pub const MAX_STREAM_ID: u32 = 0x7fff_ffff;

/// Largest value the 16-bit length field can carry.
pub const MAX_FRAME_LENGTH: u32 = 0xffff;

/// The closed set of frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x9,
}

const DATA_FLAGS: &[(&str, u8)] = &[("end_stream", 0x1), ("reserved", 0x2)];
const HEADERS_FLAGS: &[(&str, u8)] = &[
    ("end_stream", 0x1),
    ("reserved", 0x2),
    ("end_headers", 0x4),
    ("priority", 0x8),
];
const PUSH_PROMISE_FLAGS: &[(&str, u8)] = &[("end_push_promise", 0x1)];
const PING_FLAGS: &[(&str, u8)] = &[("pong", 0x1)];
const WINDOW_UPDATE_FLAGS: &[(&str, u8)] = &[("end_flow_control", 0x1)];
const NO_FLAGS: &[(&str, u8)] = &[];

impl FrameType {
    /// Every registered frame type, in id order.
    pub const ALL: [FrameType; 9] = [
        FrameType::Data,
        FrameType::Headers,
        FrameType::Priority,
        FrameType::RstStream,
        FrameType::Settings,
        FrameType::PushPromise,
        FrameType::Ping,
        FrameType::GoAway,
        FrameType::WindowUpdate,
    ];

    /// Resolve a numeric type id from the wire.
    pub fn from_u8(id: u8) -> Option<Self> {
        match id {
            0x0 => Some(Self::Data),
            0x1 => Some(Self::Headers),
            0x2 => Some(Self::Priority),
            0x3 => Some(Self::RstStream),
            0x4 => Some(Self::Settings),
            0x5 => Some(Self::PushPromise),
            0x6 => Some(Self::Ping),
            0x7 => Some(Self::GoAway),
            0x9 => Some(Self::WindowUpdate),
            _ => None,
        }
    }

    /// Numeric id written to the type byte.
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Data => "DATA",
            Self::Headers => "HEADERS",
            Self::Priority => "PRIORITY",
            Self::RstStream => "RST_STREAM",
            Self::Settings => "SETTINGS",
            Self::PushPromise => "PUSH_PROMISE",
            Self::Ping => "PING",
            Self::GoAway => "GOAWAY",
            Self::WindowUpdate => "WINDOW_UPDATE",
        }
    }

    /// Flag registry for this type as `(name, bit)` pairs.
    pub fn flags(self) -> &'static [(&'static str, u8)] {
        match self {
            Self::Data => DATA_FLAGS,
            Self::Headers => HEADERS_FLAGS,
            Self::PushPromise => PUSH_PROMISE_FLAGS,
            Self::Ping => PING_FLAGS,
            Self::WindowUpdate => WINDOW_UPDATE_FLAGS,
            Self::Priority | Self::RstStream | Self::Settings | Self::GoAway => NO_FLAGS,
        }
    }

    /// Union of every bit registered for this type.
    pub fn flag_mask(self) -> u8 {
        self.flags().iter().fold(0, |mask, (_, bit)| mask | bit)
    }

    /// Resolve a flag name registered for this type to its bit.
    pub fn flag_bit(self, name: &str) -> Result<u8> {
        self.flags()
            .iter()
            .find(|(flag, _)| *flag == name)
            .map(|(_, bit)| *bit)
            .ok_or_else(|| FrameError::InvalidFrameFlag {
                frame_type: self,
                flag: name.to_string(),
            })
    }

    /// Name of a single registered bit, if any.
    pub fn flag_name(self, bit: u8) -> Option<&'static str> {
        self.flags()
            .iter()
            .find(|(_, registered)| *registered == bit)
            .map(|(name, _)| *name)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for FrameType {
    type Error = FrameError;

    fn try_from(id: u8) -> Result<Self> {
        Self::from_u8(id).ok_or_else(|| FrameError::InvalidFrameType(format!("0x{id:02x}")))
    }
}

impl FromStr for FrameType {
    type Err = FrameError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| FrameError::InvalidFrameType(name.to_string()))
    }
}

/// Registered SETTINGS identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Setting {
    MaxConcurrentStreams = 4,
    InitialWindowSize = 7,
    FlowControlOptions = 10,
}

impl Setting {
    pub const ALL: [Setting; 3] = [
        Setting::MaxConcurrentStreams,
        Setting::InitialWindowSize,
        Setting::FlowControlOptions,
    ];

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            4 => Some(Self::MaxConcurrentStreams),
            7 => Some(Self::InitialWindowSize),
            10 => Some(Self::FlowControlOptions),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::MaxConcurrentStreams => "max_concurrent_streams",
            Self::InitialWindowSize => "initial_window_size",
            Self::FlowControlOptions => "flow_control_options",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|setting| setting.name() == name)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

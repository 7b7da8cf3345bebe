//! In-memory frame descriptions.

use bytes::Bytes;

use crate::error::{FrameError, Result};
use crate::flags::{
    DataFlag, Flags, FrameFlag, HeadersFlag, PingFlag, PushPromiseFlag, WindowUpdateFlag,
};
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::registry::FrameType;
use crate::settings::Settings;

/// Size of the PING opaque payload.
pub const PING_PAYLOAD_SIZE: usize = 8;

/// A complete frame: common header fields plus a type-specific body.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "FrameDescription")
)]
pub struct Frame {
    /// Declared body length. Copied to the wire verbatim; only its upper
    /// bound is checked. [`Frame::new`] computes it from the body.
    pub length: u32,
    pub stream: u32,
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub body: FrameBody,
}

/// Type-specific frame contents. Each variant carries only the fields its
/// frame type allows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum FrameBody {
    Data {
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "no_flags"))]
        flags: Flags<DataFlag>,
        payload: Bytes,
    },
    /// `priority` is on the wire exactly when it is `Some`, and
    /// [`HeadersFlag::Priority`] must be set exactly then.
    Headers {
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "no_flags"))]
        flags: Flags<HeadersFlag>,
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
        priority: Option<u32>,
        header_block: Bytes,
    },
    Priority {
        priority: u32,
    },
    RstStream {
        error: u32,
    },
    Settings {
        settings: Settings,
    },
    PushPromise {
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "no_flags"))]
        flags: Flags<PushPromiseFlag>,
        promise_stream: u32,
        header_block: Bytes,
    },
    Ping {
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "no_flags"))]
        flags: Flags<PingFlag>,
        payload: Bytes,
    },
    #[cfg_attr(feature = "serde", serde(rename = "GOAWAY"))]
    GoAway {
        last_stream: u32,
        error: u32,
        /// `Some` only when non-empty.
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
        debug_data: Option<Bytes>,
    },
    WindowUpdate {
        #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "no_flags"))]
        flags: Flags<WindowUpdateFlag>,
        window_size: u32,
    },
}

#[cfg(feature = "serde")]
fn no_flags<F: FrameFlag>(flags: &Flags<F>) -> bool {
    flags.is_empty()
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct FrameDescription {
    length: u32,
    stream: u32,
    #[serde(flatten)]
    _frame_type: RegisteredType,
    #[serde(flatten)]
    body: FrameBody,
}

/// Checks the `"type"` tag against the frame type registry without
/// consuming it, so unknown types fail as [`FrameError::InvalidFrameType`].
#[cfg(feature = "serde")]
struct RegisteredType;

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RegisteredType {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        struct TagVisitor;

        impl<'de> serde::de::Visitor<'de> for TagVisitor {
            type Value = RegisteredType;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a frame description with a type")
            }

            fn visit_map<A: serde::de::MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<RegisteredType, A::Error> {
                let mut found = false;
                while let Some(key) = map.next_key::<String>()? {
                    if key != "type" {
                        map.next_value::<serde::de::IgnoredAny>()?;
                        continue;
                    }
                    let name = map.next_value::<String>()?;
                    if !FrameType::ALL.iter().any(|t| t.name() == name) {
                        return Err(serde::de::Error::custom(FrameError::InvalidFrameType(name)));
                    }
                    found = true;
                }
                if found {
                    Ok(RegisteredType)
                } else {
                    Err(serde::de::Error::missing_field("type"))
                }
            }
        }

        deserializer.deserialize_map(TagVisitor)
    }
}

#[cfg(feature = "serde")]
impl TryFrom<FrameDescription> for Frame {
    type Error = FrameError;

    fn try_from(description: FrameDescription) -> Result<Self> {
        description.body.check_fields()?;
        Ok(Self::with_length(
            description.length,
            description.stream,
            description.body,
        ))
    }
}

impl FrameBody {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Data { .. } => FrameType::Data,
            Self::Headers { .. } => FrameType::Headers,
            Self::Priority { .. } => FrameType::Priority,
            Self::RstStream { .. } => FrameType::RstStream,
            Self::Settings { .. } => FrameType::Settings,
            Self::PushPromise { .. } => FrameType::PushPromise,
            Self::Ping { .. } => FrameType::Ping,
            Self::GoAway { .. } => FrameType::GoAway,
            Self::WindowUpdate { .. } => FrameType::WindowUpdate,
        }
    }

    /// The flags byte for the common header.
    pub fn flag_bits(&self) -> u8 {
        match self {
            Self::Data { flags, .. } => flags.bits(),
            Self::Headers { flags, .. } => flags.bits(),
            Self::PushPromise { flags, .. } => flags.bits(),
            Self::Ping { flags, .. } => flags.bits(),
            Self::WindowUpdate { flags, .. } => flags.bits(),
            Self::Priority { .. }
            | Self::RstStream { .. }
            | Self::Settings { .. }
            | Self::GoAway { .. } => 0,
        }
    }

    /// Number of body bytes this frame encodes to.
    pub fn wire_len(&self) -> usize {
        match self {
            Self::Data { payload, .. } | Self::Ping { payload, .. } => payload.len(),
            Self::Headers {
                priority,
                header_block,
                ..
            } => priority.map_or(0, |_| 4) + header_block.len(),
            Self::Priority { .. } | Self::RstStream { .. } | Self::WindowUpdate { .. } => 4,
            Self::Settings { settings } => settings.wire_len(),
            Self::PushPromise { header_block, .. } => 4 + header_block.len(),
            Self::GoAway { debug_data, .. } => 8 + debug_data.as_ref().map_or(0, Bytes::len),
        }
    }

    /// Reject field combinations that would not survive a decode unchanged.
    pub(crate) fn check_fields(&self) -> Result<()> {
        match self {
            Self::Headers {
                flags, priority, ..
            } if flags.contains(HeadersFlag::Priority) != priority.is_some() => {
                Err(FrameError::InvalidFrameFlag {
                    frame_type: FrameType::Headers,
                    flag: HeadersFlag::Priority.name().to_string(),
                })
            }
            Self::GoAway {
                debug_data: Some(debug_data),
                ..
            } if debug_data.is_empty() => Err(FrameError::InvalidPayloadSize {
                frame_type: FrameType::GoAway,
                size: 8,
                expected: "more than 8 when debug data is present",
            }),
            _ => Ok(()),
        }
    }
}

impl Frame {
    /// Build a frame whose `length` matches its body.
    pub fn new(stream: u32, body: FrameBody) -> Self {
        let length = u32::try_from(body.wire_len()).unwrap_or(u32::MAX);
        Self {
            length,
            stream,
            body,
        }
    }

    /// Build a frame with a caller-supplied `length`, written as-is.
    pub fn with_length(length: u32, stream: u32, body: FrameBody) -> Self {
        Self {
            length,
            stream,
            body,
        }
    }

    /// DATA frame with no flags.
    pub fn data(stream: u32, payload: impl Into<Bytes>) -> Self {
        Self::new(
            stream,
            FrameBody::Data {
                flags: Flags::empty(),
                payload: payload.into(),
            },
        )
    }

    /// HEADERS frame; [`HeadersFlag::Priority`] is set or cleared to match
    /// `priority`.
    pub fn headers(
        stream: u32,
        mut flags: Flags<HeadersFlag>,
        priority: Option<u32>,
        header_block: impl Into<Bytes>,
    ) -> Self {
        match priority {
            Some(_) => flags.insert(HeadersFlag::Priority),
            None => flags.remove(HeadersFlag::Priority),
        }
        Self::new(
            stream,
            FrameBody::Headers {
                flags,
                priority,
                header_block: header_block.into(),
            },
        )
    }

    /// SETTINGS frame on the connection stream.
    pub fn settings(settings: Settings) -> Self {
        Self::new(0, FrameBody::Settings { settings })
    }

    /// PING frame; `pong` sets the reply flag.
    pub fn ping(payload: [u8; PING_PAYLOAD_SIZE], pong: bool) -> Self {
        let flags = if pong {
            Flags::from(PingFlag::Pong)
        } else {
            Flags::empty()
        };
        Self::new(
            0,
            FrameBody::Ping {
                flags,
                payload: Bytes::copy_from_slice(&payload),
            },
        )
    }

    /// GOAWAY frame without debug data.
    pub fn goaway(last_stream: u32, error: u32) -> Self {
        Self::new(
            0,
            FrameBody::GoAway {
                last_stream,
                error,
                debug_data: None,
            },
        )
    }

    pub fn frame_type(&self) -> FrameType {
        self.body.frame_type()
    }

    /// The common header this frame is written with.
    pub fn header(&self) -> FrameHeader {
        FrameHeader {
            length: self.length,
            frame_type: self.frame_type(),
            flags: self.body.flag_bits(),
            stream: self.stream,
        }
    }

    /// The total wire size of this frame (header + body).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.body.wire_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Setting;

    #[test]
    fn new_computes_length_from_body() {
        let frame = Frame::new(
            1,
            FrameBody::Headers {
                flags: Flags::from(HeadersFlag::EndHeaders).with(HeadersFlag::Priority),
                priority: Some(15),
                header_block: Bytes::from_static(b"header-block"),
            },
        );
        assert_eq!(frame.length, 16);
        assert_eq!(frame.wire_size(), HEADER_SIZE + 16);
    }

    #[test]
    fn headers_constructor_syncs_priority_flag() {
        let with = Frame::headers(1, HeadersFlag::EndHeaders.into(), Some(1), "");
        let without = Frame::headers(1, HeadersFlag::Priority.into(), None, "");
        assert_eq!(with.body.flag_bits(), 0x4 | 0x8);
        assert_eq!(with.length, 4);
        assert_eq!(without.body.flag_bits(), 0);
        assert_eq!(without.length, 0);
        assert!(with.body.check_fields().is_ok());
        assert!(without.body.check_fields().is_ok());
    }

    #[test]
    fn priority_flag_and_field_must_agree() {
        let flag_only = FrameBody::Headers {
            flags: HeadersFlag::Priority.into(),
            priority: None,
            header_block: Bytes::new(),
        };
        let field_only = FrameBody::Headers {
            flags: Flags::empty(),
            priority: Some(3),
            header_block: Bytes::new(),
        };
        for body in [flag_only, field_only] {
            let err = body.check_fields().unwrap_err();
            assert!(matches!(
                err,
                FrameError::InvalidFrameFlag { frame_type: FrameType::Headers, ref flag }
                    if flag == "priority"
            ));
        }
    }

    #[test]
    fn goaway_debug_data_present_means_non_empty() {
        let empty = FrameBody::GoAway {
            last_stream: 2,
            error: 15,
            debug_data: Some(Bytes::new()),
        };
        let err = empty.check_fields().unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidPayloadSize { frame_type: FrameType::GoAway, size: 8, .. }
        ));
        assert!(Frame::goaway(2, 15).body.check_fields().is_ok());
    }

    #[test]
    fn header_reflects_body() {
        let frame = Frame::ping(*b"12345678", true);
        let header = frame.header();
        assert_eq!(header.frame_type, FrameType::Ping);
        assert_eq!(header.flags, 0x1);
        assert_eq!(header.length, 8);
        assert_eq!(header.stream, 0);
    }

    #[test]
    fn fixed_size_bodies() {
        assert_eq!(Frame::goaway(2, 15).length, 8);
        assert_eq!(
            Frame::settings([(Setting::InitialWindowSize, 1u32)].into_iter().collect()).length,
            8
        );
        assert_eq!(Frame::new(3, FrameBody::RstStream { error: 8 }).length, 4);
    }
}

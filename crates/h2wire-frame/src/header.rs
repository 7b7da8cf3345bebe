//! The 8-byte common frame header.

use bytes::{Buf, BufMut};

use crate::error::{FrameError, Result};
use crate::registry::{FrameType, MAX_FRAME_LENGTH, MAX_STREAM_ID};

/// Common header: length (2) + type (1) + flags (1) + stream (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// The common header shared by every frame.
///
/// `flags` is the raw flags byte. Use [`FrameType::flag_bit`] or
/// [`FrameHeader::with_flag`] to build it from names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Declared size of everything after the header.
    pub length: u32,
    pub frame_type: FrameType,
    pub flags: u8,
    pub stream: u32,
}

impl FrameHeader {
    /// A header with no flags.
    pub fn new(frame_type: FrameType, length: u32, stream: u32) -> Self {
        Self {
            length,
            frame_type,
            flags: 0,
            stream,
        }
    }

    /// Set a flag by name; fails if the name is not registered for the type.
    pub fn with_flag(mut self, name: &str) -> Result<Self> {
        self.flags |= self.frame_type.flag_bit(name)?;
        Ok(self)
    }

    pub fn has_flag(&self, bit: u8) -> bool {
        self.flags & bit != 0
    }

    /// Names of the set flags, in registry order.
    pub fn flag_names(&self) -> Vec<&'static str> {
        self.frame_type
            .flags()
            .iter()
            .filter(|(_, bit)| self.has_flag(*bit))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Check the header can be put on the wire.
    pub(crate) fn validate(&self, max_length: u32) -> Result<()> {
        if self.stream > MAX_STREAM_ID {
            return Err(FrameError::InvalidStreamId {
                frame_type: self.frame_type,
                stream: self.stream,
                reason: "exceeds maximum stream id",
            });
        }

        let unknown = self.flags & !self.frame_type.flag_mask();
        if unknown != 0 {
            return Err(FrameError::InvalidFrameFlag {
                frame_type: self.frame_type,
                flag: format!("0x{unknown:02x}"),
            });
        }

        let max = max_length.min(MAX_FRAME_LENGTH);
        if self.length > max {
            return Err(FrameError::FrameTooLarge {
                length: self.length,
                max,
            });
        }

        Ok(())
    }

    /// Write the header. Callers validate first.
    pub(crate) fn put(&self, mut dst: impl BufMut) {
        dst.put_u16(self.length as u16);
        dst.put_u8(self.frame_type.id());
        dst.put_u8(self.flags);
        dst.put_u32(self.stream);
    }

    pub(crate) fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self> {
        let mut src = &bytes[..];
        let length = u32::from(src.get_u16());
        let frame_type = FrameType::try_from(src.get_u8())?;
        let flags = src.get_u8() & frame_type.flag_mask();
        // Reserved top bit is ignored on receipt.
        let stream = src.get_u32() & MAX_STREAM_ID;

        Ok(Self {
            length,
            frame_type,
            flags,
            stream,
        })
    }
}

/// Encode only the common header.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────┬──────────┬──────────────────┐
/// │ Length       │ Type     │ Flags    │ Stream           │
/// │ (2B BE)      │ (1B)     │ (1B)     │ (4B BE)          │
/// └──────────────┴──────────┴──────────┴──────────────────┘
/// ```
pub fn encode_common_header(header: &FrameHeader) -> Result<[u8; HEADER_SIZE]> {
    header.validate(MAX_FRAME_LENGTH)?;
    let mut out = [0u8; HEADER_SIZE];
    header.put(&mut out[..]);
    Ok(out)
}

/// Decode only the common header.
///
/// Unregistered flag bits are dropped. The returned `length` tells the caller
/// how many body bytes follow.
pub fn decode_common_header(bytes: &[u8; HEADER_SIZE]) -> Result<FrameHeader> {
    FrameHeader::parse(bytes)
}

use std::io::{ErrorKind, Read};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::{FrameError, Result};
use crate::flags::{Flags, HeadersFlag};
use crate::frame::{Frame, FrameBody, PING_PAYLOAD_SIZE};
use crate::header::{FrameHeader, HEADER_SIZE};
use crate::registry::{FrameType, MAX_FRAME_LENGTH};
use crate::settings::{Settings, SETTINGS_ENTRY_SIZE};

/// Default maximum declared frame length: the full 16-bit range.
pub const DEFAULT_MAX_FRAME_LENGTH: u32 = MAX_FRAME_LENGTH;

/// Configuration for the frame codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Largest `length` accepted on encode and decode. Values above 65535
    /// are clamped, since the length field is 16 bits. Default: 65535.
    pub max_frame_length: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
        }
    }
}

/// Stateless frame encoder/decoder.
///
/// Holds only its configuration, so one `Framer` can be shared freely
/// between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct Framer {
    config: FrameConfig,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Update the length limit for subsequent frames.
    pub fn set_max_frame_length(&mut self, max_frame_length: u32) {
        self.config.max_frame_length = max_frame_length;
    }

    fn max_frame_length(&self) -> u32 {
        self.config.max_frame_length.min(MAX_FRAME_LENGTH)
    }

    /// Encode a frame into a fresh buffer.
    pub fn generate(&self, frame: &Frame) -> Result<Bytes> {
        let mut dst = BytesMut::with_capacity(frame.wire_size());
        self.generate_into(frame, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Append a frame to `dst`.
    ///
    /// Every check runs before the first byte is written, so `dst` is
    /// untouched when an error is returned.
    pub fn generate_into(&self, frame: &Frame, dst: &mut BytesMut) -> Result<()> {
        let header = frame.header();
        header
            .validate(self.max_frame_length())
            .and_then(|()| validate_body(frame))
            .inspect_err(|err| debug!(error = %err, "refusing to encode frame"))?;

        dst.reserve(frame.wire_size());
        header.put(&mut *dst);
        encode_body(&frame.body, dst);

        trace!(
            frame_type = %header.frame_type,
            stream = header.stream,
            length = header.length,
            flags = header.flags,
            "encoded frame"
        );
        Ok(())
    }

    /// Read one frame from a blocking byte source.
    ///
    /// Returns `Ok(None)` when the source is at end-of-stream before the
    /// first header byte. EOF anywhere inside a frame is
    /// [`FrameError::ConnectionClosed`].
    pub fn parse<R: Read>(&self, src: &mut R) -> Result<Option<Frame>> {
        let mut head = [0u8; HEADER_SIZE];
        match fill(src, &mut head)? {
            0 => return Ok(None),
            HEADER_SIZE => {}
            _ => return Err(FrameError::ConnectionClosed),
        }

        let header = self.read_header(&head)?;
        let mut body = vec![0u8; header.length as usize];
        if fill(src, &mut body)? < body.len() {
            return Err(FrameError::ConnectionClosed);
        }

        self.finish(header, Bytes::from(body)).map(Some)
    }

    /// Decode one frame from a buffer.
    ///
    /// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
    /// Once a complete frame is buffered its bytes are consumed, whether or
    /// not the body turns out to be valid.
    pub fn decode(&self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }

        let mut head = [0u8; HEADER_SIZE];
        head.copy_from_slice(&src[..HEADER_SIZE]);
        let header = self.read_header(&head)?;

        let total = HEADER_SIZE + header.length as usize;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(HEADER_SIZE);
        let body = src.split_to(header.length as usize).freeze();
        self.finish(header, body).map(Some)
    }

    fn read_header(&self, head: &[u8; HEADER_SIZE]) -> Result<FrameHeader> {
        let header = FrameHeader::parse(head)
            .inspect_err(|err| debug!(error = %err, "rejected frame header"))?;

        let max = self.max_frame_length();
        if header.length > max {
            debug!(length = header.length, max, "rejected oversized frame");
            return Err(FrameError::FrameTooLarge {
                length: header.length,
                max,
            });
        }

        trace!(
            frame_type = %header.frame_type,
            stream = header.stream,
            length = header.length,
            flags = header.flags,
            "decoded frame header"
        );
        Ok(header)
    }

    fn finish(&self, header: FrameHeader, body: Bytes) -> Result<Frame> {
        let body = decode_body(&header, body)
            .inspect_err(|err| debug!(error = %err, "rejected frame body"))?;

        Ok(Frame {
            length: header.length,
            stream: header.stream,
            body,
        })
    }
}

/// Encode a frame with the default configuration.
pub fn generate(frame: &Frame) -> Result<Bytes> {
    Framer::default().generate(frame)
}

/// Append a frame to `dst` with the default configuration.
pub fn generate_into(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    Framer::default().generate_into(frame, dst)
}

/// Read one frame from `src` with the default configuration.
pub fn parse<R: Read>(src: &mut R) -> Result<Option<Frame>> {
    Framer::default().parse(src)
}

/// Decode one frame from a buffer with the default configuration.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    Framer::default().decode(src)
}

/// Read until `buf` is full or the source reports EOF. Returns bytes read.
fn fill<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(filled)
}

/// Type-specific rules layered over the common header checks.
fn validate_body(frame: &Frame) -> Result<()> {
    frame.body.check_fields()?;
    match &frame.body {
        FrameBody::Settings { .. } if frame.stream != 0 => Err(FrameError::InvalidStreamId {
            frame_type: FrameType::Settings,
            stream: frame.stream,
            reason: "SETTINGS frames must use stream 0",
        }),
        FrameBody::Ping { payload, .. } if payload.len() != PING_PAYLOAD_SIZE => {
            Err(FrameError::InvalidPayloadSize {
                frame_type: FrameType::Ping,
                size: payload.len(),
                expected: "8",
            })
        }
        _ => Ok(()),
    }
}

fn encode_body(body: &FrameBody, dst: &mut BytesMut) {
    match body {
        FrameBody::Data { payload, .. } | FrameBody::Ping { payload, .. } => {
            dst.put_slice(payload);
        }
        FrameBody::Headers {
            priority,
            header_block,
            ..
        } => {
            if let Some(priority) = priority {
                dst.put_u32(*priority);
            }
            dst.put_slice(header_block);
        }
        FrameBody::Priority { priority } => dst.put_u32(*priority),
        FrameBody::RstStream { error } => dst.put_u32(*error),
        FrameBody::Settings { settings } => settings.encode(dst),
        FrameBody::PushPromise {
            promise_stream,
            header_block,
            ..
        } => {
            dst.put_u32(*promise_stream);
            dst.put_slice(header_block);
        }
        FrameBody::GoAway {
            last_stream,
            error,
            debug_data,
        } => {
            dst.put_u32(*last_stream);
            dst.put_u32(*error);
            if let Some(debug_data) = debug_data {
                dst.put_slice(debug_data);
            }
        }
        FrameBody::WindowUpdate { window_size, .. } => dst.put_u32(*window_size),
    }
}

fn decode_body(header: &FrameHeader, mut body: Bytes) -> Result<FrameBody> {
    let frame_type = header.frame_type;
    let decoded = match frame_type {
        FrameType::Data => FrameBody::Data {
            flags: Flags::from_bits_truncate(header.flags),
            payload: body,
        },
        FrameType::Headers => {
            let flags = Flags::from_bits_truncate(header.flags);
            let priority = if flags.contains(HeadersFlag::Priority) {
                require(frame_type, &body, 4, "at least 4 with priority")?;
                Some(body.get_u32())
            } else {
                None
            };
            FrameBody::Headers {
                flags,
                priority,
                header_block: body,
            }
        }
        FrameType::Priority => {
            require(frame_type, &body, 4, "at least 4")?;
            FrameBody::Priority {
                priority: body.get_u32(),
            }
        }
        FrameType::RstStream => {
            require(frame_type, &body, 4, "at least 4")?;
            FrameBody::RstStream {
                error: body.get_u32(),
            }
        }
        FrameType::Settings => {
            if header.stream != 0 {
                return Err(FrameError::InvalidStreamId {
                    frame_type,
                    stream: header.stream,
                    reason: "SETTINGS frames must use stream 0",
                });
            }
            if body.len() % SETTINGS_ENTRY_SIZE != 0 {
                return Err(FrameError::InvalidPayloadSize {
                    frame_type,
                    size: body.len(),
                    expected: "a multiple of 8",
                });
            }
            FrameBody::Settings {
                settings: Settings::decode(&body),
            }
        }
        FrameType::PushPromise => {
            require(frame_type, &body, 4, "at least 4")?;
            let promise_stream = body.get_u32();
            FrameBody::PushPromise {
                flags: Flags::from_bits_truncate(header.flags),
                promise_stream,
                header_block: body,
            }
        }
        // Trusts the declared length; no size check on receipt.
        FrameType::Ping => FrameBody::Ping {
            flags: Flags::from_bits_truncate(header.flags),
            payload: body,
        },
        FrameType::GoAway => {
            require(frame_type, &body, 8, "at least 8")?;
            let last_stream = body.get_u32();
            let error = body.get_u32();
            FrameBody::GoAway {
                last_stream,
                error,
                debug_data: if body.is_empty() { None } else { Some(body) },
            }
        }
        FrameType::WindowUpdate => {
            require(frame_type, &body, 4, "at least 4")?;
            FrameBody::WindowUpdate {
                flags: Flags::from_bits_truncate(header.flags),
                window_size: body.get_u32(),
            }
        }
    };
    Ok(decoded)
}

fn require(frame_type: FrameType, body: &Bytes, min: usize, expected: &'static str) -> Result<()> {
    if body.len() < min {
        return Err(FrameError::InvalidPayloadSize {
            frame_type,
            size: body.len(),
            expected,
        });
    }
    Ok(())
}

//! [`tokio_util::codec`] adapter for async transports.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{FrameConfig, Framer};
use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Frame codec for `FramedRead` / `FramedWrite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec {
    framer: Framer,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            framer: Framer::with_config(config),
        }
    }

    pub fn config(&self) -> &FrameConfig {
        self.framer.config()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        self.framer.decode(src)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(FrameError::ConnectionClosed),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        self.framer.generate_into(&item, dst)
    }
}

impl Encoder<&Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<()> {
        self.framer.generate_into(item, dst)
    }
}

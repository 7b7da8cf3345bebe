use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{FrameConfig, Framer};
use crate::error::{FrameError, Result};
use crate::frame::Frame;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    framer: Framer,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            framer: Framer::with_config(config),
        }
    }

    /// Encode and write a complete frame (blocking).
    ///
    /// Nothing reaches the stream if the frame fails validation. A
    /// `WouldBlock` from a non-blocking stream is returned as
    /// [`FrameError::Io`] and may leave a partial frame on the wire.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        self.framer.generate_into(frame, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the maximum frame length for subsequent frame encoding.
    pub fn set_max_frame_length(&mut self, max_frame_length: u32) {
        self.framer.set_max_frame_length(max_frame_length);
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        self.framer.config()
    }
}

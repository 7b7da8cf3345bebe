use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{FrameConfig, Framer};
use crate::error::{FrameError, Result};
use crate::frame::Frame;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally — callers always get complete frames.
/// Also usable as an iterator; iteration stops after the first error.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    framer: Framer,
    failed: bool,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            framer: Framer::with_config(config),
            failed: false,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Ok(None)` at a clean end-of-stream (EOF between frames) and
    /// `Err(FrameError::ConnectionClosed)` when EOF cuts a frame short.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.framer.decode(&mut self.buf)? {
                return Ok(Some(frame));
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    trace!("end of frame stream");
                    return Ok(None);
                }
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
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

    /// Consume the reader and return the inner stream.
    ///
    /// Bytes already buffered but not yet decoded are dropped.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update the maximum frame length for subsequent frame decoding.
    pub fn set_max_frame_length(&mut self, max_frame_length: u32) {
        self.framer.set_max_frame_length(max_frame_length);
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.framer.config()
    }
}

impl<T: Read> Iterator for FrameReader<T> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.read_frame().transpose();
        if matches!(next, Some(Err(_))) {
            self.failed = true;
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::codec::generate_into;
    use crate::frame::FrameBody;
    use crate::header::HEADER_SIZE;
    use crate::registry::FrameType;

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            generate_into(frame, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[Frame::data(1, "hello")])));
        let frame = reader.read_frame().unwrap().unwrap();

        assert_eq!(frame.stream, 1);
        assert_eq!(frame, Frame::data(1, "hello"));
    }

    #[test]
    fn read_multiple_frames() {
        let frames = [
            Frame::data(1, "one"),
            Frame::ping(*b"pingpong", false),
            Frame::goaway(1, 0),
        ];
        let reader = FrameReader::new(Cursor::new(wire(&frames)));

        let read: Vec<Frame> = reader.collect::<Result<_>>().unwrap();
        assert_eq!(read, frames);
    }

    #[test]
    fn read_frame_with_max_payload() {
        let payload = vec![0xAB; 65_535];
        let mut reader = FrameReader::new(Cursor::new(wire(&[Frame::data(9, payload.clone())])));
        let frame = reader.read_frame().unwrap().unwrap();

        assert_eq!(frame.length, 65_535);
        assert!(matches!(frame.body, FrameBody::Data { payload: ref p, .. } if p.as_ref() == payload.as_slice()));
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: wire(&[Frame::data(4, "slow")]),
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap().unwrap();
        assert_eq!(frame, Frame::data(4, "slow"));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn clean_eof_is_end_of_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_frame().unwrap().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut partial = wire(&[Frame::data(2, "only-part-of-it")]);
        partial.truncate(HEADER_SIZE + 9);

        let mut reader = FrameReader::new(Cursor::new(partial));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_header() {
        let mut reader = FrameReader::new(Cursor::new(vec![0x00, 0x04, 0x00, 0x01]));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn invalid_type_in_stream() {
        let bytes = vec![0x00, 0x00, 0x42, 0x00, 0x00, 0x00, 0x00, 0x00];
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::InvalidFrameType(_)));
    }

    #[test]
    fn iterator_stops_after_error() {
        let mut bytes = wire(&[Frame::data(1, "ok")]);
        bytes.extend_from_slice(&[0x00, 0x00, 0x42, 0x00, 0x00, 0x00, 0x00, 0x00]);
        let mut reader = FrameReader::new(Cursor::new(bytes));

        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().unwrap().is_err());
        assert!(reader.next().is_none());
    }

    #[test]
    fn oversized_frame_in_stream() {
        let cfg = FrameConfig {
            max_frame_length: 16,
        };
        let mut reader =
            FrameReader::with_config(Cursor::new(wire(&[Frame::data(1, vec![0u8; 1024])])), cfg);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { length: 1024, max: 16 }));
    }

    #[test]
    fn set_max_frame_length_updates_config() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        reader.set_max_frame_length(1024);
        assert_eq!(reader.config().max_frame_length, 1024);
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            if buf.is_empty() {
                return Ok(0);
            }

            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_socket_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.write_frame(&Frame::ping(*b"\0\0\0\0\0\0\0\x01", false)).unwrap();
        let frame = reader.read_frame().unwrap().unwrap();

        assert_eq!(frame.frame_type(), FrameType::Ping);
        assert_eq!(frame.stream, 0);
    }

    #[test]
    #[cfg(unix)]
    fn eof_after_writer_dropped() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        writer.write_frame(&Frame::goaway(3, 0)).unwrap();
        drop(writer);

        assert_eq!(reader.read_frame().unwrap().unwrap(), Frame::goaway(3, 0));
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    #[cfg(unix)]
    fn concurrent_reader_writer_threads() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::FrameWriter::new(left);
        let reader = FrameReader::new(right);
        let reader = Arc::new(Mutex::new(reader));

        let reader_thread = {
            let reader = Arc::clone(&reader);
            std::thread::spawn(move || {
                for expected in 0..64u32 {
                    let frame = reader.lock().unwrap().read_frame().unwrap().unwrap();
                    assert_eq!(frame.stream, expected * 2 + 1);
                    assert!(matches!(
                        frame.body,
                        FrameBody::Data { ref payload, .. }
                            if payload == &Bytes::from(format!("msg-{expected}"))
                    ));
                }
            })
        };

        for i in 0..64u32 {
            writer
                .write_frame(&Frame::data(i * 2 + 1, format!("msg-{i}")))
                .unwrap();
        }

        reader_thread.join().unwrap();
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = FrameReader::new(cursor);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = WouldBlockThenData {
            state: 0,
            bytes: wire(&[Frame::data(7, "ok")]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    struct WouldBlockThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for WouldBlockThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            state: 0,
            bytes: wire(&[Frame::data(8, "ok")]),
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        let frame = framed.read_frame().unwrap().unwrap();

        assert_eq!(frame, Frame::data(8, "ok"));
    }

    struct InterruptedThenData {
        state: u8,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.state == 0 {
                self.state = 1;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameHeader, FrameValidator};

/// Buffered reader decoding client frames from the read half of a stream.
///
/// Each header is validated before its payload is buffered, so an oversized
/// frame is rejected without reading it.
pub struct FrameReader<R> {
    io: R,
    buf: BytesMut,
    chunk: usize,
    validator: FrameValidator,
}

impl<R> FrameReader<R> {
    #[must_use]
    pub fn new(io: R, config: &Config) -> Self {
        let validator = FrameValidator::new(config.limits.clone())
            .with_accept_unmasked(config.accept_unmasked_frames);
        Self {
            io,
            buf: BytesMut::with_capacity(config.read_buffer_size),
            chunk: config.read_buffer_size.max(1),
            validator,
        }
    }

}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read the next complete frame.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed(None)` if the stream ends
    /// - `Error::Io` on a read failure
    /// - any header or validation error for a malformed frame
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match FrameHeader::parse(&self.buf) {
                Ok(header) => {
                    self.validator.validate(&header)?;
                    let total = header.frame_len()?;
                    if self.buf.len() >= total {
                        let frame = Frame::from_header(&header, &self.buf);
                        self.buf.advance(total);
                        return Ok(frame);
                    }
                    self.buf.reserve(total - self.buf.len());
                }
                Err(Error::IncompleteFrame { .. }) => self.buf.reserve(self.chunk),
                Err(e) => return Err(e),
            }

            let n = self.io.read_buf(&mut self.buf).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed(None));
            }
        }
    }
}

/// Writer encoding unmasked server frames onto the write half of a stream.
pub struct FrameWriter<W> {
    io: W,
    buf: BytesMut,
}

impl<W> FrameWriter<W> {
    #[must_use]
    pub fn new(io: W, config: &Config) -> Self {
        Self {
            io,
            buf: BytesMut::with_capacity(config.write_buffer_size),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.io
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Encode `frame` and write it out.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the stream rejects the write.
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.buf.clear();
        frame.write(&mut self.buf, None);
        self.io.write_all(&self.buf).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.io.flush().await?;
        Ok(())
    }

    /// Shut down the write direction of the stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::protocol::OpCode;
    use std::io::Cursor;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::ReadBuf;

    /// Serves `read_data` in chunks of at most `chunk` bytes and records writes.
    struct MockStream {
        read_data: Cursor<Vec<u8>>,
        chunk: usize,
        write_data: Vec<u8>,
        fail_writes: bool,
    }

    impl MockStream {
        fn new(data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(data),
                chunk: usize::MAX,
                write_data: Vec::new(),
                fail_writes: false,
            }
        }

        fn trickle(data: Vec<u8>, chunk: usize) -> Self {
            Self {
                chunk,
                ..Self::new(data)
            }
        }

        fn broken() -> Self {
            Self {
                fail_writes: true,
                ..Self::new(vec![])
            }
        }
    }

    impl AsyncRead for MockStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            let pos = self.read_data.position() as usize;
            let data = self.read_data.get_ref();
            if pos >= data.len() {
                return Poll::Ready(Ok(()));
            }
            let remaining = &data[pos..];
            let to_copy = remaining.len().min(buf.remaining()).min(self.chunk);
            buf.put_slice(&remaining[..to_copy]);
            self.read_data.set_position((pos + to_copy) as u64);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.fail_writes {
                return Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()));
            }
            self.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    // Masked "Hello" from RFC 6455 Section 5.7
    const MASKED_HELLO: [u8; 11] = [
        0x81, 0x85, 0x37, 0xfa, 0x21, 0x3d, 0x7f, 0x9f, 0x4d, 0x51, 0x58,
    ];

    #[tokio::test]
    async fn test_read_frame() {
        let mut reader = FrameReader::new(MockStream::new(MASKED_HELLO.to_vec()), &Config::server());

        let frame = reader.read_frame().await.unwrap();
        assert!(frame.fin);
        assert_eq!(frame.opcode, OpCode::Text);
        assert_eq!(frame.payload(), b"Hello");
    }

    #[tokio::test]
    async fn test_read_frame_byte_by_byte() {
        let stream = MockStream::trickle(MASKED_HELLO.to_vec(), 1);
        let mut reader = FrameReader::new(stream, &Config::server());

        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.payload(), b"Hello");
    }

    #[tokio::test]
    async fn test_read_multiple_frames() {
        // "Hi" masked with [0x12, 0x34, 0x56, 0x78], then [0x01, 0x02]
        // masked with [0xaa, 0xbb, 0xcc, 0xdd]
        let data = vec![
            0x81, 0x82, 0x12, 0x34, 0x56, 0x78, 0x5a, 0x5d, //
            0x82, 0x82, 0xaa, 0xbb, 0xcc, 0xdd, 0xab, 0xb9,
        ];
        let mut reader = FrameReader::new(MockStream::new(data), &Config::server());

        assert_eq!(reader.read_frame().await.unwrap().payload(), b"Hi");
        let second = reader.read_frame().await.unwrap();
        assert_eq!(second.opcode, OpCode::Binary);
        assert_eq!(second.payload(), &[0x01, 0x02]);
    }

    #[tokio::test]
    async fn test_read_large_payload() {
        // Zero mask leaves the payload unchanged.
        let mut data = vec![0x82, 0xFE, 0x01, 0x2C, 0x00, 0x00, 0x00, 0x00];
        data.extend_from_slice(&[0xAB; 300]);

        let config = Config::server().with_read_buffer_size(64);
        let mut reader = FrameReader::new(MockStream::new(data), &config);

        let frame = reader.read_frame().await.unwrap();
        assert_eq!(frame.payload().len(), 300);
        assert!(frame.payload().iter().all(|&b| b == 0xAB));
    }

    #[tokio::test]
    async fn test_read_connection_closed() {
        let mut reader = FrameReader::new(MockStream::new(vec![]), &Config::server());
        let result = reader.read_frame().await;
        assert!(matches!(result, Err(Error::ConnectionClosed(None))));
    }

    #[tokio::test]
    async fn test_read_truncated_frame_is_closed() {
        let data = MASKED_HELLO[..7].to_vec();
        let mut reader = FrameReader::new(MockStream::new(data), &Config::server());
        let result = reader.read_frame().await;
        assert!(matches!(result, Err(Error::ConnectionClosed(None))));
    }

    #[tokio::test]
    async fn test_read_rejects_unmasked_frame() {
        let data = vec![0x81, 0x02, b'H', b'i'];
        let mut reader = FrameReader::new(MockStream::new(data), &Config::server());
        let result = reader.read_frame().await;
        assert!(matches!(result, Err(Error::UnmaskedClientFrame)));
    }

    #[tokio::test]
    async fn test_read_rejects_oversized_before_payload() {
        // Declares 2048 bytes but sends only the header.
        let data = vec![0x82, 0xFE, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];
        let config = Config::server().with_limits(Limits::new(1024));
        let mut reader = FrameReader::new(MockStream::new(data), &config);

        let result = reader.read_frame().await;
        assert!(matches!(
            result,
            Err(Error::FrameTooLarge {
                size: 2048,
                max: 1024
            })
        ));
    }

    #[tokio::test]
    async fn test_write_frame_unmasked() {
        let mut writer = FrameWriter::new(MockStream::new(vec![]), &Config::server());
        writer.write_frame(&Frame::text("Hi")).await.unwrap();
        writer.flush().await.unwrap();

        let written = writer.into_inner().write_data;
        assert_eq!(written, vec![0x81, 0x02, b'H', b'i']);
    }

    #[tokio::test]
    async fn test_write_frames_back_to_back() {
        let mut writer = FrameWriter::new(MockStream::new(vec![]), &Config::server());
        writer.write_frame(&Frame::text("a")).await.unwrap();
        writer.write_frame(&Frame::close(Some(1000), "")).await.unwrap();

        let written = writer.into_inner().write_data;
        assert_eq!(written, vec![0x81, 0x01, b'a', 0x88, 0x02, 0x03, 0xe8]);
    }

    #[tokio::test]
    async fn test_write_failure_is_io_error() {
        let mut writer = FrameWriter::new(MockStream::broken(), &Config::server());
        let result = writer.write_frame(&Frame::text("x")).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_shutdown() {
        let mut writer = FrameWriter::new(MockStream::new(vec![]), &Config::server());
        assert!(writer.shutdown().await.is_ok());
    }
}

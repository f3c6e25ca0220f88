//! Minimal WebSocket client speaking raw frames, for driving the server.

use std::io;
use std::net::SocketAddr;

use bytes::BytesMut;
use statusws::protocol::Frame;
use statusws::{CloseCode, CloseFrame, OpCode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

/// Sample key from RFC 6455 Section 1.3.
pub const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";
pub const SAMPLE_ACCEPT: &str = "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=";

/// Status line, headers and body of an HTTP/1.1 response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Send `request` verbatim and read one response (headers plus a
/// `content-length` body) from the stream.
pub async fn raw_request(stream: &mut TcpStream, request: &str) -> io::Result<HttpResponse> {
    stream.write_all(request.as_bytes()).await?;
    let mut buf = Vec::new();
    read_response(stream, &mut buf).await
}

async fn read_response<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut Vec<u8>,
) -> io::Result<HttpResponse> {
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "bad status line"))?;
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    buf.drain(..head_end);
    while buf.len() < content_length {
        let mut chunk = [0u8; 1024];
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = buf.drain(..content_length).collect();

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

/// Client end of an upgraded connection. Frames it sends are masked.
pub struct TestClient<S> {
    stream: S,
    buf: Vec<u8>,
    mask: [u8; 4],
}

impl TestClient<TcpStream> {
    /// Open a TCP connection to `addr` and perform the opening handshake on `path`.
    pub async fn connect(addr: SocketAddr, path: &str) -> io::Result<(Self, HttpResponse)> {
        let mut stream = TcpStream::connect(addr).await?;
        let request = format!(
            "GET {path} HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {SAMPLE_KEY}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        stream.write_all(request.as_bytes()).await?;

        let mut buf = Vec::new();
        let response = read_response(&mut stream, &mut buf).await?;
        if response.status != 101 {
            return Err(io::Error::other(format!(
                "expected 101, got {}",
                response.status
            )));
        }

        let client = Self {
            stream,
            buf,
            mask: [0x5a, 0x17, 0xc3, 0x09],
        };
        Ok((client, response))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> TestClient<S> {
    /// Wrap a stream that is already past the handshake.
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            buf: Vec::new(),
            mask: [0x5a, 0x17, 0xc3, 0x09],
        }
    }

    pub async fn send_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let mut out = BytesMut::new();
        frame.write(&mut out, Some(self.mask));
        self.stream.write_all(&out).await
    }

    pub async fn send_text(&mut self, text: &str) -> io::Result<()> {
        self.send_frame(&Frame::text(text)).await
    }

    pub async fn send_close(&mut self, code: CloseCode, reason: &str) -> io::Result<()> {
        self.send_frame(&Frame::close(Some(code.as_u16()), reason))
            .await
    }

    /// Next frame from the server, or `None` once the server has hung up.
    pub async fn recv_frame(&mut self) -> io::Result<Option<Frame>> {
        loop {
            if let Ok((frame, used)) = Frame::parse(&self.buf) {
                self.buf.drain(..used);
                return Ok(Some(frame));
            }
            let mut chunk = [0u8; 1024];
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Next text frame as a string.
    pub async fn recv_text(&mut self) -> io::Result<Option<String>> {
        match self.recv_frame().await? {
            Some(frame) if frame.opcode == OpCode::Text => {
                Ok(Some(String::from_utf8_lossy(frame.payload()).into_owned()))
            }
            Some(frame) => Err(io::Error::other(format!(
                "expected text, got {}",
                frame.opcode
            ))),
            None => Ok(None),
        }
    }

    /// Read until the server's Close frame, returning it and every status
    /// text received before it.
    pub async fn drain_until_close(&mut self) -> io::Result<(Vec<String>, Option<CloseFrame>)> {
        let mut texts = Vec::new();
        while let Some(frame) = self.recv_frame().await? {
            match frame.opcode {
                OpCode::Text => texts.push(String::from_utf8_lossy(frame.payload()).into_owned()),
                OpCode::Close => return Ok((texts, CloseFrame::from_payload(frame.payload()))),
                other => {
                    return Err(io::Error::other(format!("unexpected {other} frame")));
                }
            }
        }
        Err(io::ErrorKind::UnexpectedEof.into())
    }

    /// True once the server has closed its side.
    pub async fn at_eof(&mut self) -> io::Result<bool> {
        if !self.buf.is_empty() {
            return Ok(false);
        }
        let mut chunk = [0u8; 64];
        Ok(self.stream.read(&mut chunk).await? == 0)
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

//! Wire contract of the remote parsing service.
//!
//! Messages travel over plain TCP as length-prefixed frames:
//!
//! ```text
//! [4-byte length, big-endian u32] [bincode payload]
//! ```
//!
//! A connection carries any number of sequential request/response pairs. The
//! gateway only ever plays the client role, but [`serve`] hosts a
//! [`ParsingService`] so that the same contract can be exercised in-process.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::core::uast::Node;

pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),
}

/// Outcome reported by the parsing service for a single call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Ok,
    Error,
    Fatal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf8,
    Base64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseRequest {
    pub filename: String,
    /// Empty asks the service to detect the language itself.
    pub language: String,
    pub content: String,
    pub encoding: Encoding,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    pub status: Status,
    pub errors: Option<Vec<String>>,
    pub elapsed: Duration,
    pub language: String,
    pub uast: Option<Node>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRequest;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub status: Status,
    pub errors: Option<Vec<String>>,
    pub elapsed: Duration,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    Parse(ParseRequest),
    Version(VersionRequest),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Parse(ParseResponse),
    Version(VersionResponse),
}

/// Server side of the contract.
pub trait ParsingService: Send + Sync + 'static {
    fn parse(&self, request: ParseRequest) -> ParseResponse;
    fn version(&self, request: VersionRequest) -> VersionResponse;

    fn handle(&self, request: Request) -> Response {
        match request {
            Request::Parse(req) => Response::Parse(self.parse(req)),
            Request::Version(req) => Response::Version(self.version(req)),
        }
    }
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(message)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }

    writer.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame. `Ok(None)` means the peer closed the stream cleanly between frames.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(bincode::deserialize(&buf)?))
}

/// Accept connections forever, answering every request frame with `service`.
pub async fn serve<S: ParsingService>(
    listener: TcpListener,
    service: Arc<S>,
) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, service.as_ref()).await {
                tracing::debug!(%peer, error = %e, "parsing service connection closed");
            }
        });
    }
}

async fn handle_connection<S: ParsingService>(
    mut stream: TcpStream,
    service: &S,
) -> Result<(), ProtocolError> {
    while let Some(request) = read_frame::<_, Request>(&mut stream).await? {
        let response = service.handle(request);
        write_frame(&mut stream, &response).await?;
    }
    Ok(())
}

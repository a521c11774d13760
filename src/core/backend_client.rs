//! Client side of the parsing service protocol

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::core::protocol::{
    ParseRequest, ParseResponse, ProtocolError, Request, Response, VersionRequest,
    VersionResponse, read_frame, write_frame,
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Cannot connect to parsing service at {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parsing service at {addr} failed: {source}")]
    Transport {
        addr: String,
        #[source]
        source: ProtocolError,
    },

    #[error("Parsing service at {addr} closed the connection")]
    Closed { addr: String },

    #[error("Parsing service at {addr} answered a {expected} request with another message")]
    UnexpectedResponse { addr: String, expected: &'static str },
}

/// Connections to one parsing service. Each call checks an idle stream out of the
/// pool, or dials a new one when all are busy, so concurrent calls never wait on
/// each other. A stream goes back to the pool only after a complete exchange.
#[derive(Debug)]
pub struct BackendClient {
    addr: String,
    idle: Mutex<Vec<TcpStream>>,
}

impl BackendClient {
    /// Dial `addr` once. There is no retry.
    pub async fn connect(addr: &str) -> Result<Self, BackendError> {
        let stream = dial(addr).await?;
        tracing::debug!(%addr, "connected to parsing service");

        Ok(Self {
            addr: addr.to_string(),
            idle: Mutex::new(vec![stream]),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResponse, BackendError> {
        match self.call(Request::Parse(request)).await? {
            Response::Parse(resp) => Ok(resp),
            _ => Err(BackendError::UnexpectedResponse {
                addr: self.addr.clone(),
                expected: "parse",
            }),
        }
    }

    pub async fn version(&self) -> Result<VersionResponse, BackendError> {
        match self.call(Request::Version(VersionRequest)).await? {
            Response::Version(resp) => Ok(resp),
            _ => Err(BackendError::UnexpectedResponse {
                addr: self.addr.clone(),
                expected: "version",
            }),
        }
    }

    async fn call(&self, request: Request) -> Result<Response, BackendError> {
        let idle = self.idle.lock().await.pop();
        let mut stream = match idle {
            Some(stream) => stream,
            None => {
                tracing::debug!(addr = %self.addr, "no idle connection, dialing parsing service");
                dial(&self.addr).await?
            }
        };

        let response = self.exchange(&mut stream, &request).await?;
        self.idle.lock().await.push(stream);
        Ok(response)
    }

    async fn exchange(
        &self,
        stream: &mut TcpStream,
        request: &Request,
    ) -> Result<Response, BackendError> {
        let transport = |source| BackendError::Transport {
            addr: self.addr.clone(),
            source,
        };

        write_frame(stream, request).await.map_err(transport)?;
        read_frame(stream)
            .await
            .map_err(transport)?
            .ok_or_else(|| BackendError::Closed {
                addr: self.addr.clone(),
            })
    }
}

async fn dial(addr: &str) -> Result<TcpStream, BackendError> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| BackendError::Connection {
            addr: addr.to_string(),
            source,
        })
}

/// Hands out the parsing service connection for a request: the shared default one,
/// or a private connection to a caller-supplied address.
#[derive(Debug, Clone)]
pub struct BackendFactory {
    default: Arc<BackendClient>,
}

impl BackendFactory {
    pub fn new(default: BackendClient) -> Self {
        Self {
            default: Arc::new(default),
        }
    }

    /// Connect to the default address. Failing here should abort startup.
    pub async fn with_default_addr(addr: &str) -> Result<Self, BackendError> {
        Ok(Self::new(BackendClient::connect(addr).await?))
    }

    pub fn default_client(&self) -> &Arc<BackendClient> {
        &self.default
    }

    /// The returned custom client is owned by the caller alone and its stream
    /// closes when it is dropped.
    pub async fn connect(&self, addr: Option<&str>) -> Result<Arc<BackendClient>, BackendError> {
        match addr.map(str::trim).filter(|addr| !addr.is_empty()) {
            None => Ok(self.default.clone()),
            Some(addr) => {
                tracing::debug!(%addr, "using custom parsing service");
                Ok(Arc::new(BackendClient::connect(addr).await?))
            }
        }
    }
}

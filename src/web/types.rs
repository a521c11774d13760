//! Public JSON shapes of the dashboard API and their translation to and from
//! the parsing service protocol

use serde::{Deserialize, Serialize, Serializer};

use crate::core::protocol::{self, Encoding, Status};
use crate::core::uast::Node;
use crate::core::uast_query::{self, QueryError};
use crate::web::errors::ApiError;

/// Numeric status of a response body. The numbers are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    Error,
}

impl ResponseStatus {
    pub fn code(&self) -> u8 {
        match self {
            ResponseStatus::Ok => 0,
            ResponseStatus::Error => 2,
        }
    }
}

impl Serialize for ResponseStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl From<Status> for ResponseStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Ok => ResponseStatus::Ok,
            Status::Error | Status::Fatal => ResponseStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `None` and an empty list stay distinct: `null` versus `[]`.
fn to_error_messages(errors: Option<Vec<String>>) -> Option<Vec<ErrorMessage>> {
    errors.map(|errors| errors.into_iter().map(ErrorMessage::new).collect())
}

/// Body of every failed request.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub status: ResponseStatus,
    pub errors: Vec<ErrorMessage>,
}

impl ErrorResponse {
    pub fn new(errors: Vec<ErrorMessage>) -> Self {
        Self {
            status: ResponseStatus::Error,
            errors,
        }
    }
}

fn decode_body<'de, T: Deserialize<'de>>(body: &'de [u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParseRequest {
    pub language: Option<String>,
    pub filename: Option<String>,
    /// Required, although it may be empty.
    pub content: String,
    pub query: Option<String>,
    pub server_url: Option<String>,
    pub encoding: Option<Encoding>,
}

impl ParseRequest {
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        decode_body(body)
    }

    pub fn to_backend(&self) -> protocol::ParseRequest {
        protocol::ParseRequest {
            filename: self.filename.clone().unwrap_or_default(),
            language: self.language.clone().unwrap_or_default(),
            content: self.content.clone(),
            encoding: self.encoding.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResponse {
    pub status: ResponseStatus,
    pub errors: Option<Vec<ErrorMessage>>,
    /// Seconds
    pub elapsed: f64,
    pub language: String,
    pub uast: Option<Node>,
}

impl ParseResponse {
    /// Shape a backend answer for `request`. The request's query only applies to
    /// successful parses; a failed parse keeps whatever partial tree it returned.
    pub fn from_backend(
        response: protocol::ParseResponse,
        request: &ParseRequest,
    ) -> Result<Self, QueryError> {
        let status = ResponseStatus::from(response.status);

        let (language, uast) = match status {
            ResponseStatus::Ok if request.content.is_empty() => (String::new(), None),
            ResponseStatus::Ok => (
                response.language,
                uast_query::filter(response.uast, request.query.as_deref())?,
            ),
            ResponseStatus::Error => (response.language, response.uast),
        };

        Ok(Self {
            status,
            errors: to_error_messages(response.errors),
            elapsed: response.elapsed.as_secs_f64(),
            language,
            uast,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VersionRequest {
    pub server_url: Option<String>,
}

impl VersionRequest {
    /// An empty body is the same as `{}`.
    pub fn from_json(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        decode_body(body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionResponse {
    pub dashboard: String,
    pub server: String,
}

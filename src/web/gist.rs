//! Relay of code snippets hosted as GitHub gists

use axum::{
    body::Bytes,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use std::sync::Arc;

use crate::web::errors::ApiError;

/// Builds the upstream URL for the `url` parameter of a gist request.
pub type GistUrlBuilder = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub fn default_gist_url(path: &str) -> String {
    format!(
        "https://gist.githubusercontent.com/{}/raw/",
        path.trim_matches('/')
    )
}

#[derive(Clone)]
pub struct GistFetcher {
    client: Client,
    make_url: GistUrlBuilder,
}

impl Default for GistFetcher {
    fn default() -> Self {
        Self::new(default_gist_url)
    }
}

impl GistFetcher {
    pub fn new(make_url: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            client: Client::new(),
            make_url: Arc::new(make_url),
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        (self.make_url)(path)
    }

    /// Fetch once. Every upstream failure, whatever its cause, becomes `GistNotFound`.
    pub async fn fetch(&self, path: &str) -> Result<Gist, ApiError> {
        let url = self.url_for(path);

        let response = self.client.get(&url).send().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "gist request failed");
            ApiError::GistNotFound
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%url, %status, "gist upstream answered with an error");
            return Err(ApiError::GistNotFound);
        }

        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "gist body could not be read");
            ApiError::GistNotFound
        })?;

        Ok(Gist {
            status,
            content_type,
            body,
        })
    }
}

/// Upstream answer relayed as-is.
#[derive(Debug)]
pub struct Gist {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl IntoResponse for Gist {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        if let Some(content_type) = self.content_type {
            response.headers_mut().insert(CONTENT_TYPE, content_type);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gist_url() {
        assert_eq!(
            default_gist_url("bzz/0123abcd"),
            "https://gist.githubusercontent.com/bzz/0123abcd/raw/"
        );
        assert_eq!(
            default_gist_url("/bzz/0123abcd/"),
            "https://gist.githubusercontent.com/bzz/0123abcd/raw/"
        );
    }

    #[test]
    fn test_url_builder_is_injected() {
        let fetcher = GistFetcher::new(|path| format!("http://127.0.0.1:1/{path}"));
        assert_eq!(fetcher.url_for("a/b"), "http://127.0.0.1:1/a/b");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_not_found() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = GistFetcher::new(move |path| format!("http://{addr}/{path}"));
        let result = fetcher.fetch("any/gist").await;
        assert!(matches!(result, Err(ApiError::GistNotFound)));
    }
}

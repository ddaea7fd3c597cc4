//! Library API service trait and HTTP implementation
//!
//! [`LibraryApi`] is the transport seam: the fetch client and the event
//! channel only see the trait, tests substitute an in-memory fake.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use marquee_model::routes::{self, v1};
use marquee_model::{Library, LibraryId, NewLibrary};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::auth::AuthToken;
use crate::error::{LibraryError, LibraryResult};

/// Remote library operations.
#[async_trait]
pub trait LibraryApi: Send + Sync + Debug {
    /// `GET /api/v1/library`
    async fn fetch_libraries(
        &self,
        token: &AuthToken,
    ) -> LibraryResult<Vec<Library>>;

    /// `GET /api/v1/library/{id}`; used to resolve bare-id push events.
    async fn fetch_library(
        &self,
        token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<Library>;

    /// `POST /api/v1/library`
    async fn create_library(
        &self,
        token: &AuthToken,
        request: &NewLibrary,
    ) -> LibraryResult<Library>;

    /// `DELETE /api/v1/library/{id}`
    async fn delete_library(
        &self,
        token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<()>;
}

/// [`LibraryApi`] over HTTP/JSON.
#[derive(Clone)]
pub struct HttpLibraryApi {
    client: Client,
    base_url: String,
}

impl Debug for HttpLibraryApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpLibraryApi")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Add `http://` when the scheme is missing and trim trailing slashes, so
/// `localhost:8000/` and `http://localhost:8000` behave the same.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

impl HttpLibraryApi {
    pub fn new(base_url: &str, timeout: Duration) -> LibraryResult<Self> {
        let normalized = normalize_base_url(base_url);
        if normalized != base_url {
            warn!(
                original = base_url,
                normalized = %normalized,
                "normalized library API base URL"
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| LibraryError::Network(err.to_string()))?;

        info!(base_url = %normalized, "library API client ready");

        Ok(Self {
            client,
            base_url: normalized,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: impl AsRef<str>) -> String {
        format!(
            "{}/{}",
            self.base_url,
            path.as_ref().trim_start_matches('/')
        )
    }

    /// The server reads the raw session token from `Authorization`.
    fn authorize(
        &self,
        builder: RequestBuilder,
        token: &AuthToken,
    ) -> LibraryResult<RequestBuilder> {
        if token.is_empty() {
            return Err(LibraryError::Authorization(
                "no session token; please log in again".to_string(),
            ));
        }
        Ok(builder.header(reqwest::header::AUTHORIZATION, token.as_str()))
    }

    async fn send(&self, request: RequestBuilder) -> LibraryResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(error_for_status(status, body))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> LibraryResult<T> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|err| LibraryError::InvalidResponse(err.to_string()))
    }
}

fn error_for_status(status: StatusCode, body: String) -> LibraryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            LibraryError::Authorization(if body.is_empty() {
                status.to_string()
            } else {
                body
            })
        }
        status => LibraryError::Server {
            status: status.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl LibraryApi for HttpLibraryApi {
    async fn fetch_libraries(
        &self,
        token: &AuthToken,
    ) -> LibraryResult<Vec<Library>> {
        let url = self.build_url(v1::library::COLLECTION);
        debug!(%url, "fetching libraries");
        let request = self.authorize(self.client.get(&url), token)?;
        self.execute_json(request).await
    }

    async fn fetch_library(
        &self,
        token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<Library> {
        let url = self.build_url(routes::library_item(id));
        debug!(%url, library_id = %id, "resolving library");
        let request = self.authorize(self.client.get(&url), token)?;
        self.execute_json(request).await
    }

    async fn create_library(
        &self,
        token: &AuthToken,
        request: &NewLibrary,
    ) -> LibraryResult<Library> {
        let url = self.build_url(v1::library::COLLECTION);
        debug!(%url, name = %request.name, "creating library");
        let builder =
            self.authorize(self.client.post(&url).json(request), token)?;
        self.execute_json(builder).await
    }

    async fn delete_library(
        &self,
        token: &AuthToken,
        id: LibraryId,
    ) -> LibraryResult<()> {
        let url = self.build_url(routes::library_item(id));
        debug!(%url, library_id = %id, "deleting library");
        let request = self.authorize(self.client.delete(&url), token)?;
        self.send(request).await.map(|_| ())
    }
}

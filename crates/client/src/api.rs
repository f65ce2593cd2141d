//! HTTP client for the Officine REST backend.
//!
//! Every request goes through [`ApiClient`], which attaches the session token,
//! normalizes failures into [`ApiError`] and keeps a count of requests in
//! flight. A 401 from any endpoint clears the session before the error is
//! returned.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use officine_core::{Envelope, continuation_path, extract_error_message, field_errors};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::{ClientConfig, ConfigError, normalize_base_url};
use crate::error::{ApiError, GENERIC_MESSAGE};
use crate::session::Session;

/// Officine backend client.
///
/// Cloning is cheap; clones share the connection pool, the session and the
/// loading counter.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: RwLock<String>,
    session: Session,
    /// Requests in flight.
    loading: watch::Sender<usize>,
}

impl ApiClient {
    /// Create a client for `config.api_url` using `session` for credentials.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig, session: Session) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: RwLock::new(config.api_url.clone()),
                session,
                loading: watch::channel(0).0,
            }),
        })
    }

    /// The session this client authenticates with.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Current backend base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.inner
            .base_url
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Point the client at another backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `url` is not an absolute http(s) URL.
    pub fn set_base_url(&self, url: &str) -> Result<(), ConfigError> {
        let url = normalize_base_url("base_url", url)?;
        *self
            .inner
            .base_url
            .write()
            .unwrap_or_else(PoisonError::into_inner) = url;
        Ok(())
    }

    /// Whether any request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow() > 0
    }

    /// Watch the number of requests in flight.
    #[must_use]
    pub fn subscribe_loading(&self) -> watch::Receiver<usize> {
        self.inner.loading.subscribe()
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url();
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// JSON request with the auth header when a token is held.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .inner
            .client
            .request(method, self.url(path))
            .header(CONTENT_TYPE, "application/json");
        self.authorize(builder).await
    }

    async fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.inner.session.token().await {
            Some(token) => builder.header(AUTHORIZATION, format!("Token {}", token.expose_secret())),
            None => builder,
        }
    }

    /// Execute a GET request.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path).await;
        self.execute(builder, path).await
    }

    /// Execute a POST request.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, path).await.json(body);
        self.execute(builder, path).await
    }

    /// Execute a PUT request.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::PUT, path).await.json(body);
        self.execute(builder, path).await
    }

    /// Execute a PATCH request.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::PATCH, path).await.json(body);
        self.execute(builder, path).await
    }

    /// Execute a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, path).await;
        let response = self.send(builder, path).await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        Err(self.parse_error(response, path).await)
    }

    /// Download a file.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let builder = self.authorize(self.inner.client.get(self.url(path))).await;
        let response = self.send(builder, path).await?;
        if response.status().is_success() {
            return Ok(response.bytes().await?.to_vec());
        }
        Err(self.parse_error(response, path).await)
    }

    /// Upload a file as multipart form data, with extra text fields.
    ///
    /// The request carries the token but no JSON content type; the multipart
    /// boundary header is set by the form.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file_name: &str,
        bytes: Vec<u8>,
        fields: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_owned());
        let form = fields.iter().fold(
            reqwest::multipart::Form::new().part("file", part),
            |form, (name, value)| form.text((*name).to_owned(), value.clone()),
        );
        let builder = self
            .authorize(self.inner.client.post(self.url(path)))
            .await
            .multipart(form);
        self.execute(builder, path).await
    }

    /// GET a list, following `{results, next}` continuations.
    ///
    /// Absolute `next` URLs are reduced to path and query so every page goes
    /// through the configured base URL. If a later page fails, the rows
    /// collected so far are returned and the failure is logged; a 401 is
    /// still returned as an error.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure or a non-success status.
    pub async fn fetch_all(&self, path: &str) -> Result<Vec<Value>, ApiError> {
        let first = Envelope::normalize(self.get::<Value>(path).await?);
        let mut next = first.next().map(|n| resolve_next(path, n));
        let mut items = first.into_items()?;
        let mut seen = HashSet::from([path.to_owned()]);

        while let Some(page) = next.take() {
            if !seen.insert(page.clone()) {
                tracing::warn!(path = %page, "Pagination loop detected, stopping");
                break;
            }
            match self.get::<Value>(&page).await {
                Ok(body) => {
                    let envelope = Envelope::normalize(body);
                    next = envelope.next().map(|n| resolve_next(&page, n));
                    items.extend(envelope.into_items()?);
                }
                Err(ApiError::Unauthorized) => return Err(ApiError::Unauthorized),
                Err(e) => {
                    tracing::warn!(
                        path = %page,
                        collected = items.len(),
                        error = %e,
                        "Failed to load next page, keeping partial results"
                    );
                    break;
                }
            }
        }

        Ok(items)
    }

    async fn send(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let _loading = LoadingGuard::new(&self.inner.loading);
        let response = builder.send().await.inspect_err(|e| {
            tracing::warn!(path = %path, error = %e, "Request failed");
        })?;
        tracing::debug!(path = %path, status = response.status().as_u16(), "Response received");
        Ok(response)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = self.send(builder, path).await?;
        self.handle_response(response, path).await
    }

    /// Handle API response and parse JSON.
    ///
    /// An empty success body decodes as `null`.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        if !response.status().is_success() {
            return Err(self.parse_error(response, path).await);
        }

        let bytes = response.bytes().await?;
        let decoded = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };
        decoded.map_err(|e| ApiError::Decode(format!("Failed to parse response: {e}")))
    }

    /// Turn an error response into an [`ApiError`].
    async fn parse_error(&self, response: reqwest::Response, path: &str) -> ApiError {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path = %path, "Session rejected by backend, signing out");
            self.inner.session.clear().await;
            return ApiError::Unauthorized;
        }

        if status == StatusCode::NOT_FOUND {
            return ApiError::NotFound(path.to_owned());
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).ok();
        let extracted = body
            .as_ref()
            .and_then(|body| extract_error_message(body, None));

        if status == StatusCode::FORBIDDEN {
            return ApiError::Forbidden(extracted.unwrap_or_else(|| path.to_owned()));
        }

        if let Some(body) = body.as_ref().filter(|_| {
            status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY
        }) {
            return ApiError::Validation {
                status: status.as_u16(),
                message: extracted.unwrap_or_else(|| GENERIC_MESSAGE.to_owned()),
                fields: field_errors(body),
            };
        }

        ApiError::Api {
            status: status.as_u16(),
            message: extracted.unwrap_or_else(|| text.trim().to_owned()),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url())
            .field("in_flight", &*self.inner.loading.borrow())
            .finish_non_exhaustive()
    }
}

/// Counts a request as in flight until dropped.
struct LoadingGuard<'a> {
    counter: &'a watch::Sender<usize>,
}

impl<'a> LoadingGuard<'a> {
    fn new(counter: &'a watch::Sender<usize>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self { counter }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.counter.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Request path for a continuation link found while fetching `current`.
///
/// A query-only link (`?page=3`) replaces the query of `current`.
fn resolve_next(current: &str, next: &str) -> String {
    let next = continuation_path(next);
    if next.starts_with('?') {
        let base = current.split('?').next().unwrap_or(current);
        format!("{base}{next}")
    } else {
        next
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        let config = ClientConfig::for_base_url("http://127.0.0.1:9").unwrap();
        ApiClient::new(&config, Session::in_memory()).unwrap()
    }

    #[test]
    fn test_resolve_next() {
        assert_eq!(
            resolve_next("/api/invoices/", "http://host/api/invoices/?page=2"),
            "/api/invoices/?page=2"
        );
        assert_eq!(
            resolve_next("/api/invoices/?page=2", "?page=3"),
            "/api/invoices/?page=3"
        );
        assert_eq!(
            resolve_next("/api/invoices/", "/api/invoices/?page=2"),
            "/api/invoices/?page=2"
        );
    }

    #[tokio::test]
    async fn test_url_joining_and_base_url() {
        let client = client();
        assert_eq!(client.url("/api/suppliers/"), "http://127.0.0.1:9/api/suppliers/");
        assert_eq!(client.url("api/suppliers/"), "http://127.0.0.1:9/api/suppliers/");

        client.set_base_url("https://api.officine.dz/").unwrap();
        assert_eq!(client.base_url(), "https://api.officine.dz");
        assert!(client.set_base_url("not a url").is_err());
        assert_eq!(client.base_url(), "https://api.officine.dz");
    }

    #[tokio::test]
    async fn test_loading_guard_counts() {
        let client = client();
        assert!(!client.is_loading());
        {
            let _first = LoadingGuard::new(&client.inner.loading);
            let _second = LoadingGuard::new(&client.inner.loading);
            assert_eq!(*client.subscribe_loading().borrow(), 2);
            assert!(client.is_loading());
        }
        assert!(!client.is_loading());
    }

    #[tokio::test]
    async fn test_transport_error_resets_loading() {
        let client = client();
        let result = client.get::<Value>("/api/health/").await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
        assert!(!client.is_loading());
    }
}

//! Client for the quotation CRUD service.
//!
//! Authentication state lives behind [`TokenStore`], so the same client works
//! with an in-memory token, a token file, or whatever the embedding
//! application keeps credentials in.

use crate::invoice::{Client, Invoice};
use crate::{Error, Result};
use log::{debug, warn};
use reqwest::blocking::Client as HttpClient;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use url::Url;

/// Where the bearer token is kept between requests
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str);
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set(&self, token: &str) {
        if let Ok(mut t) = self.token.write() {
            *t = Some(token.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut t) = self.token.write() {
            *t = None;
        }
    }
}

/// Keeps the token in a file so it survives between CLI runs
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        let token = std::fs::read_to_string(&self.path).ok()?;
        let token = token.trim();
        (!token.is_empty()).then(|| token.to_string())
    }

    fn set(&self, token: &str) {
        if let Err(e) = std::fs::write(&self.path, token) {
            warn!("could not store token in {}: {}", self.path.display(), e);
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("could not remove token file {}: {}", self.path.display(), e),
        }
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

pub struct ApiClient {
    base: Url,
    http: HttpClient,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| Error::ApiError(format!("invalid base URL {}: {}", base_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(Error::ApiError(format!("{} cannot be used as a base URL", base_url)));
        }
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::ApiError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { base, http, tokens })
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn get_invoice(&self, id: &str) -> Result<Invoice> {
        self.get(self.endpoint(&["invoices", id]))
    }

    pub fn get_invoice_by_number(&self, invoice_number: &str) -> Result<Invoice> {
        self.get(self.endpoint(&["invoices", "number", invoice_number]))
    }

    /// Matches invoice number, client name and client address
    pub fn search_invoices(&self, query: &str) -> Result<Vec<Invoice>> {
        let mut url = self.endpoint(&["invoices", "search", "query"]);
        url.query_pairs_mut().append_pair("q", query);
        self.get(url)
    }

    pub fn list_clients(&self) -> Result<Vec<Client>> {
        self.get(self.endpoint(&["clients"]))
    }

    /// Base URL with `segments` appended, each percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        let mut request = self.http.get(url.clone());
        if let Some(token) = self.tokens.get() {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|e| Error::ApiError(format!("GET {} failed: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.clear();
            return Err(Error::ApiError("unauthorized".into()));
        }
        if !status.is_success() {
            let body: ErrorBody = response.json().unwrap_or_default();
            let message = body
                .message
                .or(body.error)
                .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));
            return Err(Error::ApiError(message));
        }

        let envelope: Envelope<T> = response
            .json()
            .map_err(|e| Error::ApiError(format!("unexpected response from {}: {}", url, e)))?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[test]
    fn memory_store_set_and_clear() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(), None);
        store.set("abc");
        assert_eq!(store.get().as_deref(), Some("abc"));
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn file_store_persists_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::new(dir.path().join("token"));
        assert_eq!(store.get(), None);
        store.set("xyz\n");
        assert_eq!(FileTokenStore::new(dir.path().join("token")).get().as_deref(), Some("xyz"));
        store.clear();
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn endpoints_encode_segments() {
        let api = client("http://localhost:5000/api");
        assert_eq!(api.endpoint(&["invoices", "abc"]).as_str(), "http://localhost:5000/api/invoices/abc");
        assert_eq!(
            api.endpoint(&["invoices", "number", "QT/2024 1"]).as_str(),
            "http://localhost:5000/api/invoices/number/QT%2F2024%201"
        );

        let slash = client("http://localhost:5000/api/");
        assert_eq!(slash.endpoint(&["clients"]).as_str(), "http://localhost:5000/api/clients");
    }

    #[test]
    fn rejects_unusable_base_urls() {
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        assert!(matches!(ApiClient::new("not a url", tokens.clone()), Err(Error::ApiError(_))));
        assert!(matches!(ApiClient::new("mailto:a@b.c", tokens), Err(Error::ApiError(_))));
    }
}

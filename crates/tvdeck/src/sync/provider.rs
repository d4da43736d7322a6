use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PresentationError;

/// Where deck documents come from. Returns the raw JSON text; timeout and
/// cancellation are handled by the caller.
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch(&self) -> Result<String, PresentationError>;

    /// Human-readable origin, for logs and the error banner.
    fn describe(&self) -> String;

    /// Local file behind this provider, if any, so it can be watched.
    fn local_path(&self) -> Option<&Path> {
        None
    }
}

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Pick a provider for a configured source: URLs go over HTTP, anything
/// else is read from disk.
pub fn provider_for(source: &str, timeout: Duration) -> Arc<dyn DataProvider> {
    if is_url(source) {
        Arc::new(HttpProvider::new(source, timeout))
    } else {
        Arc::new(FileProvider::new(source))
    }
}

pub struct HttpProvider {
    url: String,
    agent: ureq::Agent,
}

impl HttpProvider {
    pub fn new(url: &str, timeout: Duration) -> Self {
        // The blocking call gets the same budget as the guard around it so
        // the worker thread is released once the attempt is abandoned.
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            url: url.to_string(),
            agent,
        }
    }
}

#[async_trait]
impl DataProvider for HttpProvider {
    async fn fetch(&self) -> Result<String, PresentationError> {
        let agent = self.agent.clone();
        let url = self.url.clone();
        tokio::task::spawn_blocking(move || {
            let mut response = agent
                .get(&url)
                .header("Accept", "application/json")
                .call()
                .map_err(http_error)?;
            response.body_mut().read_to_string().map_err(http_error)
        })
        .await
        .map_err(|e| PresentationError::FetchNetwork(e.to_string()))?
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

fn http_error(err: ureq::Error) -> PresentationError {
    match err {
        ureq::Error::StatusCode(status) => {
            let message = ureq::http::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("unexpected status")
                .to_string();
            PresentationError::FetchServer { status, message }
        }
        other => PresentationError::FetchNetwork(other.to_string()),
    }
}

pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataProvider for FileProvider {
    async fn fetch(&self) -> Result<String, PresentationError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            std::fs::read_to_string(&path)
                .map_err(|e| PresentationError::FetchNetwork(format!("{}: {e}", path.display())))
        })
        .await
        .map_err(|e| PresentationError::FetchNetwork(e.to_string()))?
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn local_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

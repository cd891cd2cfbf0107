use std::path::Path;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::FetchError;

/// Raw document bytes plus the charset the transport declared for them.
#[derive(Debug)]
pub struct Page {
    pub body: Vec<u8>,
    pub charset: Option<String>,
}

/// Single-request HTTP fetcher. No retries; redirects follow reqwest defaults.
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Fetcher {
    pub fn new(settings: &Settings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.fetch_timeout())
            .user_agent(&settings.user_agent)
            .build()
            .map_err(|e| FetchError::Request {
                url: String::new(),
                message: format!("could not build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            timeout: settings.fetch_timeout(),
        })
    }

    /// GET `url` and return the raw body. Non-2xx and empty bodies are errors.
    pub async fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        info!("Fetching page: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_param);
        if let Some(charset) = &charset {
            debug!("{} declares charset {}", url, charset);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url, e))?;
        if body.is_empty() {
            return Err(FetchError::Empty(url.to_string()));
        }

        info!("Fetched {} bytes from {}", body.len(), url);
        Ok(Page {
            body: body.to_vec(),
            charset,
        })
    }

    fn request_error(&self, url: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// `charset` parameter of a Content-Type value, e.g. `text/html; charset="utf-8"`.
fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_string())
    })
}

/// Local stand-in for the network boundary: same contract, bytes from disk.
pub fn read_file(path: &Path) -> Result<Page, FetchError> {
    let shown = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|source| FetchError::Read {
        path: shown.clone(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(FetchError::Empty(shown));
    }
    info!("Read {} bytes from {}", bytes.len(), shown);
    Ok(Page {
        body: bytes,
        charset: None,
    })
}

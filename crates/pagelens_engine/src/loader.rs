//! Page loading: turns a URL or a file path into a [`PageLoad`].
use std::path::Path;
use std::time::Duration;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use futures_util::TryStreamExt;
use lens_logging::{lens_debug, lens_info};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::redirect::Policy;
use url::Url;

use crate::browser::PageLoad;

const HTML_MIME_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];
const DEFAULT_MAX_PAGE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub connect_timeout: Duration,
    /// Whole-request budget, body included.
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Accepted MIME types. A response without a Content-Type is accepted.
    pub allowed_content_types: Vec<String>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: DEFAULT_MAX_PAGE_BYTES,
            allowed_content_types: HTML_MIME_TYPES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FailureKind {
    #[error("invalid page source")]
    InvalidSource,
    #[error("server answered {0}")]
    HttpStatus(u16),
    #[error("timed out")]
    Timeout,
    #[error("too many redirects")]
    RedirectLimitExceeded,
    #[error("page exceeds {max_bytes} bytes")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("not an HTML page ({content_type})")]
    UnsupportedContentType { content_type: String },
    #[error("page is not valid {encoding}")]
    Decode { encoding: String },
    #[error("file error")]
    Io,
    #[error("network error")]
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct LoadError {
    pub kind: FailureKind,
    pub message: String,
}

impl LoadError {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_redirect() {
            FailureKind::RedirectLimitExceeded
        } else {
            FailureKind::Network
        };
        LoadError::new(kind, err.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PageLoader {
    settings: LoaderSettings,
}

impl PageLoader {
    pub fn new(settings: LoaderSettings) -> Self {
        Self { settings }
    }

    /// `http(s)` sources are fetched, `file:` URLs and bare paths are read
    /// from disk, and any other scheme yields an empty restricted page.
    pub async fn load(&self, source: &str) -> Result<PageLoad, LoadError> {
        let url = match Url::parse(source) {
            // Single letters are drive prefixes, not schemes.
            Ok(url) if url.scheme().len() > 1 => url,
            _ => return self.read_file(Path::new(source)).await,
        };
        match url.scheme() {
            "http" | "https" => self.fetch(url).await,
            "file" => match url.to_file_path() {
                Ok(path) => self.read_file(&path).await,
                Err(()) => Err(LoadError::new(FailureKind::InvalidSource, url)),
            },
            _ => {
                lens_info!("{} cannot be loaded; opening it as a restricted page", url);
                Ok(PageLoad::new(url, ""))
            }
        }
    }

    async fn read_file(&self, path: &Path) -> Result<PageLoad, LoadError> {
        let io_error = |err: std::io::Error| {
            LoadError::new(FailureKind::Io, format!("{}: {err}", path.display()))
        };
        let absolute = tokio::fs::canonicalize(path).await.map_err(io_error)?;
        let size = tokio::fs::metadata(&absolute).await.map_err(io_error)?.len();
        self.within_limit(size)?;
        let bytes = tokio::fs::read(&absolute).await.map_err(io_error)?;

        let url = Url::from_file_path(&absolute).map_err(|()| {
            LoadError::new(FailureKind::InvalidSource, absolute.display().to_string())
        })?;
        lens_debug!("read {} ({} bytes)", url, bytes.len());
        Ok(PageLoad::new(url, decode(&bytes, None)?))
    }

    async fn fetch(&self, url: Url) -> Result<PageLoad, LoadError> {
        let response = self.client()?.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let charset = self.check_headers(response.headers())?;
        if let Some(declared) = response.content_length() {
            self.within_limit(declared)?;
        }

        let final_url = response.url().clone();
        let mut body = response.bytes_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = body.try_next().await? {
            self.within_limit((bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }

        lens_info!("fetched {} ({} bytes)", final_url, bytes.len());
        Ok(PageLoad::new(final_url, decode(&bytes, charset.as_deref())?))
    }

    fn client(&self) -> Result<reqwest::Client, LoadError> {
        let limit = self.settings.redirect_limit;
        let redirects = Policy::custom(move |attempt| {
            // `previous` includes the first request.
            if attempt.previous().len() > limit {
                attempt.error(format!("more than {limit} redirects"))
            } else {
                attempt.follow()
            }
        });
        Ok(reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(redirects)
            .build()?)
    }

    /// Rejects non-HTML responses and returns the declared charset, if any.
    fn check_headers(&self, headers: &HeaderMap) -> Result<Option<String>, LoadError> {
        let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return Ok(None);
        };
        let mut params = content_type.split(';');
        let mime = params.next().unwrap_or_default().trim();
        let allowed = self
            .settings
            .allowed_content_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime));
        if !allowed {
            return Err(LoadError::new(
                FailureKind::UnsupportedContentType {
                    content_type: content_type.to_string(),
                },
                "only HTML pages can be analyzed",
            ));
        }
        Ok(params.find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches(['"', '\'']).to_string())
        }))
    }

    fn within_limit(&self, size: u64) -> Result<(), LoadError> {
        let max_bytes = self.settings.max_bytes;
        if size <= max_bytes {
            return Ok(());
        }
        Err(LoadError::new(
            FailureKind::TooLarge {
                max_bytes,
                actual: Some(size),
            },
            format!("{size} bytes"),
        ))
    }
}

/// BOM first, then the declared charset, then a guess from the bytes.
fn decode(bytes: &[u8], charset: Option<&str>) -> Result<String, LoadError> {
    let encoding = match Encoding::for_bom(bytes) {
        Some((encoding, _)) => encoding,
        None => charset
            .and_then(|label| Encoding::for_label(label.as_bytes()))
            .unwrap_or_else(|| guess_encoding(bytes)),
    };
    let (text, _, malformed) = encoding.decode(bytes);
    if malformed {
        return Err(LoadError::new(
            FailureKind::Decode {
                encoding: encoding.name().to_string(),
            },
            "malformed byte sequence",
        ));
    }
    Ok(text.into_owned())
}

fn guess_encoding(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

#[cfg(test)]
mod tests {
    use super::decode;

    #[test]
    fn declared_charset_drives_decoding() {
        assert_eq!(decode(b"caf\xe9", Some("ISO-8859-1")).unwrap(), "caf\u{e9}");
    }

    #[test]
    fn bom_wins_over_declared_charset() {
        assert_eq!(decode(b"\xEF\xBB\xBFhello", Some("ISO-8859-1")).unwrap(), "hello");
    }

    #[test]
    fn undeclared_latin1_is_detected() {
        let text = decode(b"<p>Ol\xe1, como est\xe1?</p>", None).unwrap();
        assert!(text.contains("Ol\u{e1}"), "{text}");
    }
}

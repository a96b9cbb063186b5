// src/services/fetcher.rs
use encoding_rs::{Encoding, WINDOWS_1252};
use log::{info, warn};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT,
};
use reqwest::{Client, StatusCode};

use crate::error::{Result, ScreenerError};
use crate::services::metrics::{Metric, Metrics};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Headers forced onto every request whose host contains `host_fragment`.
#[derive(Debug, Clone)]
pub struct HeaderOverride {
    pub host_fragment: &'static str,
    pub headers: Vec<(HeaderName, &'static str)>,
}

/// Yahoo redirects header-less clients to a consent page instead of the quote.
pub fn default_overrides() -> Vec<HeaderOverride> {
    vec![HeaderOverride {
        host_fragment: "yahoo.com",
        headers: vec![
            (USER_AGENT, BROWSER_USER_AGENT),
            (ACCEPT_LANGUAGE, "en-US,en;q=0.9"),
        ],
    }]
}

pub struct Fetcher {
    client: Client,
    overrides: Vec<HeaderOverride>,
}

impl Fetcher {
    pub fn new() -> Result<Self> {
        Self::with_overrides(default_overrides())
    }

    pub fn with_overrides(overrides: Vec<HeaderOverride>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, overrides })
    }

    fn headers_for(&self, url: &str, extra_headers: &HeaderMap) -> HeaderMap {
        let host = reqwest::Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
            .unwrap_or_default();

        let mut headers = extra_headers.clone();
        for rule in self.overrides.iter().filter(|r| host.contains(r.host_fragment)) {
            for (name, value) in &rule.headers {
                headers.insert(name.clone(), HeaderValue::from_static(*value));
            }
        }
        headers
    }

    /// GET `url` and return its body as text. Does not touch the cache.
    pub async fn fetch(
        &self,
        url: &str,
        extra_headers: &HeaderMap,
        metrics: &mut Metrics,
    ) -> Result<String> {
        info!("Fetching {}", url);

        let response = match self
            .client
            .get(url)
            .headers(self.headers_for(url, extra_headers))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                metrics.incr(Metric::FailedRequests);
                return Err(e.into());
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            metrics.incr(Metric::FailedRequests);
            warn!("Request to {} returned {}", url, status);
            return Err(ScreenerError::FailedRequest {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let charset = charset_of(response.headers());
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                metrics.incr(Metric::FailedRequests);
                return Err(e.into());
            }
        };

        let text = decode_body(&bytes, charset.as_deref());
        if text.is_empty() {
            metrics.incr(Metric::EmptyResponses);
            return Err(ScreenerError::EmptyResponse { url: url.to_string() });
        }

        metrics.incr(Metric::SuccessfulRequests);
        Ok(text)
    }
}

/// The `charset` parameter of a `Content-Type` header, if any.
fn charset_of(headers: &HeaderMap) -> Option<String> {
    let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// UTF-8 with an optional byte order mark. Anything else is decoded with the
/// declared charset, or Windows-1252 when none is declared or it is unknown.
pub fn decode_body(bytes: &[u8], charset: Option<&str>) -> String {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let encoding = charset
                .and_then(|label| Encoding::for_label(label.as_bytes()))
                .unwrap_or(WINDOWS_1252);
            warn!("Response body is not valid UTF-8, decoding as {}", encoding.name());
            let (text, _, _) = encoding.decode(body);
            text.into_owned()
        }
    }
}

use std::time::Duration;

use anyhow::Result;
use log::debug;
use rand::seq::SliceRandom;
use reqwest::{
    header::{
        HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, DNT, REFERER,
        UPGRADE_INSECURE_REQUESTS, USER_AGENT,
    },
    Client, StatusCode,
};

use crate::{
    config::FetchConfig,
    error::{FetchError, Rejection},
};

/// Bodies shorter than this are error pages, not listings.
pub const MIN_BODY_LEN: usize = 100;

/// Interstitial markers of an anti-bot challenge page.
pub const CHALLENGE_MARKERS: &[&str] = &["just a moment", "checking your browser"];

/// Any of these in a body means the page is a block notice.
pub const BLOCKING_INDICATORS: &[&str] = &["access denied", "blocked", "cloudflare", "captcha", "forbidden"];

pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
];

const BROWSER_PROFILE_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Extra time granted to the browser-profile retry.
const CHALLENGE_RETRY_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Content(String),
    Empty(Rejection),
}

fn has_challenge(lowered: &str) -> bool {
    CHALLENGE_MARKERS.iter().any(|x| lowered.contains(x))
}

/// Decides whether a response carries usable content.
pub fn inspect(status: u16, body: &str) -> Result<(), Rejection> {
    let lowered = body.to_lowercase();
    if status == 403 {
        if has_challenge(&lowered) {
            return Err(Rejection::Challenge);
        }
        return Err(Rejection::Status(status));
    }
    if status != 200 {
        return Err(Rejection::Status(status));
    }
    if has_challenge(&lowered) {
        return Err(Rejection::Challenge);
    }
    if body.len() < MIN_BODY_LEN {
        return Err(Rejection::TooShort(body.len()));
    }
    let found: Vec<&'static str> = BLOCKING_INDICATORS
        .iter()
        .copied()
        .filter(|x| lowered.contains(x))
        .collect();
    if !found.is_empty() {
        return Err(Rejection::Blocked(found));
    }
    Ok(())
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`. Blocked, challenged and unusable responses come back as
    /// [`FetchOutcome::Empty`]; only transport failures are errors.
    async fn fetch(&self, url: &str, timeout: Duration, anti_bot: bool) -> Result<FetchOutcome, FetchError>;
}

struct RawResponse {
    status: StatusCode,
    final_url: String,
    content_type: Option<String>,
    cf_ray: Option<String>,
    body: String,
}

fn pick_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_PROFILE_AGENT)
}

fn plain_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(pick_agent()));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

fn guarded_headers() -> HeaderMap {
    let mut headers = plain_headers();
    headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("document"));
    headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("navigate"));
    headers.insert(HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static("cross-site"));
    headers.insert(HeaderName::from_static("sec-fetch-user"), HeaderValue::from_static("?1"));
    headers
}

fn browser_headers() -> HeaderMap {
    let mut headers = guarded_headers();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_PROFILE_AGENT));
    headers.insert(
        HeaderName::from_static("sec-ch-ua"),
        HeaderValue::from_static("\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\""),
    );
    headers.insert(HeaderName::from_static("sec-ch-ua-mobile"), HeaderValue::from_static("?0"));
    headers.insert(HeaderName::from_static("sec-ch-ua-platform"), HeaderValue::from_static("\"Windows\""));
    headers
}

/// HTTP fetcher with a plain transport and a cookie-keeping browser-like
/// transport for sites behind anti-bot challenges.
pub struct ReqwestFetcher {
    plain: Client,
    guarded: Client,
    config: FetchConfig,
}

impl ReqwestFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        Ok(Self {
            plain: Client::builder().build()?,
            guarded: Client::builder().cookie_store(true).build()?,
            config,
        })
    }

    async fn send(
        &self,
        client: &Client,
        url: &str,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<RawResponse, FetchError> {
        debug!("requesting {}", url);
        let response = client
            .get(url)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = response.status();
        let final_url = response.url().to_string();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|x: &HeaderValue| x.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(CONTENT_TYPE.as_str());
        let cf_ray = header("cf-ray");
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(RawResponse {
            status,
            final_url,
            content_type,
            cf_ray,
            body,
        })
    }

    async fn guarded_get(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError> {
        let first = self.send(&self.guarded, url, guarded_headers(), timeout).await?;
        if first.status != StatusCode::FORBIDDEN || !has_challenge(&first.body.to_lowercase()) {
            return Ok(first);
        }
        debug!("challenge page from {}, retrying with browser profile", url);
        tokio::time::sleep(Duration::from_millis(self.config.challenge_delay_ms)).await;
        self.send(&self.guarded, url, browser_headers(), timeout + CHALLENGE_RETRY_GRACE)
            .await
    }

    fn dump(&self, url: &str, response: &RawResponse) {
        if !self.config.debug {
            return;
        }
        debug!(
            "{} -> status {}, {} bytes, final url {}, content-type {}",
            url,
            response.status.as_u16(),
            response.body.len(),
            response.final_url,
            response.content_type.as_deref().unwrap_or("N/A"),
        );
        if let Some(ray) = &response.cf_ray {
            debug!("{} served through cloudflare (cf-ray {})", url, ray);
        }
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, timeout: Duration, anti_bot: bool) -> Result<FetchOutcome, FetchError> {
        let guarded = if anti_bot && self.config.anti_bot {
            match self.guarded_get(url, timeout).await {
                Ok(response) => Some(response),
                Err(e) => {
                    debug!("anti-bot transport failed, falling back to plain request: {}", e);
                    None
                }
            }
        } else {
            None
        };
        let response = match guarded {
            Some(response) => response,
            None => self.send(&self.plain, url, plain_headers(), timeout).await?,
        };
        self.dump(url, &response);

        match inspect(response.status.as_u16(), &response.body) {
            Ok(()) => Ok(FetchOutcome::Content(response.body)),
            Err(rejection) => {
                debug!("rejected {}: {}", url, rejection);
                if self.config.debug && matches!(rejection, Rejection::Challenge | Rejection::Status(403)) {
                    let preview: String = response.body.chars().take(500).collect();
                    debug!("response preview: {}", preview);
                }
                Ok(FetchOutcome::Empty(rejection))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> String {
        format!("<html><head><title>listing</title></head><body>{}{}</body></html>", text, "<p>row</p>".repeat(20))
    }

    #[test]
    fn test_accepts_normal_page() {
        assert_eq!(inspect(200, &page("results")), Ok(()));
    }

    #[test]
    fn test_challenge_403() {
        assert_eq!(inspect(403, "<title>Just a moment...</title>"), Err(Rejection::Challenge));
        assert_eq!(inspect(403, &page("nope")), Err(Rejection::Status(403)));
    }

    #[test]
    fn test_challenge_200() {
        assert_eq!(inspect(200, &page("Checking your browser before accessing")), Err(Rejection::Challenge));
    }

    #[test]
    fn test_non_200() {
        assert_eq!(inspect(404, &page("missing")), Err(Rejection::Status(404)));
        assert_eq!(inspect(204, ""), Err(Rejection::Status(204)));
        assert_eq!(inspect(503, &page("down")), Err(Rejection::Status(503)));
    }

    #[test]
    fn test_too_short() {
        let body = "x".repeat(50);
        assert_eq!(inspect(200, &body), Err(Rejection::TooShort(50)));
        assert_eq!(inspect(200, &"x".repeat(MIN_BODY_LEN)), Ok(()));
    }

    #[test]
    fn test_blocking_indicators() {
        assert_eq!(
            inspect(200, &page("Access Denied by CloudFlare")),
            Err(Rejection::Blocked(vec!["access denied", "cloudflare"]))
        );
        assert_eq!(inspect(200, &page("solve the CAPTCHA")), Err(Rejection::Blocked(vec!["captcha"])));
    }
}

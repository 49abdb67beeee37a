// client.rs — The one blocking HTTP client shared by the classifier's
// evidence fetch and the acquire worker's HTTP strategy (spec §6.3:
// "evidence-fetch transport is a shared blocking reqwest::Client").
//
// Redirects are followed manually, never by reqwest's own redirect
// policy, so every hop gets an SSRF check (spec §4.2.2/§4.2.3) before the
// client follows it.

use std::time::Duration;

use rand::Rng;
use reqwest::blocking::{Client, Response};
use reqwest::Url;

use crate::error::NetError;
use crate::ssrf::{check_url, InternalMirrorAllowlist};

pub const DEFAULT_MAX_REDIRECTS: u32 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_USER_AGENT: &str = concat!("dc-collector/", env!("CARGO_PKG_VERSION"));

/// Build the shared blocking client. `redirect::Policy::none()` is load
/// bearing: reqwest must never silently follow a redirect we haven't SSRF
/// checked.
pub fn build_client(timeout: Duration) -> Result<Client, NetError> {
    Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::none())
        .user_agent(DEFAULT_USER_AGENT)
        .build()
        .map_err(NetError::Request)
}

/// Transient statuses that warrant a retry: 5xx, 429, 408 (spec §4.2.3).
pub fn is_transient_status(status: u16) -> bool {
    (500..=599).contains(&status) || status == 429 || status == 408
}

/// Transient transport failures: timeouts, connection errors, and
/// mid-stream disconnects.
pub fn is_transient_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || (err.is_body() && !err.is_decode())
}

/// Exponential backoff with jitter: base 500ms, doubling, capped at 30s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = 500u64.saturating_mul(1u64 << attempt.min(6));
    let capped_ms = base_ms.min(30_000);
    let jitter_ms = rand::thread_rng().gen_range(0..=capped_ms / 4 + 1);
    Duration::from_millis(capped_ms + jitter_ms)
}

/// Send one GET, validating the initial URL and every redirect hop against
/// the SSRF policy, following up to `max_redirects` hops manually. Returns
/// the final non-redirect response.
pub fn get_validated(
    client: &Client,
    url: &str,
    allowlist: &InternalMirrorAllowlist,
    allow_non_global: bool,
    range_from: Option<u64>,
) -> Result<Response, NetError> {
    get_validated_with_headers(client, url, allowlist, allow_non_global, range_from, &[])
}

/// Like [`get_validated`], but attaches `extra_headers` to every request
/// in the redirect chain (spec §6.3 `--evidence-header`). Headers are
/// re-sent on each hop, matching how `range_from` is already handled.
pub fn get_validated_with_headers(
    client: &Client,
    url: &str,
    allowlist: &InternalMirrorAllowlist,
    allow_non_global: bool,
    range_from: Option<u64>,
    extra_headers: &[(String, String)],
) -> Result<Response, NetError> {
    let mut current = Url::parse(url).map_err(|source| NetError::InvalidUrl {
        url: url.to_string(),
        reason: source.to_string(),
    })?;

    for redirects in 0..=DEFAULT_MAX_REDIRECTS {
        check_url(&current, allowlist, allow_non_global)?;

        let mut request = client.get(current.clone());
        if let Some(from) = range_from {
            request = request.header(reqwest::header::RANGE, format!("bytes={from}-"));
        }
        for (name, value) in extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send()?;

        if response.status().is_redirection() {
            if redirects == DEFAULT_MAX_REDIRECTS {
                return Err(NetError::TooManyRedirects(DEFAULT_MAX_REDIRECTS, current.to_string()));
            }
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| NetError::UnresolvableRedirect(current.to_string()))?;
            current = current
                .join(location)
                .map_err(|_| NetError::UnresolvableRedirect(location.to_string()))?;
            continue;
        }

        return Ok(response);
    }
    unreachable!("loop either returns or errors on the final iteration")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_stays_capped() {
        let first = backoff_delay(0);
        let later = backoff_delay(10);
        assert!(first.as_millis() >= 500);
        assert!(later.as_millis() <= 30_000 + 30_000 / 4 + 1);
    }

    #[test]
    fn transient_status_matches_5xx_429_408() {
        assert!(is_transient_status(503));
        assert!(is_transient_status(429));
        assert!(is_transient_status(408));
        assert!(!is_transient_status(404));
        assert!(!is_transient_status(200));
    }

    #[tokio::test]
    async fn get_validated_follows_a_redirect_against_a_live_server() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/final"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/final"))
            .respond_with(ResponseTemplate::new(200).set_body_string("payload"))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let allowlist = InternalMirrorAllowlist::parse(&["127.0.0.1".to_string()]);
        let url = format!("{}/start", server.uri());

        let response = get_validated(&client, &url, &allowlist, false, None).unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(response.text().unwrap(), "payload");
    }

    #[tokio::test]
    async fn get_validated_blocks_a_redirect_to_a_non_global_host() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "http://169.254.169.254/meta"))
            .mount(&server)
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let allowlist = InternalMirrorAllowlist::parse(&["127.0.0.1".to_string()]);
        let url = format!("{}/start", server.uri());

        let err = get_validated(&client, &url, &allowlist, false, None).unwrap_err();
        assert!(matches!(err, NetError::BlockedIp { .. }));
    }
}

//! Bounded pool turning indexer download links into magnet links.

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::{header, redirect, Client, Response};
use tracing::{debug, warn};

use super::torrent_parser::magnet_from_torrent;
use super::{RawHit, SearchError};
use crate::metrics;
use crate::release::Release;

static MAGNET_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)magnet:\?xt=urn:btih:[^"'\s<>]+"#).unwrap());

/// Resolution pool settings.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Resolutions in flight at once.
    pub concurrency: usize,
    /// Extra attempts after a timeout.
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            concurrency: 10,
            retries: 1,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// Undo HTML entity escaping found in indexer download URLs.
pub fn unescape_html(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// First magnet link embedded in a page body.
pub fn find_magnet(body: &str) -> Option<String> {
    MAGNET_LINK
        .find(body)
        .map(|m| unescape_html(m.as_str()))
}

fn looks_like_torrent(content_type: &str, body: &[u8]) -> bool {
    content_type.contains("application/x-bittorrent")
        || content_type.contains("application/octet-stream")
        || body.first() == Some(&b'd')
}

/// Resolves download URLs into magnets with bounded concurrency.
pub struct MagnetResolver {
    no_redirect: Client,
    follow: Client,
    settings: ResolverSettings,
}

impl MagnetResolver {
    pub fn new(settings: ResolverSettings) -> Result<Self, SearchError> {
        let no_redirect = Client::builder()
            .timeout(settings.timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        let follow = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SearchError::Internal(e.to_string()))?;
        Ok(Self {
            no_redirect,
            follow,
            settings,
        })
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Resolve every hit, keeping input order. Hits that fail to resolve
    /// are dropped.
    pub async fn resolve_all(&self, hits: Vec<RawHit>) -> Vec<Release> {
        let concurrency = self.settings.concurrency.max(1);
        let resolved: Vec<Option<Release>> = stream::iter(hits)
            .map(|hit| self.resolve_hit(hit))
            .buffered(concurrency)
            .collect()
            .await;
        resolved.into_iter().flatten().collect()
    }

    async fn resolve_hit(&self, hit: RawHit) -> Option<Release> {
        if let Some(magnet) = hit.magnet_url.clone() {
            return Some(hit.into_release(magnet));
        }
        let Some(url) = hit.download_url.as_deref().map(unescape_html) else {
            debug!(title = %hit.title, "Hit has neither magnet nor download link");
            return None;
        };

        match self.resolve_url(&url).await {
            Ok(Some(magnet)) => {
                metrics::RESOLVER_RESULTS.with_label_values(&["resolved"]).inc();
                Some(hit.into_release(magnet))
            }
            Ok(None) => {
                metrics::RESOLVER_RESULTS.with_label_values(&["no_magnet"]).inc();
                debug!(title = %hit.title, "No magnet found behind download link");
                None
            }
            Err(e) => {
                metrics::RESOLVER_RESULTS.with_label_values(&["error"]).inc();
                warn!(title = %hit.title, error = %e, "Failed to resolve download link");
                None
            }
        }
    }

    /// Resolve one download URL. A redirect to a magnet is taken as is;
    /// other redirects are followed.
    pub async fn resolve_url(&self, url: &str) -> Result<Option<String>, SearchError> {
        let response = self.send_with_retry(|| self.no_redirect.get(url).send()).await?;

        if response.status().is_redirection() {
            let location = response
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if let Some(location) = location {
                if location.starts_with("magnet:") {
                    return Ok(Some(location));
                }
                if let Some(magnet) = find_magnet(&location) {
                    return Ok(Some(magnet));
                }
                let target = response
                    .url()
                    .join(&location)
                    .map_err(|e| SearchError::ApiError(format!("Bad redirect: {}", e)))?;
                let followed = self
                    .send_with_retry(|| self.follow.get(target.clone()).send())
                    .await?;
                return Self::sniff(followed).await;
            }
        }

        Self::sniff(response).await
    }

    /// Magnet from a response body: torrent bytes are converted, anything
    /// else is searched for an embedded magnet link.
    async fn sniff(response: Response) -> Result<Option<String>, SearchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::ApiError(format!("HTTP {}", status)));
        }
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let body = response.bytes().await?;

        if looks_like_torrent(&content_type, &body) {
            match magnet_from_torrent(&body) {
                Ok(magnet) => return Ok(Some(magnet)),
                Err(e) => debug!(error = %e, "Body is not a valid torrent"),
            }
        }
        Ok(find_magnet(&String::from_utf8_lossy(&body)))
    }

    async fn send_with_retry<F, Fut>(&self, send: F) -> Result<Response, SearchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Response, reqwest::Error>>,
    {
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(self.settings.timeout, send()).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => SearchError::from(e),
                Err(_) => SearchError::Timeout,
            };
            if !matches!(result, SearchError::Timeout) || attempt >= self.settings.retries {
                return Err(result);
            }
            attempt += 1;
            debug!(attempt = attempt, "Resolution timed out, retrying");
            tokio::time::sleep(self.settings.retry_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HEAT_MAGNET: &str = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567";

    fn torrent_bytes() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"d8:announce26:udp://tracker.example:13374:infod");
        bytes.extend_from_slice(b"6:lengthi1048576e");
        bytes.extend_from_slice(b"4:name19:Heat 1995 1080p.mkv");
        bytes.extend_from_slice(b"12:piece lengthi262144e");
        bytes.extend_from_slice(b"6:pieces20:aaaaaaaaaaaaaaaaaaaa");
        bytes.extend_from_slice(b"ee");
        bytes
    }

    fn fast_resolver() -> MagnetResolver {
        MagnetResolver::new(ResolverSettings {
            timeout: Duration::from_millis(200),
            concurrency: 2,
            retries: 1,
            retry_delay: Duration::from_millis(10),
        })
        .unwrap()
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(
            unescape_html("http://idx/dl?id=1&amp;file=Heat&amp;x=&quot;y&quot;"),
            "http://idx/dl?id=1&file=Heat&x=\"y\""
        );
    }

    #[test]
    fn test_find_magnet() {
        let body = r#"<a href="magnet:?xt=urn:btih:ABCDEF&amp;dn=Heat">get</a>"#;
        assert_eq!(
            find_magnet(body).as_deref(),
            Some("magnet:?xt=urn:btih:ABCDEF&dn=Heat")
        );
        assert_eq!(find_magnet("<html>nothing</html>"), None);
    }

    #[test]
    fn test_looks_like_torrent() {
        assert!(looks_like_torrent("application/x-bittorrent", b"x"));
        assert!(looks_like_torrent("application/octet-stream", b"x"));
        assert!(looks_like_torrent("", b"d8:announce"));
        assert!(!looks_like_torrent("text/html", b"<html>"));
    }

    #[tokio::test]
    async fn test_hit_with_magnet_needs_no_request() {
        let resolver = MagnetResolver::new(ResolverSettings::default()).unwrap();
        let mut hit = RawHit::new("Heat.1995.1080p", "idx");
        hit.magnet_url = Some("magnet:?xt=urn:btih:abc".to_string());
        let mut missing = RawHit::new("Heat.1995.720p", "idx");
        missing.magnet_url = None;

        let releases = resolver.resolve_all(vec![hit, missing]).await;
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].links, vec!["magnet:?xt=urn:btih:abc"]);
    }

    #[tokio::test]
    async fn test_redirect_to_magnet_is_taken_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/1"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", HEAT_MAGNET))
            .expect(1)
            .mount(&server)
            .await;

        let magnet = fast_resolver()
            .resolve_url(&format!("{}/dl/1", server.uri()))
            .await
            .unwrap();
        assert_eq!(magnet.as_deref(), Some(HEAT_MAGNET));
    }

    #[tokio::test]
    async fn test_redirect_to_torrent_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/2"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/files/heat.torrent"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/heat.torrent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(torrent_bytes(), "application/x-bittorrent"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let magnet = fast_resolver()
            .resolve_url(&format!("{}/dl/2", server.uri()))
            .await
            .unwrap()
            .unwrap();
        assert!(magnet.starts_with("magnet:?xt=urn:btih:"));
        assert!(magnet.contains("&dn=Heat%201995%201080p.mkv"));
    }

    #[tokio::test]
    async fn test_torrent_body_by_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(torrent_bytes(), "application/x-bittorrent"),
            )
            .mount(&server)
            .await;

        let magnet = fast_resolver()
            .resolve_url(&format!("{}/dl/3", server.uri()))
            .await
            .unwrap()
            .unwrap();
        assert!(magnet.starts_with("magnet:?xt=urn:btih:"));
    }

    #[tokio::test]
    async fn test_torrent_body_by_leading_byte() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/4"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(torrent_bytes(), "text/plain"))
            .mount(&server)
            .await;

        let magnet = fast_resolver()
            .resolve_url(&format!("{}/dl/4", server.uri()))
            .await
            .unwrap()
            .unwrap();
        assert!(magnet.starts_with("magnet:?xt=urn:btih:"));
        assert!(magnet.contains("&tr=udp%3A%2F%2Ftracker.example%3A1337"));
    }

    #[tokio::test]
    async fn test_magnet_scraped_from_html_page() {
        let server = MockServer::start().await;
        let page = format!(
            r#"<html><body><a href="{}&amp;dn=Heat.1995">Download</a></body></html>"#,
            HEAT_MAGNET
        );
        Mock::given(method("GET"))
            .and(path("/details/5"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html"))
            .mount(&server)
            .await;

        let magnet = fast_resolver()
            .resolve_url(&format!("{}/details/5", server.uri()))
            .await
            .unwrap();
        assert_eq!(magnet, Some(format!("{}&dn=Heat.1995", HEAT_MAGNET)));
    }

    #[tokio::test]
    async fn test_timeout_is_retried_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/6"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", HEAT_MAGNET)
                    .set_delay(Duration::from_secs(2)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dl/6"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", HEAT_MAGNET))
            .mount(&server)
            .await;

        let magnet = fast_resolver()
            .resolve_url(&format!("{}/dl/6", server.uri()))
            .await
            .unwrap();
        assert_eq!(magnet.as_deref(), Some(HEAT_MAGNET));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_timeouts_give_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/7"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let err = fast_resolver()
            .resolve_url(&format!("{}/dl/7", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Timeout));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_page_without_magnet_resolves_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/details/8"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<html>removed</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let magnet = fast_resolver()
            .resolve_url(&format!("{}/details/8", server.uri()))
            .await
            .unwrap();
        assert_eq!(magnet, None);
    }

    #[tokio::test]
    async fn test_unresolvable_hits_are_dropped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dl/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dl/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("nothing here", "text/plain"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dl/ok"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", HEAT_MAGNET))
            .mount(&server)
            .await;

        let hits: Vec<RawHit> = ["gone", "empty", "ok"]
            .iter()
            .map(|name| {
                let mut hit = RawHit::new(format!("Heat.1995.{}", name), "idx");
                hit.download_url = Some(format!("{}/dl/{}", server.uri(), name));
                hit
            })
            .collect();

        let releases = fast_resolver().resolve_all(hits).await;
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].title, "Heat.1995.ok");
        assert_eq!(releases[0].links, vec![HEAT_MAGNET]);
    }
}

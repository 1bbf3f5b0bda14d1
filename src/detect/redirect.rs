//! Redirect tracing stage.
//!
//! Walks up to five manual redirects starting at `https://<domain>` with a
//! no-redirect client and browser-like headers, recording every hop. The
//! hostname reached at the end becomes the final domain every downstream
//! network stage targets.
//!
//! Chain rules: the chain starts with the input domain and grows only on
//! cross-host redirects. A Location pointing back at the current hostname
//! ends the walk — masquerade checks care about where a domain *lands*, not
//! about same-host path shuffling.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use log::debug;
use reqwest::Url;

use crate::config::MAX_REDIRECT_HOPS;
use crate::detect::{DetectionStage, ProbeRun};
use crate::error_handling::ProbeError;
use crate::models::NetworkInfo;

/// Traces the redirect chain and records network reachability.
pub struct RedirectStage;

#[async_trait]
impl DetectionStage for RedirectStage {
    fn name(&self) -> &'static str {
        "redirect"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn blocking(&self) -> bool {
        true
    }

    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError> {
        let start_url = format!("https://{}", run.domain);
        let network = trace_redirects(
            &run.env.redirect_client,
            &run.env.cancel,
            &run.domain,
            &start_url,
        )
        .await;

        // Later blocking stages follow the redirect target, not the input.
        if network.is_redirected && !network.final_domain.is_empty() {
            run.domain = network.final_domain.clone();
        }
        run.result.network = Some(network);
        Ok(())
    }
}

/// Browser-like headers sent on every hop; bare clients get served
/// different redirect chains (or blocked outright) often enough to matter.
fn apply_browser_headers(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    builder
        .header(
            reqwest::header::ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
}

/// Resolves a Location header value against the current URL.
///
/// Absolute-path values join the current scheme and host; scheme-less
/// values are assumed HTTPS; everything else must parse as a full URL.
fn resolve_location(current: &Url, location: &str) -> Option<Url> {
    if location.starts_with('/') {
        current.join(location).ok()
    } else if !location.starts_with("http") {
        Url::parse(&format!("https://{location}")).ok()
    } else {
        Url::parse(location).ok()
    }
}

/// Follows up to [`MAX_REDIRECT_HOPS`] manual redirects from `start_url`.
pub(crate) async fn trace_redirects(
    client: &reqwest::Client,
    cancel: &tokio_util::sync::CancellationToken,
    domain: &str,
    start_url: &str,
) -> NetworkInfo {
    let started = Instant::now();
    let mut network = NetworkInfo {
        final_domain: domain.to_string(),
        redirect_chain: vec![domain.to_string()],
        url: start_url.to_string(),
        ..Default::default()
    };

    let mut current_url = start_url.to_string();
    let mut current_domain = domain.to_string();

    for _ in 0..MAX_REDIRECT_HOPS {
        let request = apply_browser_headers(client.get(&current_url));
        let response = tokio::select! {
            _ = cancel.cancelled() => break,
            response = request.send() => match response {
                Ok(response) => response,
                Err(e) => {
                    debug!("request to {current_url} failed: {e}");
                    break;
                }
            },
        };

        network.accessible = true;
        network.status_code = response.status().as_u16();
        network.url = current_url.clone();
        network.headers = first_header_values(response.headers());

        if (300..400).contains(&network.status_code) {
            if let Some(next) = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|loc| loc.to_str().ok())
                .and_then(|loc| {
                    Url::parse(&current_url)
                        .ok()
                        .and_then(|current| resolve_location(&current, loc))
                })
            {
                if let Some(next_host) = next.host_str().map(str::to_string) {
                    if next_host != current_domain && !next_host.is_empty() {
                        network.redirect_chain.push(next_host.clone());
                        network.is_redirected = true;
                        network.redirect_count += 1;
                        current_url = next.to_string();
                        current_domain = next_host;
                        continue;
                    }
                }
            }
        }

        // Final response (or a same-host / malformed redirect): stop here.
        break;
    }

    network.final_domain = current_domain;
    network.response_time = started.elapsed();
    network
}

/// First value of every response header, keyed by lowercase name.
fn first_header_values(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (name, value) in headers {
        map.entry(name.as_str().to_string())
            .or_insert_with(|| value.to_str().unwrap_or_default().to_string());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use httptest::{matchers::*, responders::*, Expectation, Server};
    use tokio_util::sync::CancellationToken;

    fn client() -> reqwest::Client {
        crate::initialization::init_redirect_client().expect("client")
    }

    #[tokio::test]
    async fn test_no_redirect() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/"))
                .respond_with(status_code(200).insert_header("server", "origin").body("OK")),
        );

        let url = server.url("/").to_string();
        let network =
            trace_redirects(&client(), &CancellationToken::new(), "127.0.0.1", &url).await;

        assert!(network.accessible);
        assert_eq!(network.status_code, 200);
        assert!(!network.is_redirected);
        assert_eq!(network.redirect_chain, vec!["127.0.0.1"]);
        assert_eq!(network.final_domain, "127.0.0.1");
        assert_eq!(network.headers.get("server").map(String::as_str), Some("origin"));
    }

    #[tokio::test]
    async fn test_cross_host_redirect_extends_chain() {
        let server = Server::run();
        // Same listener, different hostname: 127.0.0.1 -> localhost.
        let target = format!("http://localhost:{}/final", server.addr().port());
        server.expect(
            Expectation::matching(request::method_path("GET", "/")).respond_with(
                status_code(301)
                    .insert_header("Location", target.as_str())
                    .body("moved"),
            ),
        );
        server.expect(
            Expectation::matching(request::method_path("GET", "/final"))
                .respond_with(status_code(200).body("OK")),
        );

        let url = server.url("/").to_string();
        let network =
            trace_redirects(&client(), &CancellationToken::new(), "127.0.0.1", &url).await;

        assert!(network.is_redirected);
        assert_eq!(network.redirect_count, 1);
        assert_eq!(network.redirect_chain, vec!["127.0.0.1", "localhost"]);
        assert_eq!(network.final_domain, "localhost");
        assert_eq!(network.status_code, 200);
    }

    #[tokio::test]
    async fn test_same_host_redirect_does_not_extend_chain() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/")).respond_with(
                status_code(302)
                    .insert_header("Location", "/elsewhere")
                    .body("loop"),
            ),
        );

        let url = server.url("/").to_string();
        let network =
            trace_redirects(&client(), &CancellationToken::new(), "127.0.0.1", &url).await;

        // The self-redirect terminates the walk with the redirect status.
        assert_eq!(network.redirect_chain.len(), 1);
        assert!(!network.is_redirected);
        assert_eq!(network.final_domain, "127.0.0.1");
        assert_eq!(network.status_code, 302);
    }

    #[tokio::test]
    async fn test_redirect_without_location_stops() {
        let server = Server::run();
        server.expect(
            Expectation::matching(request::method_path("GET", "/"))
                .respond_with(status_code(302).body("no location")),
        );

        let url = server.url("/").to_string();
        let network =
            trace_redirects(&client(), &CancellationToken::new(), "127.0.0.1", &url).await;

        assert_eq!(network.redirect_chain.len(), 1);
        assert_eq!(network.status_code, 302);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_inaccessible() {
        // Nothing listens on this port.
        let network = trace_redirects(
            &client(),
            &CancellationToken::new(),
            "127.0.0.1",
            "http://127.0.0.1:1/",
        )
        .await;

        assert!(!network.accessible);
        assert_eq!(network.status_code, 0);
        assert_eq!(network.final_domain, "127.0.0.1");
    }

    #[test]
    fn test_resolve_location_forms() {
        let base = Url::parse("https://a.example/path/page").unwrap();
        assert_eq!(
            resolve_location(&base, "/other").unwrap().as_str(),
            "https://a.example/other"
        );
        assert_eq!(
            resolve_location(&base, "b.example/x").unwrap().as_str(),
            "https://b.example/x"
        );
        assert_eq!(
            resolve_location(&base, "http://c.example/").unwrap().as_str(),
            "http://c.example/"
        );
    }
}

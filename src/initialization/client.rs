//! HTTP client initialization.

use std::time::Duration;

use reqwest::ClientBuilder;

use crate::config::{HTTP_REDIRECT_TIMEOUT, USER_AGENT};

/// Initializes the HTTP client used for manual redirect tracing.
///
/// Redirects are disabled so the redirect stage can walk the chain hop by
/// hop and record every intermediate hostname; the total timeout bounds each
/// individual request.
pub fn init_redirect_client() -> Result<reqwest::Client, reqwest::Error> {
    ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(HTTP_REDIRECT_TIMEOUT)
        .connect_timeout(Duration::from_secs(3))
        .user_agent(USER_AGENT)
        .build()
}

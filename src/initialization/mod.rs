//! Application initialization and resource setup.
//!
//! Initializes the shared resources every probe draws on: the no-redirect
//! HTTP client, the DNS resolver, the logger, the concurrency semaphore and
//! the rustls crypto provider.

mod client;
mod logger;
mod resolver;

use std::sync::Arc;

use rustls::crypto::{ring::default_provider, CryptoProvider};
use tokio::sync::Semaphore;

pub use client::init_redirect_client;
pub use logger::init_logger_with;
pub use resolver::init_resolver;

/// Initializes a semaphore for controlling concurrency.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}

/// Initializes the crypto provider for TLS operations.
///
/// Must run before any TLS connection is established. Reinstalling the
/// provider is harmless, so the result is ignored.
pub fn init_crypto_provider() {
    let _ = CryptoProvider::install_default(default_provider());
}

//! reality_probe library: Reality masquerade-target detection.
//!
//! Evaluates whether a public domain is a viable masquerade target for the
//! Reality TLS protocol. For each candidate the detection pipeline runs a
//! battery of probes — blocklist matching, redirect tracing, DNS and TCP
//! reachability, GeoIP, a two-handshake TLS probe (including a forced
//! X25519 re-handshake), certificate validation, CDN fingerprinting — and
//! renders a verdict with a recommendation score.
//!
//! # Example
//!
//! ```no_run
//! use reality_probe::{Checker, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let checker = Checker::new(Config::default())?;
//! let result = checker.check_domain("example.com").await;
//! println!("{}: suitable = {}", result.domain, result.suitable);
//! # Ok(())
//! # }
//! ```
//!
//! This library requires a Tokio runtime.

#![warn(missing_docs)]

pub mod assets;
pub mod batch;
pub mod config;
pub mod detect;
pub mod domain;
pub mod error_handling;
pub mod initialization;
pub mod models;
pub mod net;
mod pipeline;
pub mod report;

pub use batch::{check_domains, run_batch, BatchError, BatchReport};
pub use config::{Config, LogFormat, LogLevel};
pub use error_handling::{InitializationError, ProbeError};
pub use models::DetectionResult;
pub use pipeline::Pipeline;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::assets::AssetStore;
use crate::detect::ProbeEnv;
use crate::initialization::{init_crypto_provider, init_redirect_client, init_resolver};
use crate::net::TlsDialer;

/// Shared probe engine: environment plus pipeline.
///
/// Build one per process and reuse it for every check; the asset stores and
/// dialers it holds are immutable and safe to share.
pub struct Checker {
    env: Arc<ProbeEnv>,
    pipeline: Pipeline,
}

impl Checker {
    /// Builds the engine: installs the crypto provider, loads the asset
    /// stores from `config.data_dir`, and initializes the shared clients.
    pub fn new(config: Config) -> Result<Self, InitializationError> {
        Self::with_cancellation(config, CancellationToken::new())
    }

    /// Like [`Checker::new`], with an externally controlled cancellation
    /// token that propagates into every network call.
    pub fn with_cancellation(
        config: Config,
        cancel: CancellationToken,
    ) -> Result<Self, InitializationError> {
        init_crypto_provider();
        let assets = Arc::new(AssetStore::load(&config.data_dir));
        let env = Arc::new(ProbeEnv {
            dialer: TlsDialer::new()?,
            resolver: init_resolver(),
            redirect_client: init_redirect_client()?,
            assets,
            cancel,
            config,
        });
        Ok(Self {
            env,
            pipeline: Pipeline::new(),
        })
    }

    /// Probes a single domain; never fails — all failures surface inside
    /// the result record.
    pub async fn check_domain(&self, domain: &str) -> DetectionResult {
        self.pipeline.execute(Arc::clone(&self.env), domain).await
    }

    /// Probes a list of domains under the batch concurrency model and
    /// returns the aggregated report.
    pub async fn check_domains(&self, domains: &[String]) -> Result<BatchReport, BatchError> {
        batch::run_batch(Arc::clone(&self.env), domains).await
    }

    /// The cancellation token governing this engine's network calls.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.env.cancel.clone()
    }
}

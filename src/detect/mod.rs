//! Detection stages.
//!
//! Each stage is a pure function over the shared probe context: it reads the
//! environment, performs its checks, and writes into the sub-records it
//! owns. Stages never propagate failures out of the pipeline — a negative
//! finding becomes a [`ProbeError`] assigned to the result.
//!
//! Stages split into two sets:
//! - **blocking** stages run sequentially in priority order; a blocking
//!   stage that returns an error short-circuits the pipeline (early exit);
//! - **networking** stages run concurrently after every blocking stage has
//!   finished, so they always observe a settled final domain.

mod blocked;
mod comprehensive_tls;
mod hot_website;
mod ip_resolver;
mod location;
mod location_check;
mod redirect;
mod status_check;

pub use blocked::BlockedStage;
pub use comprehensive_tls::ComprehensiveTlsStage;
pub use hot_website::HotWebsiteStage;
pub use ip_resolver::IpResolverStage;
pub use location::LocationStage;
pub use location_check::LocationCheckStage;
pub use redirect::RedirectStage;
pub use status_check::StatusCheckStage;

use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use tokio_util::sync::CancellationToken;

use crate::assets::AssetStore;
use crate::config::Config;
use crate::error_handling::ProbeError;
use crate::models::DetectionResult;
use crate::net::TlsDialer;

/// Shared, read-only probe environment.
///
/// Built once at startup and shared by every pipeline invocation; all
/// members are safe for lock-free concurrent use.
pub struct ProbeEnv {
    /// Probe configuration.
    pub config: Config,
    /// Read-only lookup stores.
    pub assets: Arc<AssetStore>,
    /// The two TLS dialers and the chain verifier.
    pub dialer: TlsDialer,
    /// Shared DNS resolver.
    pub resolver: TokioAsyncResolver,
    /// No-redirect HTTP client for redirect tracing.
    pub redirect_client: reqwest::Client,
    /// Cancellation token propagated into every network call.
    pub cancel: CancellationToken,
}

/// Mutable state of one pipeline invocation.
pub struct ProbeRun {
    /// Domain currently targeted; the redirect stage rewrites this to the
    /// final domain so later blocking stages follow the redirect.
    pub domain: String,
    /// Shared environment.
    pub env: Arc<ProbeEnv>,
    /// The result record being populated.
    pub result: DetectionResult,
}

impl ProbeRun {
    /// Starts a run for a normalized domain.
    pub fn new(domain: String, env: Arc<ProbeEnv>) -> Self {
        let result = DetectionResult::new(domain.clone());
        Self {
            domain,
            env,
            result,
        }
    }

    /// Snapshot for a concurrent stage: same domain and environment, a
    /// clone of the current result to write deltas into.
    pub fn snapshot(&self) -> Self {
        Self {
            domain: self.domain.clone(),
            env: Arc::clone(&self.env),
            result: self.result.clone(),
        }
    }
}


/// One detection stage.
#[async_trait]
pub trait DetectionStage: Send + Sync {
    /// Stage name, used in logs and panic reports.
    fn name(&self) -> &'static str;

    /// Execution priority; lower runs earlier.
    fn priority(&self) -> u8;

    /// Whether the stage belongs to the sequential (blocking) set.
    ///
    /// Blocking stages run strictly ordered and may short-circuit the
    /// pipeline by returning an error. Networking stages run concurrently
    /// and their errors are recorded without aborting anything.
    fn blocking(&self) -> bool;

    /// Runs the stage against the probe context.
    async fn execute(&self, run: &mut ProbeRun) -> Result<(), ProbeError>;
}

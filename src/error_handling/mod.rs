//! Error types.
//!
//! Two families live here:
//! - [`ProbeError`] — every way a domain probe can end negatively, split into
//!   expected-negative verdicts (the probe worked, the domain is unsuitable)
//!   and technical failures (the probe could not decide).
//! - [`InitializationError`] — startup failures for shared resources.

mod types;

pub use types::{ErrorKind, InitializationError, ProbeError};

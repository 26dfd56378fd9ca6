// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Optional `tracing-subscriber` bootstrap for binaries embedding this crate.
//!
//! The data-plane crates never call this themselves — a library must not
//! install a global subscriber on a caller's behalf. This is here purely as a
//! convenience for the common case (a standalone collector binary).

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber reading its filter from `RUST_LOG`, falling back
/// to `info` if unset. Returns an error if a global subscriber is already set.
pub fn init_default() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
}

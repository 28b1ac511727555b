//! Lock screen core for the Aura personal-finance tracker.
//!
//! The [`lock::AccessGuard`] gates protected content behind a biometric
//! check with a 4-digit PIN fallback and a timed lockout after repeated
//! failures. Attempt and lockout state live in a [`storage::CredentialStore`]
//! so they survive restarts. [`state::AppSession`] wires both together with
//! first-run setup, PIN change, data reset and theme preferences.

pub mod account;
mod cli;
pub mod error;
pub mod lock;
pub mod state;
pub mod storage;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AuraError, Result};
pub use lock::{AccessGuard, GuardConfig, GuardEvent, GuardOutcome, LockStatus};
pub use state::{AppSession, SessionSnapshot};
pub use storage::{CredentialStore, FileBackend, MemoryBackend, SecureStore};

/// Entry point of the `aura` binary.
pub fn run() -> anyhow::Result<()> {
    // Initialize tracing (stderr, so command output stays clean)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aura_app_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = cli::Args::parse();
    info!("Starting Aura...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(cli::execute(args))
}

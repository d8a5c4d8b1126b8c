//! # caverna-core
//!
//! Core library for the Modo Caverna AI report ("Capitão Cavernas").
//!
//! This library provides:
//! - Domain types for metrics snapshots and analysis requests
//! - Prompt construction
//! - An HTTP client for the completion and speech-synthesis providers
//! - Credential storage behind an injectable [`CredentialStore`]
//! - A [`Narrator`] capability and the [`ReportSession`] that drives a cycle
//! - Configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use caverna_core::{AnalysisClient, AnalysisRequest, Config, KvStore, Period};
//!
//! # async fn run() -> caverna_core::Result<()> {
//! let config = Config::load()?;
//! let store = Arc::new(KvStore::open_migrated(&Config::database_path())?);
//! let client = AnalysisClient::new(&config, store)?;
//!
//! let request = AnalysisRequest {
//!     period: Period::Monthly,
//!     metrics: Default::default(),
//!     selected_metrics: vec!["activeUsers".to_string()],
//!     auto_mode: false,
//! };
//! let result = client.request_analysis(&request).await?;
//! println!("{}", result.report);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use audio::{AudioOutcome, AudioResource};
pub use client::{AnalysisClient, PLACEHOLDER_REPORT};
pub use config::Config;
pub use error::{Error, Result};
pub use narrator::{CommandNarrator, Narrator};
pub use session::{AudioState, CycleState, PlaybackHandle, PlaybackState, ReportSession};
pub use store::{CredentialStore, EnvCredentialStore, KvStore, MemoryCredentialStore};
pub use types::*;

// Public modules
pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod narrator;
pub mod prompt;
pub mod session;
pub mod store;
pub mod types;

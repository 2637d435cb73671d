//! Structured logging for estimation runs.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding application, which can call [`init_logging`] once at
//! startup:
//!
//! ```ignore
//! use mc_core::logging::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::from_env())?;
//! ```
//!
//! Events are tagged with a [`Stage`] and use an [`event_names`] constant as
//! their target, so each stage can be given its own level.
//! [`LogConfig::subscriber`] builds the same subscriber around any writer.

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat};
pub use events::{event_names, Stage};

use std::io::IsTerminal;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr.
///
/// `RUST_LOG` directives take precedence over the configuration. Fails when
/// a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));
    config
        .build(filter, std::io::stderr, std::io::stderr().is_terminal())
        .try_init()
}

/// Install a subscriber configured from the environment only.
pub fn init_default_logging() -> Result<(), TryInitError> {
    init_logging(&LogConfig::from_env())
}

/// Emit an event with a stage field, the event name as target.
///
/// ```ignore
/// log_event!(INFO, event_names::SEM_ATTEMPT_STARTED, Stage::Sem, "SEM attempt started", attempt = 1);
/// ```
#[macro_export]
macro_rules! log_event {
    (INFO, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::info!(target: $event, stage = %$stage, $($key = $val,)* "{}", $msg)
    };
    (DEBUG, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::debug!(target: $event, stage = %$stage, $($key = $val,)* "{}", $msg)
    };
    (TRACE, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::trace!(target: $event, stage = %$stage, $($key = $val,)* "{}", $msg)
    };
    (WARN, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::warn!(target: $event, stage = %$stage, $($key = $val,)* "{}", $msg)
    };
}

//! Logging configuration.
//!
//! `MC_LOG` holds a base level followed by optional per-stage levels, e.g.
//! `info,sem=debug,gibbs=off`. `MC_LOG_FORMAT` selects console or JSON lines.

use super::events::Stage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::Subscriber;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Console lines (default).
    #[default]
    Human,
    /// One JSON object per event.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "console" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.trim()
        .parse::<LevelFilter>()
        .map_err(|_| format!("unknown log level: {}", s))
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Level of every stage without an override, and of the crates' own
    /// diagnostics.
    pub level: LevelFilter,
    pub stages: BTreeMap<Stage, LevelFilter>,
    /// Timestamps on console lines.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
            stages: BTreeMap::new(),
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Config from `MC_LOG` and `MC_LOG_FORMAT`. Unparsable values are
    /// ignored.
    pub fn from_env() -> Self {
        let mut config = LogConfig::default();
        if let Ok(val) = std::env::var("MC_LOG") {
            if let Ok(parsed) = config.clone().with_directives(&val) {
                config = parsed;
            }
        }
        if let Some(format) = std::env::var("MC_LOG_FORMAT").ok().and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        config
    }

    /// Apply comma separated `level` and `stage=level` items.
    pub fn with_directives(mut self, directives: &str) -> Result<Self, String> {
        for item in directives.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.split_once('=') {
                Some((stage, level)) => {
                    let stage: Stage = stage.trim().parse()?;
                    self.stages.insert(stage, parse_level(level)?);
                }
                None => self.level = parse_level(item)?,
            }
        }
        Ok(self)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    pub fn with_stage(mut self, stage: Stage, level: LevelFilter) -> Self {
        self.stages.insert(stage, level);
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    pub fn stage_level(&self, stage: Stage) -> LevelFilter {
        self.stages.get(&stage).copied().unwrap_or(self.level)
    }

    /// `EnvFilter` directive covering the event names of every stage and
    /// the estimation crates.
    pub fn filter_directive(&self) -> String {
        let mut items: Vec<String> = ["mc_core", "mc_config"]
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect();
        for stage in Stage::ALL {
            let level = self.stage_level(*stage);
            items.extend(stage.event_prefixes().iter().map(|p| format!("{}={}", p, level)));
        }
        items.join(",")
    }

    /// Subscriber writing to `writer`, filtered by this configuration.
    pub fn subscriber<W>(&self, writer: W) -> Box<dyn Subscriber + Send + Sync>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        self.build(EnvFilter::new(self.filter_directive()), writer, false)
    }

    pub(crate) fn build<W>(&self, filter: EnvFilter, writer: W, ansi: bool) -> Box<dyn Subscriber + Send + Sync>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let registry = tracing_subscriber::registry().with(filter);
        match (self.format, self.timestamps) {
            (LogFormat::Jsonl, _) => Box::new(
                registry.with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_target(true)
                        .with_current_span(true),
                ),
            ),
            (LogFormat::Human, true) => Box::new(registry.with(fmt::layer().with_writer(writer).with_ansi(ansi))),
            (LogFormat::Human, false) => {
                Box::new(registry.with(fmt::layer().with_writer(writer).with_ansi(ansi).without_time()))
            }
        }
    }
}

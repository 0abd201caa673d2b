use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::config_dir;

fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Projected,
    Actual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevelArg {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevelArg {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevelArg::Trace => "trace",
            LogLevelArg::Debug => "debug",
            LogLevelArg::Info => "info",
            LogLevelArg::Warn => "warn",
            LogLevelArg::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Json,
    Text,
    Console,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompatArg {
    Permissive,
    Strict,
}

/// Flags for the `finfocus` binary (SPEC_FULL §2 "finfocus-cli"): a thin
/// wrapper that reads a JSON array of `ResourceDescriptor` (standing in for
/// the out-of-scope plan-ingestion collaborator), drives the engine, and
/// optionally applies the aggregator before writing the resulting `Bundle`
/// as JSON to stdout.
#[derive(Parser, Debug)]
#[command(
    name = "finfocus",
    author,
    version,
    about = "Cost-analysis engine for infrastructure-as-code plans",
    long_about = "finfocus computes projected monthly costs and aggregates actual \
historical costs for a list of resource descriptors, dispatching queries to a \
pool of out-of-process cost-source plugins and falling back to a local static \
pricing library.

Examples:
  finfocus --input plan.json
  finfocus --input plan.json --mode actual --start 2025-01-01T00:00:00Z --end 2025-02-01T00:00:00Z
  finfocus --input plan.json --group-by provider --filter 'provider=aws'"
)]
pub struct Cli {
    /// Path to a JSON file containing an array of ResourceDescriptor.
    /// Reads from stdin when omitted.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Whether to compute a forward-looking estimate or aggregate an
    /// actual-cost time series.
    #[arg(long, value_enum, default_value_t = ModeArg::Projected)]
    pub mode: ModeArg,

    /// Start of the actual-cost window (RFC3339). Required with --mode actual.
    #[arg(long)]
    pub start: Option<String>,

    /// End of the actual-cost window (RFC3339). Required with --mode actual.
    #[arg(long)]
    pub end: Option<String>,

    /// Filter expression applied before grouping (§4.7).
    #[arg(long)]
    pub filter: Option<String>,

    /// Grouping dimension: provider, type, region, adapter, daily, monthly,
    /// or tag:<k>. Repeatable to emit more than one grouping.
    #[arg(long = "group-by")]
    pub group_by: Vec<String>,

    /// Override the plugin install root (default `~/.finfocus/plugins`).
    #[arg(long)]
    pub plugins_dir: Option<PathBuf>,

    /// Override the local pricing-spec directory (default `~/.finfocus/specs`).
    #[arg(long)]
    pub specs_dir: Option<PathBuf>,

    /// Plugin spec-version compatibility enforcement.
    #[arg(long, value_enum)]
    pub compat: Option<CompatArg>,

    /// Log verbosity. Precedence: flag > FINFOCUS_LOG_LEVEL > config file > default.
    #[arg(long, value_enum, env = "FINFOCUS_LOG_LEVEL")]
    pub log_level: Option<LogLevelArg>,

    /// Log encoding. Precedence: flag > FINFOCUS_LOG_FORMAT > config file > default.
    #[arg(long, value_enum, env = "FINFOCUS_LOG_FORMAT")]
    pub log_format: Option<LogFormatArg>,

    /// Path to a TOML config file (lowest-precedence source).
    #[arg(long, default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Externally supplied correlation id; otherwise FINFOCUS_TRACE_ID, or a
    /// fresh ULID (§4.8).
    #[arg(long)]
    pub trace_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}

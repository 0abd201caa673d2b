//! Wires the cost engine, router and aggregator into the `finfocus` binary
//! (SPEC_FULL §2 "finfocus-cli"): descriptor ingestion, configuration
//! precedence, structured logging, exit-code mapping, and SIGINT-triggered
//! plugin teardown.

pub mod args;
pub mod config;
pub mod logging;
pub mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use finfocus_aggregator::{parse_filter, GroupResult};
use finfocus_core::{Bundle, CostSource, ResourceDescriptor, TraceContext};
use finfocus_engine::CostEngine;
use finfocus_localspec::LocalSpecSource;
use finfocus_plugin::{CompatibilityMode, PluginHost};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use args::{Cli, CompatArg, LogFormatArg, LogLevelArg, ModeArg};
use config::FileConfig;

/// `0` success, `1` partial success, `2` empty input, `3` configuration or
/// invocation error (§6).
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_EMPTY: i32 = 2;

fn resolve_log_level(cli: Option<LogLevelArg>, file: &FileConfig) -> String {
    if let Some(level) = cli {
        return level.as_filter_str().to_string();
    }
    if let Some(level) = &file.log_level {
        return level.clone();
    }
    "info".to_string()
}

fn resolve_log_format(cli: Option<LogFormatArg>, file: &FileConfig) -> LogFormatArg {
    if let Some(format) = cli {
        return format;
    }
    match file.log_format.as_deref() {
        Some("json") => LogFormatArg::Json,
        Some("console") => LogFormatArg::Console,
        _ => LogFormatArg::Text,
    }
}

fn resolve_compat(cli: Option<CompatArg>, file: &FileConfig) -> CompatibilityMode {
    match cli {
        Some(CompatArg::Strict) => CompatibilityMode::Strict,
        Some(CompatArg::Permissive) => CompatibilityMode::Permissive,
        None => match file.compat.as_deref() {
            Some("strict") => CompatibilityMode::Strict,
            _ => CompatibilityMode::Permissive,
        },
    }
}

fn resolve_path(cli: Option<PathBuf>, file: Option<PathBuf>) -> Option<PathBuf> {
    cli.or(file)
}

fn read_descriptors(input: Option<&PathBuf>) -> Result<Vec<ResourceDescriptor>> {
    let data = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file {}", path.display()))?,
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read descriptors from stdin")?;
            buf
        }
    };
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&data).context("input is not a JSON array of ResourceDescriptor")
}

fn parse_rfc3339(label: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("--{label} is not a valid RFC3339 timestamp: {value:?}"))
}

/// Run one invocation end to end and return the process exit code. Fatal
/// configuration errors (malformed input, a missing `--start`/`--end` in
/// actual mode) are returned as `Err` so the caller maps them to exit code 3
/// before any resource is processed (§7).
pub async fn run(cli: Cli) -> Result<i32> {
    let file_config = config::load_config(&cli.config).unwrap_or_default();

    let log_level = resolve_log_level(cli.log_level, &file_config);
    let log_format = resolve_log_format(cli.log_format, &file_config);
    logging::init_subscriber(&log_level, log_format);

    let trace = TraceContext::resolve(cli.trace_id.as_deref());
    let span = tracing::info_span!("finfocus_run", trace_id = %trace);
    let _guard = span.enter();

    let descriptors = read_descriptors(cli.input.as_ref())?;
    if descriptors.is_empty() {
        info!("no descriptors to cost; emitting empty bundle");
        let now = Utc::now();
        let bundle = Bundle {
            results: Vec::new(),
            errors: Vec::new(),
            trace_id: trace.id().to_string(),
            started_at: now,
            completed_at: now,
        };
        output::render(&bundle, &[])?;
        return Ok(EXIT_EMPTY);
    }

    let (start, end) = match cli.mode {
        ModeArg::Projected => (None, None),
        ModeArg::Actual => {
            let start = cli
                .start
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("--mode actual requires --start"))
                .and_then(|s| parse_rfc3339("start", s))?;
            let end = cli
                .end
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("--mode actual requires --end"))
                .and_then(|e| parse_rfc3339("end", e))?;
            if end <= start {
                bail!("--end must be after --start");
            }
            (Some(start), Some(end))
        }
    };

    let compat = resolve_compat(cli.compat, &file_config);
    let plugins_dir = resolve_path(cli.plugins_dir.clone(), file_config.plugins_dir.clone());
    let specs_dir = resolve_path(cli.specs_dir.clone(), file_config.specs_dir.clone());

    let host = Arc::new(PluginHost::new(compat));
    host.discover_and_spawn(plugins_dir.as_deref())
        .await
        .context("plugin discovery failed")?;
    let local_spec = LocalSpecSource::load(specs_dir.as_deref()).context("local spec loading failed")?;

    let cancel = CancellationToken::new();
    {
        let cancel_for_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("received interrupt; cancelling in-flight queries");
                cancel_for_signal.cancel();
            }
        });
    }

    let plugins: Vec<Arc<dyn CostSource>> = host
        .ready_clients()
        .await
        .into_iter()
        .map(|c| c as Arc<dyn CostSource>)
        .collect();
    let engine = CostEngine::new(plugins, Some(local_spec));

    // The engine consumes its descriptor list; the aggregator needs the
    // original descriptors (provider/region/tags) alongside the bundle to
    // join on for grouping/filtering (§4.7), so a copy survives the run.
    let descriptors_for_agg = descriptors.clone();

    let bundle = match (cli.mode, start, end) {
        (ModeArg::Actual, Some(start), Some(end)) => {
            engine
                .run_actual(descriptors, start, end, trace.id(), &cancel)
                .await
        }
        _ => engine.run_projected(descriptors, trace.id(), &cancel).await,
    };

    host.shutdown().await;

    let groups = compute_groups(&bundle, &descriptors_for_agg, &cli)?;
    output::render(&bundle, &groups)?;

    if bundle.is_empty() {
        Ok(EXIT_EMPTY)
    } else if bundle.is_partial() {
        Ok(EXIT_PARTIAL)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

fn compute_groups(
    bundle: &Bundle,
    descriptors: &[ResourceDescriptor],
    cli: &Cli,
) -> Result<Vec<(String, Vec<GroupResult>)>> {
    if cli.group_by.is_empty() {
        return Ok(Vec::new());
    }
    let expr = parse_filter(cli.filter.as_deref().unwrap_or(""))
        .map_err(|err| anyhow::anyhow!("invalid --filter expression: {err}"))?;

    // `Bundle.results` preserves input descriptor order (§5: "exactly one
    // CostResult per descriptor"), so results and descriptors join
    // positionally into the aggregator's `Row`.
    let rows: Vec<finfocus_aggregator::Row> = bundle
        .results
        .iter()
        .zip(descriptors.iter())
        .map(|(r, d)| finfocus_aggregator::Row::new(d, r.clone()))
        .filter(|row| expr.as_ref().map(|e| e.eval(row)).unwrap_or(true))
        .collect();

    let mut groups = Vec::with_capacity(cli.group_by.len());
    for dimension in &cli.group_by {
        let result = finfocus_aggregator::aggregate(&rows, dimension)
            .map_err(|err| anyhow::anyhow!("invalid --group-by {dimension:?}: {err}"))?;
        groups.push((dimension.clone(), result));
    }
    Ok(groups)
}

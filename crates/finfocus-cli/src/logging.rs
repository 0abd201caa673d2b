use tracing_subscriber::EnvFilter;

use crate::args::LogFormatArg;

/// Configure the global `tracing` subscriber from the resolved verbosity and
/// encoding (§6 `FINFOCUS_LOG_LEVEL`/`FINFOCUS_LOG_FORMAT`). Every event
/// emitted afterwards inherits the `trace_id` field from the enclosing
/// `finfocus_run` span (§4.8) so every log line in a run shares one
/// correlation id.
pub fn init_subscriber(level: &str, format: LogFormatArg) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    match format {
        LogFormatArg::Json => {
            builder.json().init();
        }
        LogFormatArg::Console => {
            builder.pretty().init();
        }
        LogFormatArg::Text => {
            builder.init();
        }
    }
}

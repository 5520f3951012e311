//! Global subscriber: coloured console output plus a JSON-lines log file.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::field::{Field, Visit};

use super::types::{OUTCOME_TARGET, PhaseStatus, SIMULATED_TARGET, STAGE_TARGET};
use crate::paths;

/// Overrides the console level, e.g. `DOTFILES_LOG=debug`.
pub const LOG_ENV: &str = "DOTFILES_LOG";

/// Message plus every other field of an event, stringified.
#[derive(Default)]
struct Fields {
    message: String,
    extra: BTreeMap<&'static str, String>,
}

impl Fields {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.extra.insert(field.name(), value);
        }
    }
}

impl Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }
}

/// `<state dir>/logs/<command>.jsonl`, or `None` without a home directory.
#[must_use]
pub fn log_file_path(command: &str) -> Option<PathBuf> {
    let home = paths::home_dir().ok()?;
    Some(
        paths::default_state_dir(&home)
            .join("logs")
            .join(format!("{command}.jsonl")),
    )
}

/// Appends one JSON object per event.
#[derive(Debug)]
struct JsonFileLayer {
    file: Mutex<fs::File>,
}

impl JsonFileLayer {
    /// Truncate `path` for a fresh run. `None` when it cannot be opened.
    fn create(path: &Path) -> Option<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        let file = fs::File::create(path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for JsonFileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let metadata = event.metadata();
        let fields = Fields::of(event);
        let record = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "level": metadata.level().as_str(),
            "target": metadata.target(),
            "message": fields.message,
            "fields": fields.extra,
        });
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{record}").ok();
        }
    }
}

/// Human-oriented console lines.
struct ConsoleFormat;

impl ConsoleFormat {
    const fn outcome_colour(status: Option<PhaseStatus>) -> &'static str {
        match status {
            Some(PhaseStatus::Changed) => "\x1b[32m",
            Some(PhaseStatus::Simulated) => "\x1b[33m",
            Some(PhaseStatus::Failed) => "\x1b[31m",
            Some(PhaseStatus::Unchanged) | None => "\x1b[2m",
        }
    }
}

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let fields = Fields::of(event);
        let msg = &fields.message;

        match (*metadata.level(), metadata.target()) {
            (tracing::Level::ERROR, _) => writeln!(writer, "\x1b[1;31merror:\x1b[0m {msg}"),
            (tracing::Level::WARN, _) => writeln!(writer, "\x1b[1;33mwarning:\x1b[0m {msg}"),
            (_, STAGE_TARGET) => writeln!(writer, "\x1b[1m:: {msg}\x1b[0m"),
            (_, SIMULATED_TARGET) => writeln!(writer, "   \x1b[36mwould\x1b[0m {msg}"),
            (_, OUTCOME_TARGET) => {
                let status = fields
                    .extra
                    .get("status")
                    .map(String::as_str)
                    .and_then(PhaseStatus::parse);
                let colour = Self::outcome_colour(status);
                writeln!(writer, "   {colour}{msg}\x1b[0m")
            }
            (tracing::Level::INFO, _) => writeln!(writer, "   {msg}"),
            _ => writeln!(writer, "   \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Install the global subscriber for `command`.
///
/// Warnings and errors go to stderr, everything else to stdout. The
/// console shows `info` and above (`debug` with `verbose`) unless
/// [`LOG_ENV`] says otherwise. Every `debug` event is also written to
/// [`log_file_path`]. A second call is a no-op.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let console_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    let console = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(
            std::io::stderr
                .with_max_level(tracing::Level::WARN)
                .or_else(std::io::stdout),
        )
        .with_filter(console_filter);

    let file = log_file_path(command)
        .and_then(|path| JsonFileLayer::create(&path))
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .ok();
}

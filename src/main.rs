mod cli;
mod config;
mod marker;
mod mirror;
mod paths;
mod precheck;
mod rules;
mod runner;

use cli::Cli;
use config::{MirrorConfig, Settings};
use mirror::{MirrorRequest, Mode, Outcome, TracingSink};
use paths::DirPath;
use runner::Rsync;
use std::fmt as stdfmt;
use std::io::{IsTerminal, stderr};
use std::process::ExitCode;
use tracing::{Event, Level, Subscriber, error, warn};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt as tracing_fmt;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;

const DEFAULT_LOG_LEVEL: &str = "info";

struct MirrorExitCode;

impl MirrorExitCode {
    /// Exit code for every failure, and for printing usage.
    fn failure() -> ExitCode {
        ExitCode::from(1)
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                MirrorExitCode::failure()
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let Some((source, target)) = cli.directories() else {
        print!("{}", Cli::usage());
        return MirrorExitCode::failure();
    };
    let request = MirrorRequest {
        source: DirPath::parse(source),
        target: DirPath::parse(target),
        mode: if cli.dry_run {
            Mode::Preview
        } else {
            Mode::Apply
        },
    };

    init_tracing(cli.log_directive());

    match handle_mirror(&cli, &request) {
        Ok(exit_code) => exit_code,
        Err(err) => {
            error!("{err}");
            MirrorExitCode::failure()
        }
    }
}

fn handle_mirror(cli: &Cli, request: &MirrorRequest) -> anyhow::Result<ExitCode> {
    let home = config::home_dir();
    let file_settings = Settings::load(cli.config.as_deref(), home.as_deref())?;
    let config = MirrorConfig::resolve(cli.settings().or(file_settings), home.as_deref())?;

    let tool = Rsync::new(config.rsync_path.clone());

    // Failures have already been reported through the sink.
    let Ok(outcome) = mirror::run(&config, request, &tool, &mut TracingSink) else {
        return Ok(MirrorExitCode::failure());
    };

    if let Outcome::Previewed { log_file } = outcome
        && cli.view
        && let Err(err) = runner::open_in_editor(&log_file)
    {
        warn!("Could not open {}: {err}", log_file.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(directive: Option<&str>) {
    let stderr_is_terminal = stderr().is_terminal();
    let formatter = ColorFormatter { stderr_is_terminal };

    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
    };

    let fmt_layer = tracing_fmt::layer()
        .event_format(formatter)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// Colours whole messages on a terminal, and falls back to plain level
/// prefixes when stderr is redirected.
struct ColorFormatter {
    stderr_is_terminal: bool,
}

const COLOR_RED: &str = "\x1b[0;31m";
const COLOR_GREEN: &str = "\x1b[0;32m";
const COLOR_YELLOW: &str = "\x1b[0;33m";
const COLOR_NONE: &str = "\x1b[0m";

impl<S, N> FormatEvent<S, N> for ColorFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> stdfmt::Result {
        if self.stderr_is_terminal {
            let color = match *event.metadata().level() {
                Level::ERROR => Some(COLOR_RED),
                Level::WARN => Some(COLOR_YELLOW),
                Level::INFO => Some(COLOR_GREEN),
                _ => None,
            };
            match color {
                Some(color) => {
                    writer.write_str(color)?;
                    ctx.format_fields(writer.by_ref(), event)?;
                    writer.write_str(COLOR_NONE)?;
                }
                None => ctx.format_fields(writer.by_ref(), event)?,
            }
        } else {
            match *event.metadata().level() {
                Level::DEBUG => writer.write_str("DEBUG: ")?,
                Level::INFO => writer.write_str("INFO: ")?,
                Level::WARN => writer.write_str("WARN: ")?,
                Level::ERROR => writer.write_str("ERROR: ")?,
                _ => writer.write_str("TRACE: ")?,
            }
            ctx.format_fields(writer.by_ref(), event)?;
        }

        writeln!(writer)
    }
}

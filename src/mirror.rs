//! The guarded mirror operation.
//!
//! A run validates the source and target, then either previews the sync
//! (the tool runs with `-n -v` and a confirmation marker is written) or
//! applies it (only while a recent marker exists, which is consumed on
//! success). Any failure ends the run. Nothing is retried.

use crate::config::MirrorConfig;
use crate::marker::{MarkerError, MarkerFile};
use crate::paths::{DirPath, PathError, check_same_or_nested};
use crate::precheck::{self, PrecheckError};
use crate::rules::{RuleError, RuleFiles};
use crate::runner::{Output, RunError, SyncTool};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Flags passed to the sync tool on every run.
pub const BASE_SYNC_ARGS: [&str; 4] = ["-aH", "--force", "--delete-during", "--progress"];
/// Extra flags that turn a run into a non-mutating, verbose preview.
pub const PREVIEW_SYNC_ARGS: [&str; 2] = ["-n", "-v"];

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("source directory does not exist: {0}")]
    SourceMissing(String),
    #[error("source directory is empty, refusing to mirror: {0}")]
    SourceEmpty(String),
    #[error("cannot check whether the source directory is empty: {0}")]
    SourceUnreadable(#[source] PrecheckError),
    #[error(
        "source and target directories are the same or nested inside each other, refusing to mirror"
    )]
    Overlap,
    #[error("{0}")]
    Path(#[from] PathError),
    #[error("failed to create target directory: {0}")]
    CreateTarget(#[source] PrecheckError),
    #[error("{0}")]
    Rules(#[from] RuleError),
    #[error("{0}. Run with --dry-run first to create a fresh marker")]
    Confirmation(#[source] MarkerError),
    #[error("failed to create marker file: {0}")]
    CreateMarker(#[source] MarkerError),
    #[error("{0}")]
    Sync(#[from] RunError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Preview,
    Apply,
}

#[derive(Debug, Clone)]
pub struct MirrorRequest {
    pub source: DirPath,
    pub target: DirPath,
    pub mode: Mode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Previewed { log_file: PathBuf },
    Applied,
}

/// Progress reported while a run goes through its phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorEvent {
    Directories { source: String, target: String },
    CreatingTarget { target: String },
    RulesLoaded { exclude: usize, include: Option<usize> },
    IncludeRulesMissing { path: PathBuf },
    SyncStarted { mode: Mode, args: Vec<String> },
    MarkerCreated { path: PathBuf },
    PreviewFinished { log_file: PathBuf },
    ApplyStarted { marker_age: Duration },
    ApplyFinished,
    MarkerRemovalFailed { path: PathBuf, reason: String },
    Failed { reason: String },
}

pub trait EventSink {
    fn emit(&mut self, event: MirrorEvent);
}

/// Collects events, for callers that want to inspect them afterwards.
impl EventSink for Vec<MirrorEvent> {
    fn emit(&mut self, event: MirrorEvent) {
        self.push(event);
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: MirrorEvent) {
        match event {
            MirrorEvent::Directories { source, target } => {
                info!("Source directory: {source}");
                info!("Target directory: {target}");
            }
            MirrorEvent::CreatingTarget { target } => {
                warn!("Target directory does not exist, creating {target}");
            }
            MirrorEvent::RulesLoaded { exclude, include } => match include {
                Some(include) => info!("Loaded {exclude} exclude and {include} include rules"),
                None => info!("Loaded {exclude} exclude rules"),
            },
            MirrorEvent::IncludeRulesMissing { path } => {
                warn!("Include rule file does not exist: {}", path.display());
            }
            MirrorEvent::SyncStarted { mode, args } => {
                match mode {
                    Mode::Preview => {
                        warn!("Running in DRY-RUN mode. No changes will be made.");
                        info!("Simulating folder mirror...");
                    }
                    Mode::Apply => info!("Mirroring folders..."),
                }
                debug!("Sync arguments: {}", args.join(" "));
            }
            MirrorEvent::MarkerCreated { path } => {
                info!("Dry run complete. Marker file created: {}", path.display());
            }
            MirrorEvent::PreviewFinished { log_file } => {
                info!("Dry run output saved to: {}", log_file.display());
                warn!("Review the output, then run again without --dry-run to apply.");
            }
            MirrorEvent::ApplyStarted { marker_age } => {
                info!("Marker file is {} seconds old", marker_age.as_secs());
            }
            MirrorEvent::ApplyFinished => info!("Folder mirror completed successfully!"),
            MirrorEvent::MarkerRemovalFailed { path, reason } => {
                warn!("Could not remove marker file {}: {reason}", path.display());
            }
            MirrorEvent::Failed { reason } => error!("{reason}"),
        }
    }
}

/// Runs one guarded mirror operation. A failure is emitted as
/// [`MirrorEvent::Failed`] before being returned.
pub fn run(
    config: &MirrorConfig,
    request: &MirrorRequest,
    tool: &dyn SyncTool,
    sink: &mut dyn EventSink,
) -> Result<Outcome, MirrorError> {
    let result = run_phases(config, request, tool, sink);
    if let Err(err) = &result {
        sink.emit(MirrorEvent::Failed {
            reason: err.to_string(),
        });
    }
    result
}

fn run_phases(
    config: &MirrorConfig,
    request: &MirrorRequest,
    tool: &dyn SyncTool,
    sink: &mut dyn EventSink,
) -> Result<Outcome, MirrorError> {
    validate(&request.source, &request.target, sink)?;

    let rules = RuleFiles::locate(&config.rules_dir)?;
    let (exclude, include) = rules.count_patterns()?;
    sink.emit(MirrorEvent::RulesLoaded { exclude, include });
    if rules.include.is_none() {
        sink.emit(MirrorEvent::IncludeRulesMissing {
            path: config.rules_dir.join(crate::rules::INCLUDE_FILENAME),
        });
    }

    let marker = MarkerFile::new(&config.marker_file, config.marker_timeout);
    let args = sync_args(&rules, request);

    match request.mode {
        Mode::Preview => {
            sink.emit(MirrorEvent::SyncStarted {
                mode: Mode::Preview,
                args: args.clone(),
            });
            tool.run(&args, Output::Tee(&config.log_file))?;

            marker.create().map_err(MirrorError::CreateMarker)?;
            sink.emit(MirrorEvent::MarkerCreated {
                path: marker.path().to_path_buf(),
            });
            sink.emit(MirrorEvent::PreviewFinished {
                log_file: config.log_file.clone(),
            });

            Ok(Outcome::Previewed {
                log_file: config.log_file.clone(),
            })
        }
        Mode::Apply => {
            let marker_age = marker.check().map_err(MirrorError::Confirmation)?;
            sink.emit(MirrorEvent::ApplyStarted { marker_age });

            sink.emit(MirrorEvent::SyncStarted {
                mode: Mode::Apply,
                args: args.clone(),
            });
            tool.run(&args, Output::Inherit)?;
            sink.emit(MirrorEvent::ApplyFinished);

            // The apply already happened; a stale marker only forces another
            // preview.
            if let Err(err) = marker.remove() {
                sink.emit(MirrorEvent::MarkerRemovalFailed {
                    path: marker.path().to_path_buf(),
                    reason: err.to_string(),
                });
            }

            Ok(Outcome::Applied)
        }
    }
}

/// Source must exist and be non-empty, the two sides must not overlap, and
/// a missing target is created.
fn validate(
    source: &DirPath,
    target: &DirPath,
    sink: &mut dyn EventSink,
) -> Result<(), MirrorError> {
    sink.emit(MirrorEvent::Directories {
        source: source.with_trailing_slash(),
        target: target.with_trailing_slash(),
    });

    if !precheck::dir_exists(source) {
        return Err(MirrorError::SourceMissing(source.to_string()));
    }

    if precheck::is_dir_empty(source).map_err(MirrorError::SourceUnreadable)? {
        return Err(MirrorError::SourceEmpty(source.to_string()));
    }

    if check_same_or_nested(source, target)? {
        return Err(MirrorError::Overlap);
    }

    if !precheck::dir_exists(target) {
        sink.emit(MirrorEvent::CreatingTarget {
            target: target.to_string(),
        });
        precheck::create_dir(target).map_err(MirrorError::CreateTarget)?;
    }

    Ok(())
}

fn sync_args(rules: &RuleFiles, request: &MirrorRequest) -> Vec<String> {
    let mut args: Vec<String> = BASE_SYNC_ARGS.iter().map(|s| s.to_string()).collect();
    args.extend(rules.sync_args());
    if request.mode == Mode::Preview {
        args.extend(PREVIEW_SYNC_ARGS.iter().map(|s| s.to_string()));
    }
    args.push(request.source.with_trailing_slash());
    args.push(request.target.with_trailing_slash());
    args
}

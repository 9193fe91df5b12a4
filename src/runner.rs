//! Execution of the external sync tool and the preview viewer.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

pub const DEFAULT_PROGRAM: &str = "rsync";
const FALLBACK_EDITOR: &str = "vi";

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} failed ({})", describe_exit(.code))]
    Failed { program: String, code: Option<i32> },
    #[error("cannot write log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(std::io::Error),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Where the tool's standard output goes. Standard error is always shared
/// with this process.
#[derive(Debug, Clone, Copy)]
pub enum Output<'a> {
    Inherit,
    /// Copy every stdout line to our stdout and to the given log file.
    Tee(&'a Path),
}

pub trait SyncTool {
    /// Runs the tool to completion. A non-zero exit is an error.
    fn run(&self, args: &[String], output: Output<'_>) -> Result<(), RunError>;
}

#[derive(Debug, Clone)]
pub struct Rsync {
    program: String,
}

impl Rsync {
    pub fn new(program: impl Into<String>) -> Self {
        Rsync {
            program: program.into(),
        }
    }

    fn spawn_error(&self, source: std::io::Error) -> RunError {
        RunError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    fn run_tee(&self, command: &mut Command, log_path: &Path) -> Result<ExitStatus, RunError> {
        let log = File::create(log_path).map_err(|source| RunError::LogFile {
            path: log_path.to_path_buf(),
            source,
        })?;

        let mut child = command
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunError::Io(std::io::Error::other("child stdout not captured")))?;

        let copier = thread::spawn(move || tee_lines(stdout, log));

        let status = child.wait().map_err(RunError::Io)?;

        match copier.join() {
            Ok(Ok(())) => Ok(status),
            Ok(Err(source)) => Err(RunError::LogFile {
                path: log_path.to_path_buf(),
                source,
            }),
            Err(_) => Err(RunError::Io(std::io::Error::other(
                "output copier thread panicked",
            ))),
        }
    }
}

impl SyncTool for Rsync {
    fn run(&self, args: &[String], output: Output<'_>) -> Result<(), RunError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = match output {
            Output::Inherit => command
                .stdout(Stdio::inherit())
                .status()
                .map_err(|e| self.spawn_error(e))?,
            Output::Tee(log_path) => self.run_tee(&mut command, log_path)?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(RunError::Failed {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}

/// Copies raw lines (file names need not be UTF-8) until the pipe closes.
fn tee_lines(source: impl Read, mut log: File) -> std::io::Result<()> {
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();
    let stdout = std::io::stdout();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let mut console = stdout.lock();
        console.write_all(&line)?;
        console.flush()?;
        log.write_all(&line)?;
    }

    log.flush()
}

/// `$VISUAL`, then `$EDITOR`, then `vi`.
pub fn editor_program() -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_EDITOR.to_string())
}

/// Opens `path` in the operator's editor and waits for it to exit. The
/// editor setting may carry its own arguments, e.g. `code --wait`.
pub fn open_in_editor(path: &Path) -> Result<(), RunError> {
    let editor = editor_program();
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(FALLBACK_EDITOR).to_string();

    let status = Command::new(&program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|source| RunError::Spawn {
            program: program.clone(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(RunError::Failed {
            program,
            code: status.code(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_tee_writes_log_file() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("out.log");

        Rsync::new("echo")
            .run(&["-n".to_string(), "a/".to_string()], Output::Tee(&log))
            .unwrap();

        // -n suppresses the trailing newline.
        assert_eq!(fs::read_to_string(&log).unwrap(), "a/");
    }

    #[test]
    fn test_tee_copies_multiple_lines() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("out.log");

        Rsync::new("printf")
            .run(&["one\\ntwo\\n".to_string()], Output::Tee(&log))
            .unwrap();

        assert_eq!(fs::read_to_string(&log).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn test_tee_log_in_missing_directory() {
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("missing/out.log");

        let err = Rsync::new("true").run(&[], Output::Tee(&log)).unwrap_err();

        assert!(matches!(err, RunError::LogFile { .. }));
    }

    #[test]
    fn test_inherit_success() {
        Rsync::new("true").run(&[], Output::Inherit).unwrap();
    }

    #[test]
    fn test_non_zero_exit_is_error() {
        let err = Rsync::new("false").run(&[], Output::Inherit).unwrap_err();

        match &err {
            RunError::Failed { program, code } => {
                assert_eq!(program, "false");
                assert_eq!(*code, Some(1));
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
        assert!(err.to_string().contains("exit status 1"));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = Rsync::new("/nonexistent/rsync")
            .run(&[], Output::Inherit)
            .unwrap_err();

        assert!(matches!(err, RunError::Spawn { .. }));
    }
}

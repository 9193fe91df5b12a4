use assert_cmd::{Command, cargo::cargo_bin_cmd};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A home directory with rule files, a non-empty source and private marker
/// and log locations, so tests never touch the real `/tmp` defaults.
pub struct Workspace {
    temp: TempDir,
}

// Each integration test crate uses a different subset of these helpers.
#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let rules = temp.path().join("home/loadrc/bashrc");
        fs::create_dir_all(&rules).unwrap();
        fs::write(rules.join("mirror_exclude"), "# scratch files\n*.tmp\n").unwrap();

        let source = temp.path().join("source");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("file.txt"), "hello").unwrap();

        Workspace { temp }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.temp.path().join(rel)
    }

    pub fn home(&self) -> PathBuf {
        self.path("home")
    }

    pub fn marker(&self) -> PathBuf {
        self.path("marker")
    }

    pub fn log(&self) -> PathBuf {
        self.path("preview.log")
    }

    /// `echo` stands in for rsync and prints the arguments it was given.
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("folder-mirror");
        cmd.env("HOME", self.home())
            .env("FOLDER_MIRROR_MARKER", self.marker())
            .env("FOLDER_MIRROR_LOG", self.log())
            .env("FOLDER_MIRROR_RSYNC", "echo")
            .env_remove("FOLDER_MIRROR_CONFIG")
            .env_remove("FOLDER_MIRROR_MARKER_TIMEOUT")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Runs the tool on `source` and `target` inside the workspace.
    pub fn mirror(&self, source: &str, target: &str, extra: &[&str]) -> Command {
        let mut cmd = self.cmd();
        cmd.args(extra).arg(self.path(source)).arg(self.path(target));
        cmd
    }
}

// Not every integration test crate needs this.
#[allow(dead_code)]
pub fn slashed(path: &Path) -> String {
    format!("{}/", path.display())
}

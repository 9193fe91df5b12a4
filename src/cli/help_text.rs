pub(super) const ROOT_LONG_ABOUT: &str = "\
Mirror one directory onto another with rsync, guarded by a dry run

folder-mirror makes TARGET_DIR an exact copy of SOURCE_DIR. Files missing from the
source are deleted from the target, so every real run must be preceded by a dry run
that you have reviewed.

TWO-STEP WORKFLOW:

  1. Preview what would change:
     $ folder-mirror --dry-run ~/photos /mnt/backup/photos

     rsync runs with -n -v. Its output is shown and saved to the log file
     (/tmp/folder_mirror.log by default), and a confirmation marker recording the
     current time is written (/tmp/folder_mirror_marker by default).

  2. Apply the mirror:
     $ folder-mirror ~/photos /mnt/backup/photos

     Refused unless the marker exists and is younger than the marker timeout
     (3600 seconds by default). The marker is removed after a successful run, so the
     next real run needs a new dry run.

SAFETY CHECKS:

  - SOURCE_DIR must exist and must not be empty.
  - SOURCE_DIR and TARGET_DIR must not be the same directory or nested inside each
    other, including through symlinks.
  - TARGET_DIR is created if it does not exist.
  - Remote paths (anything containing ':') cannot be checked locally and are refused.

RULE FILES:

  ~/loadrc/bashrc/mirror_exclude   required, passed as --exclude-from
  ~/loadrc/bashrc/mirror_include   optional, passed as --include-from

  One pattern per line. Blank lines and lines starting with '#' are ignored.

CONFIGURATION:

  Settings are taken from, in order of precedence: command line flags, environment
  variables (FOLDER_MIRROR_MARKER, FOLDER_MIRROR_MARKER_TIMEOUT, FOLDER_MIRROR_LOG,
  FOLDER_MIRROR_RSYNC), the config file, and built-in defaults.

  The config file is ~/.config/folder-mirror/config.toml unless --config or
  FOLDER_MIRROR_CONFIG names another one:

    marker_file = \"/var/tmp/folder_mirror_marker\"
    marker_timeout_secs = 1800
    log_file = \"/var/tmp/folder_mirror.log\"
    rsync_path = \"/usr/local/bin/rsync\"
    rules_dir = \"/etc/folder-mirror\"

EXIT STATUS:

  0 on success, 1 on any failure. Printing this help also exits with 1.
";

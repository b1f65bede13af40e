//! Shared helpers for integration tests: a scripted stand-in for pandoc.
//!
//! The fake converter accepts the same `-i/-f/-o/-t` arguments as pandoc and
//! picks its behaviour from the first line of the input file:
//!
//! | First line        | Behaviour                                             |
//! |-------------------|-------------------------------------------------------|
//! | `FAIL`            | one line on stdout, one on stderr, exit 3             |
//! | `SLEEP <pidfile>` | write its pid to `<pidfile>`, then `exec sleep 30`    |
//! | `SPAWN <pidfile>` | start a background `sleep 30`, record its pid, wait   |
//! | `NOOUT`           | exit 0 without writing the output file                |
//! | `PATH`            | write its own `$PATH` to the output file              |
//! | anything else     | write `<from>-><to>\n` followed by the input verbatim |

#![allow(dead_code)]

use once_cell::sync::Lazy;
use pandoc_converter::ConverterConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

const FAKE_PANDOC: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    -i) in="$2"; shift 2 ;;
    -f) from="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    -t) to="$2"; shift 2 ;;
    *) echo "fake-pandoc: unexpected argument $1" >&2; exit 2 ;;
  esac
done
read -r cmd arg < "$in"
case "$cmd" in
  FAIL)
    echo "fake-pandoc: reading $from"
    echo "fake-pandoc: cannot write $to" >&2
    exit 3 ;;
  SLEEP)
    echo $$ > "$arg"
    exec sleep 30 ;;
  SPAWN)
    sleep 30 &
    echo $! > "$arg"
    wait
    exit 0 ;;
  NOOUT)
    exit 0 ;;
  PATH)
    printf '%s' "$PATH" > "$out"
    exit 0 ;;
esac
printf '%s->%s\n' "$from" "$to" > "$out"
cat "$in" >> "$out"
"#;

/// Written once per test binary, before any test can spawn it, so no child
/// ever inherits an open write handle to the script.
static FAKE_DIR: Lazy<TempDir> = Lazy::new(|| {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::Builder::new()
        .prefix("fake-pandoc-")
        .tempdir()
        .expect("create fake converter dir");
    let script = dir.path().join("pandoc");
    std::fs::write(&script, FAKE_PANDOC).expect("write fake converter");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
        .expect("chmod fake converter");
    dir
});

pub fn fake_pandoc() -> PathBuf {
    FAKE_DIR.path().join("pandoc")
}

/// Route library logs through the test harness; `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Config pointing at the fake converter with workspaces under `scratch`.
pub fn fake_config(scratch: &Path) -> ConverterConfig {
    init_tracing();
    ConverterConfig::builder()
        .pandoc_path(fake_pandoc())
        .scratch_root(scratch)
        .build()
        .expect("fake config")
}

pub fn fake_config_with_timeout(scratch: &Path, timeout: Duration) -> ConverterConfig {
    init_tracing();
    ConverterConfig::builder()
        .pandoc_path(fake_pandoc())
        .scratch_root(scratch)
        .timeout(timeout)
        .build()
        .expect("fake config")
}

/// Entries left under a scratch root.
pub fn leftovers(scratch: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(scratch)
        .expect("read scratch root")
        .map(|e| e.expect("dir entry").path())
        .collect()
}

/// Poll until `scratch` is empty or two seconds pass.
pub async fn wait_until_empty(scratch: &Path) -> Vec<PathBuf> {
    for _ in 0..40 {
        let left = leftovers(scratch);
        if left.is_empty() {
            return left;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    leftovers(scratch)
}

/// Read the pid the fake converter recorded, waiting for it to appear.
pub async fn read_pid(pidfile: &Path) -> u32 {
    for _ in 0..100 {
        if let Ok(text) = std::fs::read_to_string(pidfile) {
            if let Ok(pid) = text.trim().parse() {
                return pid;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("fake converter never wrote {}", pidfile.display());
}

/// True while `pid` is alive and not a zombie.
#[cfg(target_os = "linux")]
pub fn process_is_running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        // Field 3 is the state; the command name before it may contain spaces.
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .map(|state| state != "Z" && state != "X")
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Poll until `pid` is gone or two seconds pass.
#[cfg(target_os = "linux")]
pub async fn wait_for_exit(pid: u32) -> bool {
    for _ in 0..40 {
        if !process_is_running(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

//! E2E tests for the `retention` binary: dry runs, deletion, archiving,
//! configuration, and exit codes.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::TempDir;

const AS_OF: &str = "2025-06-30T12:00:00";

fn retention_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("retention"));
    cmd.current_dir(cwd);
    cmd.env("PAGEKEEP_LOG", "error");
    cmd.env_remove("PAGEKEEP_CONFIG");
    cmd.env_remove("FORMAT");
    cmd.args(["--as-of", AS_OF]);
    cmd
}

/// Workspace with a `data/` tree of artifacts.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("data/nested")).expect("mkdir");
        Self { dir }
    }

    fn cwd(&self) -> &Path {
        self.dir.path()
    }

    fn data(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn touch(&self, rel: &str) -> PathBuf {
        let path = self.data().join(rel);
        fs::write(&path, rel.as_bytes()).expect("write artifact");
        path
    }

    /// Two runs on the same day, one old monthly pair, and a stray file.
    fn populate(&self) {
        self.touch("site-mobile-2025-06-30-090000.json");
        self.touch("site-mobile-2025-06-30-100000.json");
        self.touch("nested/site-desktop-2025-06-29-080000.json");
        self.touch("nested/site-desktop-2025-06-29-090000.json");
        self.touch("site-mobile-2024-01-10-090000.json");
        self.touch("site-mobile-2024-01-20-090000.json");
        self.touch("readme.txt");
    }

    fn run_json(&self, extra: &[&str]) -> Value {
        let output = retention_cmd(self.cwd())
            .arg("data")
            .args(extra)
            .arg("--json")
            .output()
            .expect("retention should not crash");
        assert!(
            output.status.success(),
            "retention failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("valid JSON")
    }
}

fn mtimes(root: &Path) -> Vec<(PathBuf, SystemTime)> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir).expect("read_dir") {
            let path = entry.expect("entry").path();
            if path.is_dir() {
                stack.push(path);
            } else {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .expect("mtime");
                out.push((path, modified));
            }
        }
    }
    out.sort();
    out
}

fn pruned_paths(report: &Value) -> Vec<String> {
    report["prune"]["files"]
        .as_array()
        .expect("files array")
        .iter()
        .map(|f| f["path"].as_str().expect("path").to_string())
        .collect()
}

#[test]
fn dry_run_changes_nothing_and_matches_real_run() {
    let fx = Fixture::new();
    fx.populate();
    let before = mtimes(&fx.data());

    let dry = fx.run_json(&["--dry-run"]);
    assert_eq!(mtimes(&fx.data()), before);
    assert_eq!(dry["dry_run"], true);
    for file in dry["prune"]["files"].as_array().expect("files") {
        assert_eq!(file["status"], "dry_run_reported");
    }

    let real = fx.run_json(&[]);
    assert_eq!(pruned_paths(&dry), pruned_paths(&real));
}

#[test]
fn delete_keeps_latest_per_day_and_one_per_month() {
    let fx = Fixture::new();
    fx.populate();

    let report = fx.run_json(&[]);
    assert_eq!(report["artifacts"], 6);
    assert_eq!(report["kept"], 3);

    let data = fx.data();
    assert!(data.join("site-mobile-2025-06-30-100000.json").exists());
    assert!(!data.join("site-mobile-2025-06-30-090000.json").exists());
    assert!(data.join("nested/site-desktop-2025-06-29-090000.json").exists());
    assert!(!data.join("nested/site-desktop-2025-06-29-080000.json").exists());
    assert!(data.join("site-mobile-2024-01-20-090000.json").exists());
    assert!(!data.join("site-mobile-2024-01-10-090000.json").exists());
    assert!(data.join("readme.txt").exists());
}

#[test]
fn second_run_is_a_no_op() {
    let fx = Fixture::new();
    fx.populate();
    fx.run_json(&[]);

    let second = fx.run_json(&[]);
    assert!(pruned_paths(&second).is_empty());
    assert_eq!(second["kept"], 3);
}

#[test]
fn unknown_files_are_never_listed() {
    let fx = Fixture::new();
    fx.populate();
    fx.touch("notes-2025-06-30.json");

    let report = fx.run_json(&["--dry-run"]);
    assert!(
        pruned_paths(&report)
            .iter()
            .all(|p| !p.ends_with("readme.txt") && !p.ends_with("notes-2025-06-30.json"))
    );
    assert_eq!(report["skipped_files"], 2);
}

#[test]
fn archive_moves_pruned_files_into_zip() {
    let fx = Fixture::new();
    fx.populate();

    let report = fx.run_json(&["--archive", "old.zip"]);
    let archive_path = fx.cwd().join("old.zip");
    let mut archive =
        zip::ZipArchive::new(fs::File::open(&archive_path).expect("archive exists")).expect("zip");
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(
        names,
        [
            "site-desktop-2025-06-29-080000.json",
            "site-mobile-2024-01-10-090000.json",
            "site-mobile-2025-06-30-090000.json",
        ]
    );

    let mut entry = archive
        .by_name("site-mobile-2025-06-30-090000.json")
        .expect("entry");
    let mut body = String::new();
    std::io::Read::read_to_string(&mut entry, &mut body).expect("read entry");
    assert_eq!(body, "site-mobile-2025-06-30-090000.json");

    assert!(!fx.data().join("site-mobile-2025-06-30-090000.json").exists());
    for file in report["prune"]["files"].as_array().expect("files") {
        assert_eq!(file["status"], "archived_and_removed");
    }
}

fn archive_entry(archive_path: &Path, name: &str) -> String {
    let mut archive =
        zip::ZipArchive::new(fs::File::open(archive_path).expect("archive")).expect("zip");
    let mut entry = archive.by_name(name).expect("entry");
    let mut body = String::new();
    std::io::Read::read_to_string(&mut entry, &mut body).expect("read entry");
    body
}

#[test]
fn archive_collision_replaces_the_entry() {
    let fx = Fixture::new();
    fx.populate();

    let archive_path = fx.cwd().join("old.zip");
    {
        let mut writer = zip::ZipWriter::new(fs::File::create(&archive_path).expect("create"));
        writer
            .start_file(
                "site-mobile-2025-06-30-090000.json",
                zip::write::SimpleFileOptions::default(),
            )
            .expect("start entry");
        writer.write_all(b"earlier run").expect("write entry");
        writer.finish().expect("finish");
    }

    let report = fx.run_json(&["--archive", "old.zip"]);

    assert!(!fx.data().join("site-mobile-2025-06-30-090000.json").exists());
    assert!(!fx.data().join("nested/site-desktop-2025-06-29-080000.json").exists());
    assert!(!fx.data().join("site-mobile-2024-01-10-090000.json").exists());
    for file in report["prune"]["files"].as_array().expect("files") {
        assert_eq!(file["status"], "archived_and_removed");
    }

    let archive =
        zip::ZipArchive::new(fs::File::open(&archive_path).expect("archive")).expect("zip");
    assert_eq!(archive.len(), 3);
    assert_eq!(
        archive_entry(&archive_path, "site-mobile-2025-06-30-090000.json"),
        "site-mobile-2025-06-30-090000.json"
    );
}

#[test]
fn same_basename_in_several_directories_converges_in_one_run() {
    let fx = Fixture::new();
    for sub in ["a", "b", "c"] {
        fs::create_dir_all(fx.data().join(sub)).expect("mkdir");
        fx.touch(&format!("{sub}/s-mobile-2024-01-10-090000.json"));
    }

    let report = fx.run_json(&["--archive", "old.zip"]);
    assert_eq!(report["kept"], 1);
    for file in report["prune"]["files"].as_array().expect("files") {
        assert_eq!(file["status"], "archived_and_removed");
    }

    assert!(!fx.data().join("a/s-mobile-2024-01-10-090000.json").exists());
    assert!(!fx.data().join("b/s-mobile-2024-01-10-090000.json").exists());
    assert!(fx.data().join("c/s-mobile-2024-01-10-090000.json").exists());
    assert_eq!(
        archive_entry(&fx.cwd().join("old.zip"), "s-mobile-2024-01-10-090000.json"),
        "b/s-mobile-2024-01-10-090000.json"
    );

    let again = fx.run_json(&["--archive", "old.zip"]);
    assert!(pruned_paths(&again).is_empty());
}

#[test]
fn unreadable_archive_fails_each_file_with_its_code() {
    let fx = Fixture::new();
    fx.populate();
    fs::write(fx.cwd().join("old.zip"), b"not a zip at all").expect("write");

    let report = fx.run_json(&["--archive", "old.zip"]);

    let files = report["prune"]["files"].as_array().expect("files");
    assert_eq!(files.len(), 3);
    for file in files {
        assert_eq!(file["status"], "failed");
        assert_eq!(file["code"], "E3001");
    }
    assert!(fx.data().join("site-mobile-2024-01-10-090000.json").exists());
}

#[test]
fn missing_directory_exits_two() {
    let fx = Fixture::new();
    retention_cmd(fx.cwd())
        .arg("does-not-exist")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("E2001"));
}

#[test]
fn text_summary_is_the_default_when_piped() {
    let fx = Fixture::new();
    fx.populate();
    retention_cmd(fx.cwd())
        .args(["data", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "artifacts=6 kept=3 pruned=3 missing=0 failed=0 dry_run=true",
        ));
}

#[test]
fn config_file_in_working_directory_is_used() {
    let fx = Fixture::new();
    // Two slugs share ISO week 25, the third file is in week 26.
    fx.touch("a-mobile-2025-06-16-090000.json");
    fx.touch("b-mobile-2025-06-17-090000.json");
    fx.touch("a-mobile-2025-06-23-090000.json");
    fs::write(
        fx.cwd().join("pagekeep.toml"),
        "[retention]\nrecent_days = 1\nweekly_cutoff_days = 30\n",
    )
    .expect("write config");

    let report = fx.run_json(&["--dry-run"]);
    assert_eq!(report["kept"], 2);
    assert!(pruned_paths(&report)[0].ends_with("a-mobile-2025-06-16-090000.json"));

    fs::write(
        fx.cwd().join("pagekeep.toml"),
        "[retention]\nrecent_days = 1\nweekly_cutoff_days = 30\nbucket_scope = \"per-series\"\n",
    )
    .expect("write config");
    let report = fx.run_json(&["--dry-run"]);
    assert_eq!(report["kept"], 3);
}

#[test]
fn explicit_missing_config_fails() {
    let fx = Fixture::new();
    retention_cmd(fx.cwd())
        .args(["data", "--config", "nope.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn inverted_window_is_rejected() {
    let fx = Fixture::new();
    fs::write(
        fx.cwd().join("pagekeep.toml"),
        "[retention]\nrecent_days = 400\nweekly_cutoff_days = 365\n",
    )
    .expect("write config");
    retention_cmd(fx.cwd())
        .arg("data")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must not exceed weekly_cutoff_days"));
}

#[test]
fn decisions_are_appended_to_the_log_file() {
    let fx = Fixture::new();
    fx.populate();

    retention_cmd(fx.cwd())
        .env("PAGEKEEP_LOG", "info")
        .args(["data", "--log-file", "logs/run.log"])
        .assert()
        .success();
    retention_cmd(fx.cwd())
        .env("PAGEKEEP_LOG", "info")
        .args(["data", "--log-file", "logs/run.log"])
        .assert()
        .success();

    let log = fs::read_to_string(fx.cwd().join("logs/run.log")).expect("log file");
    assert_eq!(log.matches("starting pruning process").count(), 2);
    assert!(log.contains("no files to prune"));
    assert!(log.contains("INFO"));
    assert!(!log.contains("\u{1b}["), "log file must not contain ANSI codes");
}

#[test]
fn unwritable_log_file_falls_back_to_stderr() {
    let fx = Fixture::new();
    fx.populate();
    fs::create_dir(fx.cwd().join("taken")).expect("mkdir");

    retention_cmd(fx.cwd())
        .args(["data", "--log-file", "taken"])
        .assert()
        .success()
        .stderr(predicate::str::contains("cannot open log file"));
}

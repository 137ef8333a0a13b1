//! End-to-end tests for the command line interface.

use sql_snapshot::source::DuckDbSource;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn sql_snapshot_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sql-snapshot"))
}

fn create_db(dir: &Path, sql: &str) -> PathBuf {
    let path = dir.join("app.duckdb");
    let source = DuckDbSource::open(&path).unwrap();
    source.execute_batch(sql).unwrap();
    drop(source);
    path
}

const TRACKER: &str = r#"
CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR);
CREATE TABLE projects (id INTEGER PRIMARY KEY, owner_id INTEGER REFERENCES users(id));
CREATE TABLE issues (
    id INTEGER PRIMARY KEY,
    project_id INTEGER REFERENCES projects(id),
    title VARCHAR
);
INSERT INTO users VALUES (1, 'Alice'), (2, 'Bob');
INSERT INTO projects VALUES (10, 1);
INSERT INTO issues VALUES (100, 10, 'First issue');
"#;

#[test]
fn test_export_to_file_and_verify() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);
    let out = dir.path().join("snapshot.sql");

    let output = sql_snapshot_bin()
        .arg("export")
        .arg("--database")
        .arg(&db)
        .arg("-o")
        .arg(&out)
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("-- sql-snapshot format 1\n"));
    let users = text.find("-- Table: users").unwrap();
    let projects = text.find("-- Table: projects").unwrap();
    let issues = text.find("-- Table: issues").unwrap();
    assert!(users < projects && projects < issues);
    assert!(text.contains("(1, 'Alice'),\n(2, 'Bob');"));

    let output = sql_snapshot_bin()
        .arg("verify")
        .arg(&out)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("complete"));
}

#[test]
fn test_export_to_stdout() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);

    let output = sql_snapshot_bin()
        .args(["export", "--dialect", "sqlite", "--no-header", "--no-checksum"])
        .arg("--database")
        .arg(&db)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("PRAGMA foreign_keys = OFF;\n"));
    assert!(stdout.ends_with("PRAGMA foreign_keys = ON;\n"));
}

#[test]
fn test_export_compressed_into_directory() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);
    let backups = dir.path().join("backups");
    fs::create_dir(&backups).unwrap();

    let output = sql_snapshot_bin()
        .arg("export")
        .arg("--database")
        .arg(&db)
        .arg("-o")
        .arg(&backups)
        .args(["--compress", "gzip", "--json"])
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("{}: {}", e, stdout));
    assert_eq!(json["total_rows"], 4);
    assert_eq!(json["tables"].as_array().unwrap().len(), 3);

    let files: Vec<PathBuf> = fs::read_dir(&backups)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1, "{:?}", files);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("main-snapshot-"), "{}", name);
    assert!(name.ends_with(".sql.gz"), "{}", name);
    assert_eq!(json["output_file"], files[0].display().to_string());

    let output = sql_snapshot_bin()
        .args(["verify", "--json"])
        .arg(&files[0])
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "complete");
}

#[test]
fn test_empty_schema_writes_minimal_snapshot() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);
    let out = dir.path().join("out.sql");

    let output = sql_snapshot_bin()
        .arg("export")
        .arg("--database")
        .arg(&db)
        .args(["--schema", "does_not_exist"])
        .arg("-o")
        .arg(&out)
        .output()
        .expect("Failed to execute command");

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stderr).contains("No tables found"));

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("-- sql-snapshot format 1\n"));
    assert!(text.contains("SET FOREIGN_KEY_CHECKS = 0;"));
    assert!(!text.contains("-- Table:"));

    let output = sql_snapshot_bin()
        .arg("verify")
        .arg(&out)
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("complete"));
}

#[test]
fn test_order_command() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);

    let output = sql_snapshot_bin()
        .arg("order")
        .arg("--database")
        .arg(&db)
        .arg("--json")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["schema"], "main");
    assert_eq!(
        json["order"],
        serde_json::json!(["users", "projects", "issues"])
    );

    let output = sql_snapshot_bin()
        .arg("order")
        .arg("--database")
        .arg(&db)
        .arg("--reverse")
        .output()
        .expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().map(str::trim).collect();
    assert_eq!(lines, vec!["1. issues", "2. projects", "3. users"]);
}

#[test]
fn test_order_check_and_exclude() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);

    let output = sql_snapshot_bin()
        .arg("order")
        .arg("--database")
        .arg(&db)
        .arg("--check")
        .output()
        .expect("Failed to execute command");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Check PASSED"));

    let output = sql_snapshot_bin()
        .arg("order")
        .arg("--database")
        .arg(&db)
        .args(["--exclude", "proj*"])
        .output()
        .expect("Failed to execute command");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("projects"));
    assert!(stdout.contains("issues"));
}

#[test]
fn test_export_with_config_file() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);
    let out = dir.path().join("from-config.sql");
    let config = dir.path().join("snapshot.yaml");
    fs::write(
        &config,
        format!(
            "database: {}\noutput: {}\ndialect: postgres\nschema_only: true\n",
            db.display(),
            out.display()
        ),
    )
    .unwrap();

    let output = sql_snapshot_bin()
        .args(["export", "--config"])
        .arg(&config)
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.contains("-- Dialect: postgres"));
    assert!(text.contains("SET session_replication_role = replica;"));
    assert!(!text.contains("INSERT INTO"));
}

#[test]
fn test_verify_detects_tampering_and_truncation() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);
    let out = dir.path().join("snapshot.sql");

    let status = sql_snapshot_bin()
        .arg("export")
        .arg("--database")
        .arg(&db)
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&out).unwrap();

    let tampered = dir.path().join("tampered.sql");
    fs::write(&tampered, text.replace("'Alice'", "'Mallory'")).unwrap();
    let output = sql_snapshot_bin().arg("verify").arg(&tampered).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("checksum mismatch"));

    let truncated = dir.path().join("truncated.sql");
    fs::write(&truncated, &text[..text.len() / 2]).unwrap();
    let output = sql_snapshot_bin().arg("verify").arg(&truncated).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("truncated"));
}

#[test]
fn test_verify_strict_rejects_unverified() {
    let dir = TempDir::new().unwrap();
    let db = create_db(dir.path(), TRACKER);
    let out = dir.path().join("snapshot.sql");

    let status = sql_snapshot_bin()
        .arg("export")
        .arg("--database")
        .arg(&db)
        .arg("-o")
        .arg(&out)
        .arg("--no-checksum")
        .status()
        .unwrap();
    assert!(status.success());

    let lenient = sql_snapshot_bin().arg("verify").arg(&out).status().unwrap();
    assert!(lenient.success());

    let strict = sql_snapshot_bin()
        .args(["verify", "--strict"])
        .arg(&out)
        .status()
        .unwrap();
    assert!(!strict.success());
}

#[test]
fn test_missing_database_fails() {
    let dir = TempDir::new().unwrap();
    let output = sql_snapshot_bin()
        .arg("export")
        .arg("--database")
        .arg(dir.path().join("nope.duckdb"))
        .output()
        .expect("Failed to execute command");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn rrag_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rrag"))
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // A small project to analyze
    let project = root.join("project");
    write(
        &project,
        "app/main.py",
        "from app.routes import register\n\ndef main():\n    register()\n",
    );
    write(
        &project,
        "app/routes.py",
        "def register():\n    print('registering payment_webhook route')\n",
    );
    write(&project, "README.md", "# Demo\n");
    fs::write(project.join("logo.png"), [0x89u8, 0x50, 0x4e, 0x47]).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/rrag.sqlite"

[repos]
cache_dir = "{root}/data/repos"

[embedding]
provider = "hash"
dims = 512

[server]
bind = "127.0.0.1:7341"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("rrag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

/// Commit the demo project so it can be cloned via `file://`.
fn commit_project(root: &Path) -> String {
    let project = root.join("project");
    let git = |args: &[&str]| {
        let out = Command::new("git")
            .args(["-c", "user.name=test", "-c", "user.email=test@example.com"])
            .args(args)
            .current_dir(&project)
            .output()
            .unwrap();
        assert!(out.status.success(), "git {:?} failed: {}", args, String::from_utf8_lossy(&out.stderr));
    };
    git(&["init", "--quiet"]);
    git(&["add", "."]);
    git(&["commit", "--quiet", "-m", "initial"]);
    format!("file://{}", project.display())
}

fn run_rrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rrag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rrag(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/rrag.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_rrag(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_rrag(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_collections_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_rrag(&config_path, &["collections"]);
    assert!(success, "collections failed: {}", stderr);
    assert!(stdout.contains("No collections."));
}

#[test]
fn test_inspect_code_only() {
    let (tmp, config_path) = setup_test_env();
    let project = tmp.path().join("project");

    let (stdout, stderr, success) =
        run_rrag(&config_path, &["inspect", project.to_str().unwrap()]);
    assert!(success, "inspect failed: {}", stderr);
    assert!(stdout.contains("app/main.py"));
    assert!(stdout.contains("app/routes.py"));
    assert!(stdout.contains("README.md"));
    assert!(stdout.contains("3 files"));
    // The tree shows every entry, the file list only code.
    assert!(stdout.contains("└── logo.png") || stdout.contains("├── logo.png"));
}

#[test]
fn test_inspect_all_without_config() {
    let (tmp, _config_path) = setup_test_env();
    let project = tmp.path().join("project");
    let missing = tmp.path().join("nope.toml");

    let (stdout, stderr, success) =
        run_rrag(&missing, &["inspect", project.to_str().unwrap(), "--all"]);
    assert!(success, "inspect --all failed: {}", stderr);
    assert!(stdout.contains("4 files"));
}

#[test]
fn test_missing_config_errors() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_rrag(&tmp.path().join("nope.toml"), &["collections"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_ask_unknown_repository() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) =
        run_rrag(&config_path, &["ask", "0123456789ab", "What does this do?"]);
    assert!(success, "ask failed: {}", stderr);
    assert!(stdout.contains("has not been indexed"));
}

#[test]
fn test_analyze_then_ask() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }
    let (tmp, config_path) = setup_test_env();
    let url = commit_project(tmp.path());

    let (stdout, stderr, success) = run_rrag(&config_path, &["analyze", &url]);
    assert!(success, "analyze failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Files:      3"));
    assert!(stdout.contains("Chunks:     3"));
    // Generation is disabled, so the summary is the inline error.
    assert!(stdout.contains("[LLM error: generation provider is disabled]"));

    let (stdout, _, success) = run_rrag(&config_path, &["collections"]);
    assert!(success);
    assert!(stdout.contains("repo_"));
    assert!(stdout.contains("3 entries"));

    let (stdout, stderr, success) =
        run_rrag(&config_path, &["ask", &url, "Where is the payment_webhook route?"]);
    assert!(success, "ask failed: {}", stderr);
    assert!(stdout.contains("[LLM error: generation provider is disabled]"));
    assert!(stdout.contains("Sources:"));
    let first_source = stdout
        .lines()
        .skip_while(|l| !l.starts_with("Sources:"))
        .nth(1)
        .unwrap();
    assert!(first_source.contains("app/routes.py (chunk 0)"));
}

#[test]
fn test_analyze_bad_url_fails() {
    let (tmp, config_path) = setup_test_env();
    let bogus = format!("file://{}/does-not-exist", tmp.path().display());

    let (_, stderr, success) = run_rrag(&config_path, &["analyze", &bogus]);
    assert!(!success);
    assert!(stderr.contains("clone failed"));
}

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn run_nko(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_nko");
    let output = Command::new(binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("OPENROUTER_API_KEY")
        .env("BACKEND_URL", "http://127.0.0.1:9")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run nko binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_tools_list() {
    let tmp = TempDir::new().unwrap();
    let (stdout, _, success) = run_nko(&tmp.path().join("missing.toml"), &["tools", "list"]);
    assert!(success);
    for name in ["get_nko_list", "get_nko_by_id", "get_cities"] {
        assert!(stdout.contains(name), "missing {} in:\n{}", name, stdout);
    }
}

#[test]
fn test_ask_requires_provider_key() {
    let tmp = TempDir::new().unwrap();
    let (stdout, stderr, success) = run_nko(
        &tmp.path().join("missing.toml"),
        &["ask", "--query", "приюты в Казани"],
    );
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("OPENROUTER_API_KEY environment variable is required"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("nko.toml");
    std::fs::write(&path, "[query]\nmax_context_records = \"five\"\n").unwrap();

    let (_, stderr, success) = run_nko(&path, &["serve", "http"]);
    assert!(!success);
    assert!(stderr.contains("nko.toml"));
}

#[test]
fn test_fixture_backend_requires_readable_file() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_nko(
        &tmp.path().join("missing.toml"),
        &["serve", "backend", "--fixture", "/nonexistent/fixture.json"],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to read fixture"));
}

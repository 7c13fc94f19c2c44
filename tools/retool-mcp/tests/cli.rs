use anyhow::Result;
use assert_cmd::Command;
use serde_json::Value;

fn printed_tools(extra: &[&str]) -> Result<Vec<String>> {
    let config = tempfile::tempdir()?;
    let output = Command::cargo_bin("retool-mcp")?
        .env("APP_CONFIG_DIR", config.path())
        .env_remove("RETOOL_READ_ONLY")
        .arg("--print-tools")
        .args(extra)
        .output()?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let tools: Vec<Value> = serde_json::from_slice(&output.stdout)?;
    Ok(tools
        .iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str).map(str::to_string))
        .collect())
}

#[test]
fn print_tools_lists_catalogue() -> Result<()> {
    let names = printed_tools(&[])?;
    assert_eq!(names[0], "help");
    assert!(names.contains(&"create_group".to_string()));
    assert!(names.contains(&"list_audit_logs".to_string()));
    Ok(())
}

#[test]
fn print_tools_respects_read_only() -> Result<()> {
    let all = printed_tools(&[])?;
    let read_only = printed_tools(&["--read-only"])?;
    assert!(read_only.len() < all.len());
    assert!(!read_only.contains(&"delete_group".to_string()));
    Ok(())
}

#[test]
fn config_dir_flag_is_honoured() -> Result<()> {
    let config = tempfile::tempdir()?;
    std::fs::write(config.path().join("default.toml"), "read_only = true\n")?;
    let output = Command::cargo_bin("retool-mcp")?
        .env_remove("RETOOL_READ_ONLY")
        .arg("--config-dir")
        .arg(config.path())
        .arg("--print-tools")
        .output()?;
    assert!(output.status.success());
    let tools: Vec<Value> = serde_json::from_slice(&output.stdout)?;
    assert!(
        tools
            .iter()
            .all(|t| t.get("name").and_then(Value::as_str) != Some("create_user"))
    );
    Ok(())
}

#[test]
fn malformed_config_fails_fast() -> Result<()> {
    let config = tempfile::tempdir()?;
    std::fs::write(config.path().join("default.toml"), "base_url = [\n")?;
    Command::cargo_bin("retool-mcp")?
        .env("APP_CONFIG_DIR", config.path())
        .arg("--print-tools")
        .assert()
        .failure();
    Ok(())
}

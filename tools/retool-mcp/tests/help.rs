mod support;

use anyhow::Result;
use serde_json::{Value, json};
use support::payload;

#[tokio::test]
async fn help_returns_structured_jsonl() -> Result<()> {
    let server = support::start(&[], &[]).await?;
    let help = server.call("help", json!({})).await?;

    let body = payload(&help);
    assert_eq!(body.get("format").and_then(Value::as_str), Some("jsonl"));
    let lines = body
        .get("lines")
        .and_then(Value::as_array)
        .cloned()
        .expect("jsonl lines");

    let entries: Vec<Value> = lines
        .iter()
        .map(|line| serde_json::from_str(line.as_str().expect("line string")))
        .collect::<Result<_, _>>()?;
    assert_eq!(entries[0]["section"], "summary");
    assert_eq!(entries[0]["read_only"], false);
    let tool_lines = entries.iter().filter(|e| e["section"] == "tool").count();
    assert_eq!(tool_lines, entries[0]["tools"].as_u64().unwrap_or_default() as usize);
    assert!(entries.iter().any(|e| e["section"] == "envelope"));

    server.service.cancel().await?;
    Ok(())
}

#[tokio::test]
async fn remote_tools_report_missing_configuration() -> Result<()> {
    let server = support::start(&[], &[]).await?;

    let names = server.tool_names().await?;
    assert_eq!(names.first().map(String::as_str), Some("help"));
    assert!(names.iter().any(|n| n == "list_audit_logs"));

    let result = server.call("list_apps", json!({})).await?;
    assert!(result.is_error.unwrap_or(false));
    let body = payload(&result);
    assert_eq!(body["code"], "NOT_CONFIGURED");
    assert!(body["error"].as_str().unwrap_or_default().contains("RETOOL_BASE_URL"));

    let result = server.call("no_such_tool", json!({})).await?;
    assert_eq!(payload(&result)["code"], "UNKNOWN_TOOL");

    server.service.cancel().await?;
    Ok(())
}

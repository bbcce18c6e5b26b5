//! Show repository status.

use anyhow::Result;
use markit_sync_client::{OpResult, RepoClient, RepoStatus, Transport};
use serde_json::{json, Value};
use std::path::Path;

use super::{http_client, load_remote, mock_client, short_sha};

/// Run the status command.
pub async fn run(data_dir: &Path, as_json: bool, use_mock: bool) -> Result<()> {
    let config = load_remote(data_dir).await?;
    let status = if use_mock {
        fetch(&mock_client(config)).await?
    } else {
        fetch(&http_client(config)?).await?
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&to_json(&status))?);
    } else {
        print!("{}", render(&status));
    }
    Ok(())
}

async fn fetch<T: Transport>(client: &RepoClient<T>) -> Result<RepoStatus> {
    Ok(client.get_status().await?.data)
}

/// JSON view of a status: each part is either `{"ok": ...}` or `{"error": ...}`.
fn to_json(status: &RepoStatus) -> Value {
    fn part(result: &OpResult<Value>) -> Value {
        match result {
            Ok(success) => json!({ "ok": success.data }),
            Err(failure) => json!({ "error": failure.to_string() }),
        }
    }
    json!({
        "repo_info": part(&status.repo_info),
        "branches": part(&status.branches),
        "commits": part(&status.commits),
    })
}

/// Human-readable status report.
fn render(status: &RepoStatus) -> String {
    let mut out = String::from("=== markit-sync status ===\n\n");

    match &status.repo_info {
        Ok(info) => {
            let data = &info.data;
            out.push_str("Repository:\n");
            out.push_str(&format!("  Name:     {}\n", text(&data["full_name"])));
            out.push_str(&format!("  Default:  {}\n", text(&data["default_branch"])));
            out.push_str(&format!(
                "  Private:  {}\n",
                data["private"].as_bool().unwrap_or(false)
            ));
        }
        Err(failure) => out.push_str(&format!("Repository: UNAVAILABLE ({failure})\n")),
    }
    out.push('\n');

    match &status.branches {
        Ok(branches) => {
            let names: Vec<&str> = branches
                .data
                .as_array()
                .map(|list| list.iter().map(|b| text(&b["name"])).collect())
                .unwrap_or_default();
            out.push_str(&format!("Branches ({}):\n", names.len()));
            for name in names {
                out.push_str(&format!("  {name}\n"));
            }
        }
        Err(failure) => out.push_str(&format!("Branches: UNAVAILABLE ({failure})\n")),
    }
    out.push('\n');

    match &status.commits {
        Ok(commits) => {
            let list = commits.data.as_array().cloned().unwrap_or_default();
            out.push_str(&format!("Recent commits ({}):\n", list.len()));
            for commit in &list {
                let sha = text(&commit["sha"]);
                let message = text(&commit["commit"]["message"]);
                let summary = message.lines().next().unwrap_or_default();
                out.push_str(&format!("  {}  {}\n", short_sha(sha), summary));
            }
        }
        Err(failure) => out.push_str(&format!("Recent commits: UNAVAILABLE ({failure})\n")),
    }
    out
}

fn text(value: &Value) -> &str {
    value.as_str().unwrap_or("-")
}

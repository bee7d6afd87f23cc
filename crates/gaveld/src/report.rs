//! Moderator-call reports: when a client calls a moderator, the area's event
//! buffer is dumped to a timestamped file so the call can be reviewed later.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

pub fn write_report(dir: &Path, area_name: &str, lines: &[String]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!("report-{}-{stamp}.log", sanitize(area_name)));

    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    for line in lines {
        writeln!(f, "{line}")?;
    }
    Ok(path)
}

fn sanitize(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        if out.len() >= 40 {
            break;
        }
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            out.push(c);
        }
    }
    if out.is_empty() {
        out.push_str("area");
    }
    out
}

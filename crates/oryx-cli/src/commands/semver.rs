//! `oryx semver` command implementation.
//!
//! Line-oriented range evaluator so non-Rust tooling can reuse the npm
//! range semantics without reimplementing them. Reads queries from stdin,
//! answers one line per query, and keeps going on bad input.

use miette::{IntoDiagnostic, Result};
use oryx_core::version::{max_satisfying, satisfies};
use std::io::{self, BufRead, Write};

/// Run the evaluator loop until stdin reaches EOF.
pub fn run() -> Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = line.into_diagnostic()?;
        if let Some(reply) = eval_line(&line) {
            writeln!(out, "{reply}").into_diagnostic()?;
            out.flush().into_diagnostic()?;
        }
    }

    Ok(())
}

/// Evaluate one query line. Blank lines produce no reply; everything else
/// produces exactly one line, with failures reported as `error: ...` so
/// the caller's read loop stays in sync.
///
/// `satisfies <version> <range>` takes the range as the rest of the line,
/// so spaced ranges like `>=1.0.0 <2.0.0` work. `max-satisfying` puts the
/// range first, so there it must be a single token.
fn eval_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut parts = trimmed.split_whitespace();
    let reply = match parts.next()? {
        "satisfies" => {
            let Some(version) = parts.next() else {
                return Some("error: usage: satisfies <version> <range>".to_string());
            };
            let range = parts.collect::<Vec<_>>().join(" ");
            if range.is_empty() {
                return Some("error: usage: satisfies <version> <range>".to_string());
            }
            match satisfies(version, &range) {
                Ok(true) => "true".to_string(),
                Ok(false) => "false".to_string(),
                Err(e) => format!("error: {e}"),
            }
        }
        "max-satisfying" => {
            let Some(range) = parts.next() else {
                return Some("error: usage: max-satisfying <range> <version>...".to_string());
            };
            match max_satisfying(parts, range) {
                Ok(Some(winner)) => winner.to_string(),
                Ok(None) => "null".to_string(),
                Err(e) => format!("error: {e}"),
            }
        }
        other => format!("error: unknown command '{other}'"),
    };

    Some(reply)
}

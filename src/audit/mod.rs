//! Source audit for raw statement escape hatches.
//!
//! Walks a source tree and reports every call that bypasses the query
//! builder (`.raw(`, `.extra(`, `.execute_raw(`, `.query_raw(`), so each one
//! can be reviewed or moved behind the statement guard.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};
use serde::Serialize;

const RAW_CALL: &str = r"\.(raw|extra|execute_raw|query_raw)\s*\(";

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["target", "node_modules", "__pycache__"];

/// One raw statement call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub path: PathBuf,
    pub line: usize,
    pub text: String,
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}  ->  {}", self.path.display(), self.line, self.text)
    }
}

/// Scans files with the given extensions for raw statement calls.
#[derive(Debug, Clone)]
pub struct RawSqlFinder {
    pattern: Regex,
    extensions: Vec<String>,
}

impl RawSqlFinder {
    pub fn new<I, S>(extensions: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            pattern: RegexBuilder::new(RAW_CALL).case_insensitive(true).build()?,
            extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_string())
                .collect(),
        })
    }

    /// Whether a single line contains a raw statement call.
    pub fn is_raw_call(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|want| want == e))
            .unwrap_or(false)
    }

    /// Findings in one file. Non-UTF-8 files are read lossily.
    pub fn scan_file(&self, path: &Path) -> io::Result<Vec<Finding>> {
        let bytes = fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes);

        Ok(content
            .lines()
            .enumerate()
            .filter(|(_, line)| self.is_raw_call(line))
            .map(|(i, line)| Finding {
                path: path.to_path_buf(),
                line: i + 1,
                text: line.trim().to_string(),
            })
            .collect())
    }

    /// Findings in every matching file under `root`, sorted by path and line.
    pub fn scan_tree(&self, root: &Path) -> io::Result<Vec<Finding>> {
        let mut findings = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                let file_type = entry.file_type()?;

                if file_type.is_dir() {
                    if !is_skipped(&path) {
                        pending.push(path);
                    }
                } else if file_type.is_file() && self.wants(&path) {
                    findings.extend(self.scan_file(&path)?);
                }
            }
        }

        findings.sort_by(|a, b| a.path.cmp(&b.path).then(a.line.cmp(&b.line)));
        Ok(findings)
    }
}

fn is_skipped(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') || SKIPPED_DIRS.contains(&n))
        .unwrap_or(false)
}

//! Loading report files. Each document is decoded and parsed on its own blocking
//! task; the batch is joined, concatenated and sorted by date.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::model::TestReport;
use crate::{decode, pipeline};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Xml,
    Json,
}

impl InputFormat {
    /// `.xml`/`.atxml` are ATX markup, `.json` an order-preserving node dump.
    /// Any other extension is not a report file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xml" | "atxml" => Some(Self::Xml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Whether a path looks like an ATX report file.
pub fn is_report_file(path: &Path) -> bool {
    InputFormat::from_path(path).is_some()
}

/// Decode and parse one document. Decoding failures yield zero reports.
///
/// Panics are not caught here; [`load_files`] isolates them per file.
pub fn parse_document(text: &str, format: InputFormat) -> Vec<TestReport> {
    let decoded = match format {
        InputFormat::Xml => decode::from_xml(text),
        InputFormat::Json => decode::from_json(text),
    };
    match decoded {
        Ok(nodes) => pipeline::parse_reports(&nodes),
        Err(e) => {
            warn!(error = %e, "document could not be decoded");
            vec![]
        }
    }
}

/// Read and parse one file.
pub fn load_file(path: &Path) -> anyhow::Result<Vec<TestReport>> {
    let Some(format) = InputFormat::from_path(path) else {
        anyhow::bail!("{} is not an ATX report file", path.display());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let reports = parse_document(&text, format);
    debug!(path = %path.display(), reports = reports.len(), "file parsed");
    Ok(reports)
}

/// Drop non-report files and duplicates, keeping first-seen order.
pub fn select_report_files(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut selected: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if !is_report_file(&path) {
            warn!(path = %path.display(), "not an ATX report file, ignored");
        } else if !selected.contains(&path) {
            selected.push(path);
        }
    }
    selected
}

/// Load every file concurrently and return all reports sorted by date.
///
/// A file that cannot be read or parsed contributes nothing; the rest of the batch
/// is unaffected.
pub async fn load_files(paths: Vec<PathBuf>) -> Vec<TestReport> {
    let paths = select_report_files(paths);
    let tasks = paths.into_iter().map(|path| {
        tokio::task::spawn_blocking(move || {
            let res = load_file(&path);
            (path, res)
        })
    });

    let mut reports = Vec::new();
    for joined in join_all(tasks).await {
        match joined {
            Ok((_, Ok(found))) => reports.extend(found),
            Ok((path, Err(e))) => warn!(path = %path.display(), error = %e, "file skipped"),
            Err(e) => warn!(error = %e, "parse task failed, file skipped"),
        }
    }

    pipeline::sort_by_date(&mut reports);
    info!(reports = reports.len(), "reports loaded");
    reports
}

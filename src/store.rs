use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::TestReport;

/// A named reference set. Reports live in their own records so listing
/// references never loads report trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: u64,
    pub name: String,
    pub report_ids: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: u64,
    pub report: TestReport,
}

/// Base directory for the store: `~/.atx-viewer`
pub fn store_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".atx-viewer")
}

// ── ReferenceStore ──────────────────────────────────────────────────────────

/// JSON-file store: `<base>/references/<id>.json` and `<base>/reports/<id>.json`.
pub struct ReferenceStore {
    base: PathBuf,
}

impl Default for ReferenceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self { base: store_dir() }
    }

    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    fn references_dir(&self) -> PathBuf {
        self.base.join("references")
    }

    fn reports_dir(&self) -> PathBuf {
        self.base.join("reports")
    }

    /// Store `reports` as a new reference set. Returns `None` for an empty set.
    pub fn add_reference(&self, name: &str, reports: &[TestReport]) -> anyhow::Result<Option<u64>> {
        if reports.is_empty() {
            return Ok(None);
        }
        if self.list()?.iter().any(|r| r.name == name) {
            anyhow::bail!("Reference '{}' already exists", name);
        }

        let reports_dir = self.reports_dir();
        fs::create_dir_all(&reports_dir)?;
        let mut report_id = next_id(&reports_dir)?;
        let mut report_ids = Vec::with_capacity(reports.len());
        for report in reports {
            let record = StoredReport {
                id: report_id,
                report: report.clone(),
            };
            write_json(&reports_dir.join(format!("{report_id}.json")), &record)?;
            report_ids.push(report_id);
            report_id += 1;
        }

        let references_dir = self.references_dir();
        fs::create_dir_all(&references_dir)?;
        let id = next_id(&references_dir)?;
        let reference = Reference {
            id,
            name: name.to_string(),
            report_ids,
        };
        write_json(&references_dir.join(format!("{id}.json")), &reference)?;
        info!(id = id, name = %name, reports = reference.report_ids.len(), "reference added");
        Ok(Some(id))
    }

    /// All references, ordered by id.
    pub fn list(&self) -> anyhow::Result<Vec<Reference>> {
        let mut references: Vec<Reference> = read_records(&self.references_dir())?;
        references.sort_by_key(|r| r.id);
        Ok(references)
    }

    pub fn find(&self, name: &str) -> anyhow::Result<Reference> {
        self.list()?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| anyhow::anyhow!("Reference '{}' not found", name))
    }

    /// The reports of a reference, in the order they were saved.
    pub fn load_reports(&self, reference: &Reference) -> anyhow::Result<Vec<TestReport>> {
        let dir = self.reports_dir();
        reference
            .report_ids
            .iter()
            .map(|id| {
                let record: StoredReport = read_json(&dir.join(format!("{id}.json")))?;
                Ok(record.report)
            })
            .collect()
    }

    /// Delete a reference and its report records.
    pub fn delete(&self, name: &str) -> anyhow::Result<()> {
        let reference = self.find(name)?;
        let reports_dir = self.reports_dir();
        for id in &reference.report_ids {
            let path = reports_dir.join(format!("{id}.json"));
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        fs::remove_file(self.references_dir().join(format!("{}.json", reference.id)))?;
        info!(id = reference.id, name = %name, "reference deleted");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn write_json<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let json = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
    Ok(serde_json::from_str(&json)?)
}

fn read_records<T: DeserializeOwned>(dir: &Path) -> anyhow::Result<Vec<T>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut records = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            records.push(read_json(&path)?);
        }
    }
    Ok(records)
}

/// One past the highest numeric record id in `dir`, starting at 1.
fn next_id(dir: &Path) -> anyhow::Result<u64> {
    let mut max: u64 = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if let Some(id) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        {
            max = max.max(id);
        }
    }
    Ok(max + 1)
}

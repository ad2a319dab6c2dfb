use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verdict::{self, Verdict};

/// One parsed (execution plan, test spec) pair from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    /// From `ADMIN-DATA/DOC-REVISIONS/DOC-REVISION/DATE` of the test spec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Synthetic top-level folder with an empty short name.
    pub root: TestCaseFolder,
    pub plan: PlannedTestCaseFolder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseFolder {
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    pub test_cases: Vec<TestCaseNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TestCaseNode {
    Case(TestCase),
    Folder(TestCaseFolder),
}

impl TestCaseNode {
    pub fn short_name(&self) -> &str {
        match self {
            Self::Case(tc) => &tc.short_name,
            Self::Folder(f) => &f.short_name,
        }
    }
}

/// A single `TEST-CASE` execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_in_sec: Option<f64>,
    pub verdict: Verdict,
    /// Identifier of the planned test case this execution belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_ref: Option<String>,
    #[serde(default)]
    pub steps: Vec<TestStep>,
    #[serde(default)]
    pub test_arguments: Vec<Argument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test_constants: Vec<TestConstant>,
}

impl TestCase {
    pub fn new(short_name: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            short_name: short_name.into(),
            long_name: None,
            desc: None,
            date: None,
            execution_time_in_sec: None,
            verdict,
            origin_ref: None,
            steps: vec![],
            test_arguments: vec![],
            test_constants: vec![],
        }
    }

    pub fn display_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.short_name)
    }

    pub fn constant(&self, name: &str) -> Option<&str> {
        self.test_constants
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Step,
    Folder,
}

/// A `TEST-STEP` or `TEST-STEP-FOLDER`. Leaf steps have no children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestStep {
    pub kind: StepKind,
    pub short_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(default)]
    pub steps: Vec<TestStep>,
}

impl TestStep {
    pub fn display_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.short_name)
    }

    /// The authored verdict, or else the most severe verdict found on any descendant.
    pub fn effective_verdict(&self) -> Option<Verdict> {
        if let Some(v) = &self.verdict {
            return Some(v.clone());
        }
        fn collect<'a>(steps: &'a [TestStep], out: &mut Vec<&'a Verdict>) {
            for step in steps {
                if let Some(v) = &step.verdict {
                    out.push(v);
                }
                collect(&step.steps, out);
            }
        }
        let mut found = Vec::new();
        collect(&self.steps, &mut found);
        verdict::most_severe(found).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestConstant {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTestCaseFolder {
    pub short_name: String,
    pub planned_test_cases: Vec<PlannedNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlannedNode {
    Case(PlannedTestCase),
    Folder(PlannedTestCaseFolder),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTestCase {
    pub short_name: String,
    pub repetition: u32,
    /// Join key matching `TestCase::origin_ref`.
    pub test_case_ref: String,
}

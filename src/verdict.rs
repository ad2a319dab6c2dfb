//! Verdict vocabulary, display buckets and severity precedence.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Passed,
    Failed,
    Error,
    Inconclusive,
    None,
    /// Anything outside the fixed vocabulary, kept verbatim.
    Other(String),
}

/// Display/statistics bucket a verdict falls into. `FAILED` and `ERROR` share a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerdictBucket {
    Passed,
    Failed,
    Inconclusive,
    /// Did not execute.
    None,
    /// Residual bucket for unrecognized verdicts.
    Skipped,
}

impl Verdict {
    pub fn parse(s: &str) -> Self {
        match s {
            "PASSED" => Self::Passed,
            "FAILED" => Self::Failed,
            "ERROR" => Self::Error,
            "INCONCLUSIVE" => Self::Inconclusive,
            "NONE" => Self::None,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => "PASSED",
            Self::Failed => "FAILED",
            Self::Error => "ERROR",
            Self::Inconclusive => "INCONCLUSIVE",
            Self::None => "NONE",
            Self::Other(s) => s,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn bucket(&self) -> VerdictBucket {
        match self {
            Self::Passed => VerdictBucket::Passed,
            Self::Failed | Self::Error => VerdictBucket::Failed,
            Self::Inconclusive => VerdictBucket::Inconclusive,
            Self::None => VerdictBucket::None,
            Self::Other(_) => VerdictBucket::Skipped,
        }
    }

    /// Rank used when deriving a folder verdict: `ERROR > FAILED > INCONCLUSIVE > PASSED > NONE`.
    /// Unrecognized verdicts have no rank.
    pub fn severity(&self) -> Option<u8> {
        match self {
            Self::None => Some(0),
            Self::Passed => Some(1),
            Self::Inconclusive => Some(2),
            Self::Failed => Some(3),
            Self::Error => Some(4),
            Self::Other(_) => None,
        }
    }
}

impl VerdictBucket {
    /// Display order of the buckets in summaries.
    pub const ALL: [Self; 5] = [
        Self::Passed,
        Self::Failed,
        Self::Inconclusive,
        Self::Skipped,
        Self::None,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Inconclusive => "inconclusive",
            Self::None => "none",
            Self::Skipped => "skipped",
        }
    }
}

impl From<String> for Verdict {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Verdict> for String {
    fn from(v: Verdict) -> Self {
        v.as_str().to_string()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The most severe recognized verdict in `verdicts`, or `None` if none is recognized.
pub fn most_severe<'a, I>(verdicts: I) -> Option<&'a Verdict>
where
    I: IntoIterator<Item = &'a Verdict>,
{
    verdicts
        .into_iter()
        .filter_map(|v| v.severity().map(|rank| (rank, v)))
        .max_by_key(|(rank, _)| *rank)
        .map(|(_, v)| v)
}

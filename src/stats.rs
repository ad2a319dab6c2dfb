//! Aggregation over executed-test trees: verdict counts, durations, grouping and naming.

use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use serde::Serialize;
use tracing::debug;

use crate::model::{
    PlannedNode, PlannedTestCase, PlannedTestCaseFolder, TestCase, TestCaseFolder, TestCaseNode,
    TestReport,
};
use crate::verdict::{Verdict, VerdictBucket};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub passed: u32,
    pub failed: u32,
    pub inconclusive: u32,
    pub skipped: u32,
    pub none: u32,
    pub total_execution_time: f64,
}

impl SummaryStats {
    /// Stats of a single test case: one count in its verdict bucket plus its duration.
    pub fn of_case(tc: &TestCase) -> Self {
        let mut stats = Self {
            total_execution_time: tc.execution_time_in_sec.unwrap_or(0.0),
            ..Self::default()
        };
        if let Verdict::Other(v) = &tc.verdict {
            debug!(verdict = %v, test_case = %tc.short_name, "unknown verdict counted as skipped");
        }
        *stats.count_mut(tc.verdict.bucket()) += 1;
        stats
    }

    pub fn count(&self, bucket: VerdictBucket) -> u32 {
        match bucket {
            VerdictBucket::Passed => self.passed,
            VerdictBucket::Failed => self.failed,
            VerdictBucket::Inconclusive => self.inconclusive,
            VerdictBucket::None => self.none,
            VerdictBucket::Skipped => self.skipped,
        }
    }

    fn count_mut(&mut self, bucket: VerdictBucket) -> &mut u32 {
        match bucket {
            VerdictBucket::Passed => &mut self.passed,
            VerdictBucket::Failed => &mut self.failed,
            VerdictBucket::Inconclusive => &mut self.inconclusive,
            VerdictBucket::None => &mut self.none,
            VerdictBucket::Skipped => &mut self.skipped,
        }
    }

    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.inconclusive + self.skipped + self.none
    }
}

impl Add for SummaryStats {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            passed: self.passed + rhs.passed,
            failed: self.failed + rhs.failed,
            inconclusive: self.inconclusive + rhs.inconclusive,
            skipped: self.skipped + rhs.skipped,
            none: self.none + rhs.none,
            total_execution_time: self.total_execution_time + rhs.total_execution_time,
        }
    }
}

impl AddAssign for SummaryStats {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for SummaryStats {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// Depth-first totals over every test case below `folder`.
pub fn fold_stats(folder: &TestCaseFolder) -> SummaryStats {
    fold_stats_with(folder, &mut |_| {})
}

/// Like [`fold_stats`], calling `visit` once per test case in document order.
/// The visitor only observes; it never changes the returned totals.
pub fn fold_stats_with<F>(folder: &TestCaseFolder, visit: &mut F) -> SummaryStats
where
    F: FnMut(&TestCase),
{
    folder
        .test_cases
        .iter()
        .map(|node| match node {
            TestCaseNode::Case(tc) => {
                visit(tc);
                SummaryStats::of_case(tc)
            }
            TestCaseNode::Folder(f) => fold_stats_with(f, visit),
        })
        .sum()
}

/// Totals across several reports.
pub fn report_stats(reports: &[TestReport]) -> SummaryStats {
    reports.iter().map(|r| fold_stats(&r.root)).sum()
}

/// Lazy depth-first iterator over the test cases of a folder.
pub struct TestCases<'a> {
    stack: Vec<std::slice::Iter<'a, TestCaseNode>>,
}

impl<'a> Iterator for TestCases<'a> {
    type Item = &'a TestCase;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(TestCaseNode::Case(tc)) => return Some(tc),
                Some(TestCaseNode::Folder(f)) => self.stack.push(f.test_cases.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

pub fn test_cases(folder: &TestCaseFolder) -> TestCases<'_> {
    TestCases {
        stack: vec![folder.test_cases.iter()],
    }
}

/// Lazy depth-first iterator over the planned test cases of a plan folder.
pub struct PlannedTestCases<'a> {
    stack: Vec<std::slice::Iter<'a, PlannedNode>>,
}

impl<'a> Iterator for PlannedTestCases<'a> {
    type Item = &'a PlannedTestCase;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(top) = self.stack.last_mut() {
            match top.next() {
                Some(PlannedNode::Case(pc)) => return Some(pc),
                Some(PlannedNode::Folder(f)) => self.stack.push(f.planned_test_cases.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

pub fn planned_test_cases(folder: &PlannedTestCaseFolder) -> PlannedTestCases<'_> {
    PlannedTestCases {
        stack: vec![folder.planned_test_cases.iter()],
    }
}

/// Per-group totals for every test case that `key` assigns to a group.
pub fn group_stats<F>(reports: &[TestReport], key: F) -> BTreeMap<String, SummaryStats>
where
    F: Fn(&TestCase) -> Option<String>,
{
    let mut groups: BTreeMap<String, SummaryStats> = BTreeMap::new();
    for report in reports {
        fold_stats_with(&report.root, &mut |tc| {
            if let Some(k) = key(tc) {
                *groups.entry(k).or_default() += SummaryStats::of_case(tc);
            }
        });
    }
    groups
}

/// One vote per group, under two policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVotes {
    pub groups: usize,
    /// Every iteration of a group agrees.
    pub all_iterations: SummaryStats,
    /// At least one iteration reached the outcome.
    pub at_least_once: SummaryStats,
}

pub fn group_votes(groups: &BTreeMap<String, SummaryStats>) -> GroupVotes {
    let mut votes = GroupVotes {
        groups: groups.len(),
        ..GroupVotes::default()
    };

    for stat in groups.values() {
        let iterations = stat.total();

        // passed, failed, none, skipped, otherwise inconclusive
        let all = &mut votes.all_iterations;
        if stat.passed == iterations {
            all.passed += 1;
        } else if stat.failed == iterations {
            all.failed += 1;
        } else if stat.none == iterations {
            all.none += 1;
        } else if stat.skipped == iterations {
            all.skipped += 1;
        } else {
            all.inconclusive += 1;
        }
        all.total_execution_time += stat.total_execution_time;

        // passed, failed, inconclusive, none, otherwise skipped
        let once = &mut votes.at_least_once;
        if stat.passed > 0 {
            once.passed += 1;
        } else if stat.failed > 0 {
            once.failed += 1;
        } else if stat.inconclusive > 0 {
            once.inconclusive += 1;
        } else if stat.none > 0 {
            once.none += 1;
        } else {
            once.skipped += 1;
        }
        once.total_execution_time += stat.total_execution_time;
    }

    votes
}

/// Display name of a report: its plan's top-level folder names joined by `,`.
pub fn report_test_name(report: &TestReport) -> String {
    report
        .plan
        .planned_test_cases
        .iter()
        .filter_map(|node| match node {
            PlannedNode::Folder(f) => Some(f.short_name.as_str()),
            PlannedNode::Case(_) => None,
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Title for a group of reports, factoring out a shared name prefix.
pub fn overview_title(reports: &[TestReport]) -> String {
    let names: Vec<String> = reports.iter().map(report_test_name).collect();
    if names.len() == 1 {
        return names[0].clone();
    }
    let prefix = longest_common_prefix(&names);
    if prefix.is_empty() {
        return names.join(", ");
    }
    let suffixes: Vec<String> = names
        .iter()
        .map(|n| format!("-{}", &n[prefix.len()..]))
        .collect();
    format!("{prefix}.. {}", suffixes.join(", "))
}

fn longest_common_prefix(names: &[String]) -> &str {
    let Some(first) = names.first() else {
        return "";
    };
    let mut len = first.len();
    for name in &names[1..] {
        len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map(|((i, a), _)| i + a.len_utf8())
            .unwrap_or(0)
            .min(len);
    }
    &first[..len]
}

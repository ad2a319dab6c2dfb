//! Report set comparison: match test plans first, then diff test cases inside each matched pair.
//!
//! Plans are matched greedily in reference order by how many planned test case
//! names they share; a matched candidate leaves the pool. Within a matched pair,
//! test cases are joined by origin ref plus short name and classified as
//! regressed (was `PASSED`, now not) or improved (was not `PASSED`, now is).

use std::collections::HashSet;

use crate::model::{TestCase, TestReport};
use crate::serialize;
use crate::stats;

/// A test case in the reference set and its counterpart in the current set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CasePair<'a> {
    pub reference: &'a TestCase,
    pub current: &'a TestCase,
}

/// A matched pair of reports with the verdict transitions between them.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanComparison<'a> {
    pub reference: &'a TestReport,
    pub current: &'a TestReport,
    pub regressed: Vec<CasePair<'a>>,
    pub improved: Vec<CasePair<'a>>,
}

impl PlanComparison<'_> {
    /// Matched, and no test case changed between passing and not passing.
    pub fn is_unchanged(&self) -> bool {
        self.regressed.is_empty() && self.improved.is_empty()
    }
}

/// Result of comparing a reference report set with a current one.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison<'a> {
    pub common: Vec<PlanComparison<'a>>,
    pub missing_in_current: Vec<&'a TestReport>,
    pub new_in_current: Vec<&'a TestReport>,
}

/// Compare two report sets.
pub fn compare_reports<'a>(reference: &'a [TestReport], current: &'a [TestReport]) -> Comparison<'a> {
    let mut pool: Vec<&'a TestReport> = current.iter().collect();
    let mut common = Vec::new();
    let mut missing_in_current = Vec::new();

    for report in reference {
        match best_plan_match(&pool, report) {
            Some(idx) => {
                let matched = pool.remove(idx);
                common.push(compare_plan(report, matched));
            }
            None => missing_in_current.push(report),
        }
    }

    Comparison {
        common,
        missing_in_current,
        new_in_current: pool,
    }
}

/// Index of the candidate sharing the most planned test case names with `report`.
/// Ties go to the earliest candidate; zero overlap is no match.
fn best_plan_match(pool: &[&TestReport], report: &TestReport) -> Option<usize> {
    let wanted: Vec<&str> = stats::planned_test_cases(&report.plan)
        .map(|pc| pc.short_name.as_str())
        .collect();

    let mut best: Option<(usize, usize)> = None;
    for (idx, candidate) in pool.iter().enumerate() {
        let shared = shared_planned_cases(&wanted, candidate);
        if shared > 0 && best.map_or(true, |(_, most)| shared > most) {
            best = Some((idx, shared));
        }
    }
    best.map(|(idx, _)| idx)
}

/// How many of `wanted` appear among the candidate's planned test case names.
fn shared_planned_cases(wanted: &[&str], candidate: &TestReport) -> usize {
    let names: HashSet<&str> = stats::planned_test_cases(&candidate.plan)
        .map(|pc| pc.short_name.as_str())
        .collect();
    wanted.iter().filter(|name| names.contains(*name)).count()
}

/// Diff the test cases of two matched reports.
pub fn compare_plan<'a>(reference: &'a TestReport, current: &'a TestReport) -> PlanComparison<'a> {
    let reference_cases: Vec<&TestCase> = stats::test_cases(&reference.root).collect();
    let mut regressed = Vec::new();
    let mut improved = Vec::new();

    for cur in stats::test_cases(&current.root) {
        let Some(refc) = reference_cases.iter().copied().find(|r| same_test_case(r, cur)) else {
            continue;
        };
        let pair = CasePair {
            reference: refc,
            current: cur,
        };
        match (refc.verdict.is_passed(), cur.verdict.is_passed()) {
            (true, false) => regressed.push(pair),
            (false, true) => improved.push(pair),
            _ => {}
        }
    }

    PlanComparison {
        reference,
        current,
        regressed,
        improved,
    }
}

fn same_test_case(a: &TestCase, b: &TestCase) -> bool {
    match (&a.origin_ref, &b.origin_ref) {
        (Some(ra), Some(rb)) => !ra.is_empty() && ra == rb && a.short_name == b.short_name,
        _ => false,
    }
}

/// Format a comparison into compact text output.
pub fn format_comparison(cmp: &Comparison<'_>) -> String {
    let mut output = format!(
        "compare: {} common, {} only in reference, {} only in current\n",
        cmp.common.len(),
        cmp.missing_in_current.len(),
        cmp.new_in_current.len()
    );

    for plan in &cmp.common {
        output.push_str(&format!(
            "= {} <-> {}",
            plan.reference.short_name, plan.current.short_name
        ));
        if plan.is_unchanged() {
            output.push_str(" [unchanged]\n");
            continue;
        }
        output.push('\n');
        let reference_totals = stats::fold_stats(&plan.reference.root);
        let current_totals = stats::fold_stats(&plan.current.root);
        output.push_str(&format!("  reference: {}\n", serialize::format_counts(&reference_totals)));
        output.push_str(&format!("  current:   {}\n", serialize::format_counts(&current_totals)));
        for pair in &plan.regressed {
            format_case_pair("  - regressed", pair, &mut output);
        }
        for pair in &plan.improved {
            format_case_pair("  + improved", pair, &mut output);
        }
    }

    for report in &cmp.missing_in_current {
        output.push_str(&format!("< {} (reference only)\n", report.short_name));
    }
    for report in &cmp.new_in_current {
        output.push_str(&format!("> {} (current only)\n", report.short_name));
    }

    output
}

fn format_case_pair(label: &str, pair: &CasePair<'_>, output: &mut String) {
    output.push_str(&format!(
        "{label} \"{}\": {} -> {}\n",
        pair.current.display_name(),
        pair.reference.verdict,
        pair.current.verdict
    ));
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        PlannedNode, PlannedTestCase, PlannedTestCaseFolder, TestCaseFolder, TestCaseNode,
    };
    use crate::verdict::Verdict;

    fn make_case(name: &str, origin: Option<&str>, verdict: Verdict) -> TestCaseNode {
        let mut tc = TestCase::new(name, verdict);
        tc.origin_ref = origin.map(String::from);
        TestCaseNode::Case(tc)
    }

    fn make_report(name: &str, planned: &[&str], cases: Vec<TestCaseNode>) -> TestReport {
        TestReport {
            short_name: name.into(),
            long_name: None,
            date: None,
            root: TestCaseFolder {
                short_name: String::new(),
                long_name: None,
                test_cases: cases,
            },
            plan: PlannedTestCaseFolder {
                short_name: format!("plan-{name}"),
                planned_test_cases: planned
                    .iter()
                    .map(|p| {
                        PlannedNode::Case(PlannedTestCase {
                            short_name: (*p).into(),
                            repetition: 1,
                            test_case_ref: format!("/spec/{p}"),
                        })
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn identical_sets_are_all_common_and_unchanged() {
        let reports = vec![
            make_report("R1", &["a", "b"], vec![make_case("a", Some("X"), Verdict::Passed)]),
            make_report("R2", &["c"], vec![make_case("c", Some("Y"), Verdict::Failed)]),
        ];
        let cmp = compare_reports(&reports, &reports);
        assert_eq!(cmp.common.len(), 2);
        assert!(cmp.missing_in_current.is_empty());
        assert!(cmp.new_in_current.is_empty());
        assert!(cmp.common.iter().all(PlanComparison::is_unchanged));
    }

    #[test]
    fn regression_detected() {
        let a = vec![make_report("R", &["t"], vec![make_case("TC", Some("X"), Verdict::Passed)])];
        let b = vec![make_report("R", &["t"], vec![make_case("TC", Some("X"), Verdict::Failed)])];
        let cmp = compare_reports(&a, &b);
        assert_eq!(cmp.common.len(), 1);
        let plan = &cmp.common[0];
        assert_eq!(plan.regressed.len(), 1);
        assert!(plan.improved.is_empty());
        assert_eq!(plan.regressed[0].reference.verdict, Verdict::Passed);
        assert_eq!(plan.regressed[0].current.verdict, Verdict::Failed);
    }

    #[test]
    fn improvement_requires_passed_now() {
        let a = vec![make_report(
            "R",
            &["t"],
            vec![
                make_case("one", Some("1"), Verdict::Failed),
                make_case("two", Some("2"), Verdict::Failed),
            ],
        )];
        let b = vec![make_report(
            "R",
            &["t"],
            vec![
                make_case("one", Some("1"), Verdict::Passed),
                make_case("two", Some("2"), Verdict::Error),
            ],
        )];
        let cmp = compare_reports(&a, &b);
        let plan = &cmp.common[0];
        assert_eq!(plan.improved.len(), 1);
        assert_eq!(plan.improved[0].current.short_name, "one");
        assert!(plan.regressed.is_empty());
    }

    #[test]
    fn cases_without_origin_or_name_match_are_not_common() {
        let a = vec![make_report(
            "R",
            &["t"],
            vec![
                make_case("no-origin", None, Verdict::Passed),
                make_case("empty", Some(""), Verdict::Passed),
                make_case("renamed", Some("Z"), Verdict::Passed),
            ],
        )];
        let b = vec![make_report(
            "R",
            &["t"],
            vec![
                make_case("no-origin", None, Verdict::Failed),
                make_case("empty", Some(""), Verdict::Failed),
                make_case("renamed-now", Some("Z"), Verdict::Failed),
            ],
        )];
        let cmp = compare_reports(&a, &b);
        assert!(cmp.common[0].is_unchanged());
    }

    #[test]
    fn plans_match_by_largest_overlap() {
        let reference = vec![
            make_report("zero", &["x", "y"], vec![]),
            make_report("three", &["a", "b", "c", "d"], vec![]),
        ];
        let current = vec![make_report("cur", &["a", "b", "c", "z"], vec![])];
        let cmp = compare_reports(&reference, &current);
        assert_eq!(cmp.common.len(), 1);
        assert_eq!(cmp.common[0].reference.short_name, "three");
        assert_eq!(cmp.missing_in_current.len(), 1);
        assert_eq!(cmp.missing_in_current[0].short_name, "zero");
    }

    #[test]
    fn greedy_matching_follows_reference_order() {
        let reference = vec![
            make_report("first", &["a"], vec![]),
            make_report("second", &["a", "b"], vec![]),
        ];
        let current = vec![
            make_report("only-a", &["a"], vec![]),
            make_report("a-and-b", &["a", "b"], vec![]),
        ];
        let cmp = compare_reports(&reference, &current);
        // "first" ties on both candidates and takes the earliest one.
        assert_eq!(cmp.common[0].current.short_name, "only-a");
        assert_eq!(cmp.common[1].current.short_name, "a-and-b");
    }

    #[test]
    fn unmatched_current_reports_are_new() {
        let reference = vec![make_report("old", &["a"], vec![])];
        let current = vec![
            make_report("new", &["q"], vec![]),
            make_report("same", &["a"], vec![]),
        ];
        let cmp = compare_reports(&reference, &current);
        assert_eq!(cmp.new_in_current.len(), 1);
        assert_eq!(cmp.new_in_current[0].short_name, "new");
    }

    #[test]
    fn format_lists_changes() {
        let a = vec![
            make_report("R", &["t"], vec![make_case("TC", Some("X"), Verdict::Passed)]),
            make_report("gone", &["g"], vec![]),
        ];
        let b = vec![make_report("R", &["t"], vec![make_case("TC", Some("X"), Verdict::Failed)])];
        let text = format_comparison(&compare_reports(&a, &b));
        assert!(text.contains("1 common, 1 only in reference, 0 only in current"), "output: {text}");
        assert!(
            text.contains("  reference: 1 passed, 0 failed, 0 inconclusive, 0 skipped, 0 none\n"),
            "output: {text}"
        );
        assert!(text.contains("  current:   0 passed, 1 failed,"), "output: {text}");
        assert!(text.contains("- regressed \"TC\": PASSED -> FAILED"), "output: {text}");
        assert!(text.contains("< gone (reference only)"), "output: {text}");
    }

    #[test]
    fn format_marks_unchanged_pairs() {
        let a = vec![make_report("R", &["t"], vec![])];
        let text = format_comparison(&compare_reports(&a, &a));
        assert!(text.contains("= R <-> R [unchanged]"), "output: {text}");
    }
}

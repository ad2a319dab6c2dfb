//! Tree builders and report assembly.
//!
//! Parsing never fails as a whole: a malformed folder, case, step or plan is dropped
//! with a warning and its siblings carry on.

use std::cmp::Ordering;

use tracing::{debug, warn};

use crate::extract;
use crate::model::{
    PlannedNode, PlannedTestCase, PlannedTestCaseFolder, StepKind, TestCase, TestCaseFolder,
    TestCaseNode, TestReport, TestStep,
};
use crate::node::{all_values, first_children, Node};

/// `CATEGORY` a `TEST-SPEC` must carry to count as a report.
pub const REPORT_CATEGORY: &str = "ATX_TEST_REPORT";

/// Step containers of a test case, in execution order.
const STEP_PHASES: &[&str] = &["TEST-SETUP-STEPS", "TEST-EXECUTION-STEPS", "TEST-TEARDOWN-STEPS"];

/// Extract every report contained in a decoded ATX document.
///
/// Accepts either the full document (with a top-level `ATX` entry) or the
/// contents of the `ATX` element directly.
pub fn parse_reports(document: &[Node]) -> Vec<TestReport> {
    let atx = first_children(document, "ATX").unwrap_or(document);
    let mut plans = Vec::new();
    let mut specs = Vec::new();
    collect_packages(atx, &mut plans, &mut specs);

    if plans.len() != specs.len() {
        warn!(
            plans = plans.len(),
            specs = specs.len(),
            "execution plan and report spec counts differ, pairing by position"
        );
    }

    let reports: Vec<TestReport> = plans
        .iter()
        .zip(specs.iter())
        .filter_map(|(plan, spec)| build_report(plan, spec))
        .collect();
    debug!(reports = reports.len(), "document parsed");
    reports
}

/// Walk `AR-PACKAGES/AR-PACKAGE/ELEMENTS`, descending into nested packages,
/// collecting plans and report specs in encounter order.
fn collect_packages<'a>(
    parent: &'a [Node],
    plans: &mut Vec<&'a [Node]>,
    specs: &mut Vec<&'a [Node]>,
) {
    for packages in all_values(parent, "AR-PACKAGES") {
        let Some(packages) = packages.as_seq() else {
            warn!("AR-PACKAGES is not an element, skipped");
            continue;
        };
        for package in all_values(packages, "AR-PACKAGE") {
            let Some(package) = package.as_seq() else {
                warn!("AR-PACKAGE is not an element, skipped");
                continue;
            };
            if let Some(elements) = first_children(package, "ELEMENTS") {
                collect_elements(elements, plans, specs);
            }
            collect_packages(package, plans, specs);
        }
    }
}

fn collect_elements<'a>(
    elements: &'a [Node],
    plans: &mut Vec<&'a [Node]>,
    specs: &mut Vec<&'a [Node]>,
) {
    for element in elements {
        match (element.key.as_str(), element.children()) {
            ("TEST-SPEC", Some(spec)) => match extract::category(spec) {
                Some(category) if category == REPORT_CATEGORY => specs.push(spec),
                category => debug!(category = ?category, "TEST-SPEC is not a report, skipped"),
            },
            ("TEST-EXECUTION-PLAN", Some(plan)) => plans.push(plan),
            ("TEST-SPEC" | "TEST-EXECUTION-PLAN", None) => {
                warn!(element = %element.key, "element is not a container, skipped");
            }
            (other, _) => debug!(element = other, "package element ignored"),
        }
    }
}

fn build_report(plan: &[Node], spec: &[Node]) -> Option<TestReport> {
    let Some(short_name) = extract::short_name(spec) else {
        warn!("report skipped, TEST-SPEC has no SHORT-NAME");
        return None;
    };
    let Some(plan_name) = extract::short_name(plan) else {
        warn!(report = %short_name, "report skipped, TEST-EXECUTION-PLAN has no SHORT-NAME");
        return None;
    };
    let Some(test_cases) = first_children(spec, "TEST-CASES") else {
        warn!(report = %short_name, "report skipped, no TEST-CASES");
        return None;
    };
    let Some(planned) = first_children(plan, "PLANNED-TEST-CASES") else {
        warn!(report = %short_name, plan = %plan_name, "report skipped, no PLANNED-TEST-CASES");
        return None;
    };

    Some(TestReport {
        long_name: extract::long_name(spec),
        date: extract::date(spec),
        root: TestCaseFolder {
            short_name: String::new(),
            long_name: None,
            test_cases: build_test_cases(test_cases),
        },
        plan: PlannedTestCaseFolder {
            short_name: plan_name,
            planned_test_cases: build_planned_test_cases(planned),
        },
        short_name,
    })
}

/// Build the executed-test tree from the entries of a `TEST-CASES` collection.
pub fn build_test_cases(entries: &[Node]) -> Vec<TestCaseNode> {
    let mut res = Vec::new();
    for entry in entries {
        let Some(children) = entry.children() else {
            warn!(element = %entry.key, "TEST-CASES entry is not an element, skipped");
            continue;
        };
        match entry.key.as_str() {
            "TEST-CASE-FOLDER" => {
                if let Some(folder) = build_test_case_folder(children) {
                    res.push(TestCaseNode::Folder(folder));
                }
            }
            "TEST-CASE" => {
                if let Some(tc) = build_test_case(children) {
                    res.push(TestCaseNode::Case(tc));
                }
            }
            other => warn!(element = other, "unknown TEST-CASES entry ignored"),
        }
    }
    res
}

fn build_test_case_folder(children: &[Node]) -> Option<TestCaseFolder> {
    let short_name = extract::short_name(children);
    let (Some(short_name), Some(test_cases)) = (short_name.clone(), first_children(children, "TEST-CASES"))
    else {
        warn!(folder = ?short_name, "TEST-CASE-FOLDER without SHORT-NAME or TEST-CASES dropped");
        return None;
    };

    Some(TestCaseFolder {
        short_name,
        long_name: extract::long_name(children),
        test_cases: build_test_cases(test_cases),
    })
}

fn build_test_case(children: &[Node]) -> Option<TestCase> {
    let Some(short_name) = extract::short_name(children) else {
        warn!("TEST-CASE without SHORT-NAME dropped");
        return None;
    };
    let Some(verdict) = extract::verdict(children) else {
        warn!(test_case = %short_name, "TEST-CASE without VERDICT-RESULT dropped");
        return None;
    };

    let mut steps = Vec::new();
    for &phase in STEP_PHASES {
        for container in all_values(children, phase) {
            match container.as_seq() {
                Some(entries) => steps.extend(build_steps(entries)),
                None => warn!(test_case = %short_name, phase, "step container is not an element"),
            }
        }
    }

    Some(TestCase {
        long_name: extract::long_name(children),
        desc: extract::desc(children),
        date: extract::date(children),
        execution_time_in_sec: extract::execution_time(children),
        verdict,
        origin_ref: extract::origin_ref(children),
        steps,
        test_arguments: extract::arguments(children),
        test_constants: extract::test_constants(children),
        short_name,
    })
}

/// Build steps from the entries of a step container or step folder, in document order.
pub fn build_steps<'a>(entries: impl IntoIterator<Item = &'a Node>) -> Vec<TestStep> {
    let mut res = Vec::new();
    for entry in entries {
        let kind = match entry.key.as_str() {
            "TEST-STEP" => StepKind::Step,
            "TEST-STEP-FOLDER" => StepKind::Folder,
            other => {
                warn!(element = other, "unknown step entry ignored");
                continue;
            }
        };
        let Some(children) = entry.children() else {
            warn!(element = %entry.key, "step is not an element, skipped");
            continue;
        };
        if let Some(step) = build_step(kind, children) {
            res.push(step);
        }
    }
    res
}

fn build_step(kind: StepKind, children: &[Node]) -> Option<TestStep> {
    let Some(short_name) = extract::short_name(children) else {
        warn!(kind = ?kind, "step without SHORT-NAME dropped");
        return None;
    };

    let steps = match kind {
        StepKind::Step => vec![],
        StepKind::Folder => {
            let steps = build_steps(children.iter().filter(|n| is_step_entry(n)));
            if steps.is_empty() {
                warn!(step_folder = %short_name, "TEST-STEP-FOLDER without steps dropped");
                return None;
            }
            steps
        }
    };

    Some(TestStep {
        kind,
        long_name: extract::long_name(children),
        desc: extract::desc(children),
        verdict: extract::verdict(children),
        expected_result: extract::expected_result(children),
        steps,
        short_name,
    })
}

fn is_step_entry(node: &Node) -> bool {
    matches!(node.key.as_str(), "TEST-STEP" | "TEST-STEP-FOLDER")
}

/// Build the planned-test tree from the entries of a `PLANNED-TEST-CASES` collection.
pub fn build_planned_test_cases(entries: &[Node]) -> Vec<PlannedNode> {
    let mut res = Vec::new();
    for entry in entries {
        let Some(children) = entry.children() else {
            warn!(element = %entry.key, "PLANNED-TEST-CASES entry is not an element, skipped");
            continue;
        };
        match entry.key.as_str() {
            "PLANNED-TEST-CASE-FOLDER" => {
                let short_name = extract::short_name(children);
                match (short_name, first_children(children, "PLANNED-TEST-CASES")) {
                    (Some(short_name), Some(planned)) => {
                        res.push(PlannedNode::Folder(PlannedTestCaseFolder {
                            short_name,
                            planned_test_cases: build_planned_test_cases(planned),
                        }));
                    }
                    (short_name, _) => warn!(
                        folder = ?short_name,
                        "PLANNED-TEST-CASE-FOLDER without SHORT-NAME or PLANNED-TEST-CASES dropped"
                    ),
                }
            }
            "PLANNED-TEST-CASE" => {
                match (extract::short_name(children), extract::test_case_ref(children)) {
                    (Some(short_name), Some(test_case_ref)) => {
                        res.push(PlannedNode::Case(PlannedTestCase {
                            short_name,
                            repetition: extract::repetition(children),
                            test_case_ref,
                        }));
                    }
                    (short_name, _) => warn!(
                        planned = ?short_name,
                        "PLANNED-TEST-CASE without SHORT-NAME or TEST-CASE-REF dropped"
                    ),
                }
            }
            other => warn!(element = other, "unknown PLANNED-TEST-CASES entry ignored"),
        }
    }
    res
}

/// Order two reports by date. An absent date sorts before any present one.
pub fn compare_by_date(a: &TestReport, b: &TestReport) -> Ordering {
    match (&a.date, &b.date) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(da), Some(db)) => da.cmp(db),
    }
}

/// Stable sort by date.
pub fn sort_by_date(reports: &mut [TestReport]) {
    reports.sort_by(compare_by_date);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict_result(verdict: &str) -> Node {
        Node::element("VERDICT-RESULT", vec![Node::text("VERDICT", verdict)])
    }

    fn test_case(name: &str, verdict: &str) -> Node {
        Node::element(
            "TEST-CASE",
            vec![Node::text("SHORT-NAME", name), verdict_result(verdict)],
        )
    }

    fn step(name: &str, verdict: Option<&str>) -> Node {
        let mut children = vec![Node::text("SHORT-NAME", name)];
        if let Some(v) = verdict {
            children.push(verdict_result(v));
        }
        Node::element("TEST-STEP", children)
    }

    fn report_with_date(name: &str, date: Option<&str>) -> TestReport {
        TestReport {
            short_name: name.into(),
            long_name: None,
            date: date.map(|d| d.parse().unwrap()),
            root: TestCaseFolder {
                short_name: String::new(),
                long_name: None,
                test_cases: vec![],
            },
            plan: PlannedTestCaseFolder {
                short_name: String::new(),
                planned_test_cases: vec![],
            },
        }
    }

    #[test]
    fn folder_and_case_keep_document_order() {
        let entries = vec![
            test_case("A", "PASSED"),
            Node::element(
                "TEST-CASE-FOLDER",
                vec![
                    Node::text("SHORT-NAME", "F"),
                    Node::element("TEST-CASES", vec![test_case("B", "FAILED")]),
                ],
            ),
            test_case("C", "NONE"),
        ];
        let built = build_test_cases(&entries);
        let names: Vec<&str> = built.iter().map(TestCaseNode::short_name).collect();
        assert_eq!(names, vec!["A", "F", "C"]);
        match &built[1] {
            TestCaseNode::Folder(f) => assert_eq!(f.test_cases.len(), 1),
            other => panic!("expected folder, got {other:?}"),
        }
    }

    #[test]
    fn case_without_verdict_is_dropped() {
        let entries = vec![
            Node::element("TEST-CASE", vec![Node::text("SHORT-NAME", "broken")]),
            test_case("ok", "PASSED"),
        ];
        let built = build_test_cases(&entries);
        assert_eq!(built.len(), 1);
        assert_eq!(built[0].short_name(), "ok");
    }

    #[test]
    fn folder_without_test_cases_is_dropped() {
        let entries = vec![Node::element("TEST-CASE-FOLDER", vec![Node::text("SHORT-NAME", "F")])];
        assert!(build_test_cases(&entries).is_empty());
    }

    #[test]
    fn unknown_entries_are_skipped() {
        let entries = vec![
            Node::element("TEST-CASE-GROUP", vec![]),
            test_case("ok", "PASSED"),
        ];
        assert_eq!(build_test_cases(&entries).len(), 1);
    }

    #[test]
    fn steps_concatenate_phases_in_order() {
        let tc = Node::element(
            "TEST-CASE",
            vec![
                Node::text("SHORT-NAME", "TC"),
                verdict_result("PASSED"),
                Node::element("TEST-TEARDOWN-STEPS", vec![step("teardown", None)]),
                Node::element("TEST-EXECUTION-STEPS", vec![step("exec1", None), step("exec2", None)]),
                Node::element("TEST-SETUP-STEPS", vec![step("setup", None)]),
            ],
        );
        let built = build_test_cases(&[tc]);
        let TestCaseNode::Case(tc) = &built[0] else {
            panic!("expected case");
        };
        let names: Vec<&str> = tc.steps.iter().map(|s| s.short_name.as_str()).collect();
        assert_eq!(names, vec!["setup", "exec1", "exec2", "teardown"]);
    }

    #[test]
    fn step_folder_nests_and_empty_folder_is_dropped() {
        let entries = vec![
            Node::element(
                "TEST-STEP-FOLDER",
                vec![
                    Node::text("SHORT-NAME", "group"),
                    step("a", Some("PASSED")),
                    Node::element(
                        "TEST-STEP-FOLDER",
                        vec![Node::text("SHORT-NAME", "inner"), step("b", Some("FAILED"))],
                    ),
                ],
            ),
            Node::element("TEST-STEP-FOLDER", vec![Node::text("SHORT-NAME", "empty")]),
        ];
        let steps = build_steps(&entries);
        assert_eq!(steps.len(), 1);
        let group = &steps[0];
        assert_eq!(group.kind, StepKind::Folder);
        assert_eq!(group.steps.len(), 2);
        assert_eq!(group.steps[1].steps[0].short_name, "b");
        assert_eq!(group.effective_verdict(), Some(crate::verdict::Verdict::Failed));
    }

    #[test]
    fn step_expected_result_is_extracted() {
        let entries = vec![Node::element(
            "TEST-STEP",
            vec![
                Node::text("SHORT-NAME", "s"),
                Node::element(
                    "VERDICT-DEFINITION",
                    vec![Node::element(
                        "EXPECTED-RESULT",
                        vec![Node::text("P", "speed == 50")],
                    )],
                ),
            ],
        )];
        let steps = build_steps(&entries);
        assert_eq!(steps[0].expected_result.as_deref(), Some("speed == 50"));
        assert_eq!(steps[0].verdict, None);
    }

    #[test]
    fn planned_cases_and_folders() {
        let entries = vec![
            Node::element(
                "PLANNED-TEST-CASE-FOLDER",
                vec![
                    Node::text("SHORT-NAME", "Suite"),
                    Node::element(
                        "PLANNED-TEST-CASES",
                        vec![Node::element(
                            "PLANNED-TEST-CASE",
                            vec![
                                Node::text("SHORT-NAME", "TC1"),
                                Node::text("REPETITION", "2"),
                                Node::text("TEST-CASE-REF", "/spec/TC1"),
                            ],
                        )],
                    ),
                ],
            ),
            Node::element("PLANNED-TEST-CASE", vec![Node::text("SHORT-NAME", "no-ref")]),
        ];
        let planned = build_planned_test_cases(&entries);
        assert_eq!(planned.len(), 1);
        let PlannedNode::Folder(folder) = &planned[0] else {
            panic!("expected folder");
        };
        let PlannedNode::Case(pc) = &folder.planned_test_cases[0] else {
            panic!("expected case");
        };
        assert_eq!(pc.repetition, 2);
        assert_eq!(pc.test_case_ref, "/spec/TC1");
    }

    #[test]
    fn undated_reports_sort_first_and_sort_is_stable() {
        let mut reports = vec![
            report_with_date("late", Some("2024-02-01T00:00:00Z")),
            report_with_date("undated1", None),
            report_with_date("early", Some("2024-01-01T00:00:00Z")),
            report_with_date("undated2", None),
            report_with_date("late2", Some("2024-02-01T00:00:00Z")),
        ];
        sort_by_date(&mut reports);
        let names: Vec<&str> = reports.iter().map(|r| r.short_name.as_str()).collect();
        assert_eq!(names, vec!["undated1", "undated2", "early", "late", "late2"]);

        let before = reports.clone();
        sort_by_date(&mut reports);
        assert_eq!(reports, before);
    }
}

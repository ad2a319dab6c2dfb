use crate::model::{TestCase, TestCaseFolder, TestCaseNode, TestReport, TestStep};
use crate::stats::{self, GroupVotes, SummaryStats};
use crate::verdict::VerdictBucket;

/// Names longer than this are abbreviated.
const MAX_NAME_LEN: usize = 100;

/// Serialize a report set into a compact, indented text tree.
///
/// Example output:
/// ```text
/// reports: 1 "Suite_A"
/// total: 2 passed, 1 failed, 0 inconclusive, 0 skipped, 0 none, 4.5s
/// ---
/// report "R1" [plan P1] 2024-03-01 10:00:00 UTC
///   folder "Suite_A":
///     [PASSED] "Init" 1.5s
///     [FAILED] "Drive" 3s
///       FAILED: "Accelerate"
/// ```
pub fn to_compact_text(reports: &[TestReport]) -> String {
    let mut output = format!(
        "reports: {} \"{}\"\n",
        reports.len(),
        stats::overview_title(reports)
    );
    output.push_str(&format!("total: {}\n", format_stats(&stats::report_stats(reports))));
    output.push_str("---\n");

    for report in reports {
        serialize_report(report, &mut output);
    }

    output
}

fn serialize_report(report: &TestReport, output: &mut String) {
    output.push_str(&format!(
        "report \"{}\" [plan {}]",
        report.short_name, report.plan.short_name
    ));
    if let Some(date) = &report.date {
        output.push_str(&format!(" {date}"));
    }
    output.push('\n');
    serialize_folder_children(&report.root, 1, output);
}

fn serialize_folder_children(folder: &TestCaseFolder, indent: usize, output: &mut String) {
    for node in &folder.test_cases {
        match node {
            TestCaseNode::Case(tc) => serialize_case(tc, indent, output),
            TestCaseNode::Folder(f) => {
                let name = f.long_name.as_deref().unwrap_or(&f.short_name);
                output.push_str(&format!("{}folder \"{}\":\n", "  ".repeat(indent), abbreviate(name)));
                serialize_folder_children(f, indent + 1, output);
            }
        }
    }
}

fn serialize_case(tc: &TestCase, indent: usize, output: &mut String) {
    let prefix = "  ".repeat(indent);
    output.push_str(&format!("{prefix}[{}] \"{}\"", tc.verdict, abbreviate(tc.display_name())));
    if let Some(secs) = tc.execution_time_in_sec {
        output.push_str(&format!(" {secs}s"));
    }
    if let Some(origin) = &tc.origin_ref {
        output.push_str(&format!(" <{origin}>"));
    }
    output.push('\n');

    for arg in &tc.test_arguments {
        output.push_str(&format!(
            "{prefix}  arg {}{} = \"{}\"\n",
            arg.desc.as_deref().unwrap_or("-"),
            arg.direction.as_deref().map(|d| format!(" ({d})")).unwrap_or_default(),
            arg.value
        ));
    }

    for step in &tc.steps {
        serialize_step(step, indent + 1, output);
    }
}

fn serialize_step(step: &TestStep, indent: usize, output: &mut String) {
    let prefix = "  ".repeat(indent);
    output.push_str(&prefix);
    if let Some(verdict) = step.effective_verdict() {
        output.push_str(&format!("{verdict}: "));
    }
    output.push_str(&format!("\"{}\"", abbreviate(step.display_name())));
    if let Some(expected) = &step.expected_result {
        output.push_str(&format!(" expect \"{}\"", first_line(expected)));
    }
    output.push('\n');

    for child in &step.steps {
        serialize_step(child, indent + 1, output);
    }
}

/// Bucket counts in display order: `2 passed, 1 failed, ...`.
pub fn format_counts(stats: &SummaryStats) -> String {
    VerdictBucket::ALL
        .iter()
        .map(|&bucket| format!("{} {}", stats.count(bucket), bucket.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_stats(stats: &SummaryStats) -> String {
    format!("{}, {}s", format_counts(stats), stats.total_execution_time)
}

/// Serialize grouped totals followed by the per-group vote summary.
pub fn format_groups(
    key: &str,
    groups: &std::collections::BTreeMap<String, SummaryStats>,
    votes: &GroupVotes,
) -> String {
    let mut output = format!("groups by {key}: {}\n", votes.groups);
    for (name, stats) in groups {
        output.push_str(&format!("  {name}: {}\n", format_stats(stats)));
    }
    output.push_str(&format!(">=1 iteration: {}\n", format_stats(&votes.at_least_once)));
    output.push_str(&format!("all iterations: {}\n", format_stats(&votes.all_iterations)));
    output
}

fn abbreviate(name: &str) -> String {
    if name.chars().count() > MAX_NAME_LEN {
        let head: String = name.chars().take(MAX_NAME_LEN - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

//! Leaf extractors: typed scalars pulled out of an element's children.
//!
//! None of these fail. A missing field is `None`; a field that is present but
//! unusable logs a warning and is `None` as well.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::warn;

use crate::model::{Argument, TestConstant};
use crate::node::{self, all_values, deep_text, first_children, first_value, path_text, path_value, Node};
use crate::verdict::Verdict;

const DATE_PATH: &str = "ADMIN-DATA.DOC-REVISIONS.DOC-REVISION.DATE";
const VERDICT_PATH: &str = "VERDICT-RESULT.VERDICT";
const EXPECTED_RESULT_PATH: &str = "VERDICT-DEFINITION.EXPECTED-RESULT";
const ARGUMENTS_PATH: &str = "ARGUMENT-LIST.ARGUMENTS";
const VALUE_PATH: &str = "LITERAL-VALUE.TEXT-VALUE-SPECIFICATION.VALUE";

/// Text of a single-valued child element, warning when the element exists but holds no text.
fn text_field(children: &[Node], key: &str) -> Option<String> {
    let value = first_value(children, key)?;
    let text = node::inner_text(value);
    if text.is_none() {
        warn!(element = key, "element has no text content");
    }
    text
}

pub fn short_name(children: &[Node]) -> Option<String> {
    text_field(children, "SHORT-NAME").filter(|s| !s.is_empty())
}

/// `LONG-NAME` may wrap its text in language elements (`L-4`); all of it is kept.
pub fn long_name(children: &[Node]) -> Option<String> {
    first_value(children, "LONG-NAME").and_then(deep_text)
}

pub fn desc(children: &[Node]) -> Option<String> {
    first_value(children, "DESC").and_then(deep_text)
}

pub fn category(children: &[Node]) -> Option<String> {
    text_field(children, "CATEGORY")
}

pub fn origin_ref(children: &[Node]) -> Option<String> {
    text_field(children, "ORIGIN-REF")
}

pub fn test_case_ref(children: &[Node]) -> Option<String> {
    text_field(children, "TEST-CASE-REF")
}

/// `REPETITION` defaults to a single run when absent.
pub fn repetition(children: &[Node]) -> u32 {
    let Some(text) = text_field(children, "REPETITION") else {
        return 1;
    };
    text.trim().parse().unwrap_or_else(|_| {
        warn!(repetition = %text, "REPETITION is not a count, assuming 1");
        1
    })
}

pub fn verdict(children: &[Node]) -> Option<Verdict> {
    path_text(children, VERDICT_PATH).map(|v| Verdict::parse(v.trim()))
}

pub fn expected_result(children: &[Node]) -> Option<String> {
    path_value(children, EXPECTED_RESULT_PATH).and_then(deep_text)
}

pub fn execution_time(children: &[Node]) -> Option<f64> {
    let text = text_field(children, "EXECUTION-TIME")?;
    match text.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() => Some(secs),
        _ => {
            warn!(execution_time = %text, "EXECUTION-TIME is not a number");
            None
        }
    }
}

/// Date of the first document revision.
pub fn date(children: &[Node]) -> Option<DateTime<Utc>> {
    let text = path_text(children, DATE_PATH)?;
    let parsed = parse_date(&text);
    if parsed.is_none() {
        warn!(date = %text, "unparseable DOC-REVISION DATE");
    }
    parsed
}

/// RFC 3339 first; a date-time without offset, or a bare date, is taken as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| ndt.and_utc())
}

fn literal_value(children: &[Node]) -> Option<String> {
    path_text(children, VALUE_PATH).or_else(|| first_value(children, "LITERAL-VALUE").and_then(deep_text))
}

/// `ARGUMENT-LIST/ARGUMENTS/TEST-ARGUMENT-ELEMENT` entries in document order.
pub fn arguments(children: &[Node]) -> Vec<Argument> {
    let Some(args) = path_value(children, ARGUMENTS_PATH).and_then(|v| v.as_seq()) else {
        return vec![];
    };

    let mut res = Vec::new();
    for arg in all_values(args, "TEST-ARGUMENT-ELEMENT") {
        let Some(arg) = arg.as_seq() else {
            warn!("TEST-ARGUMENT-ELEMENT is not an element, skipped");
            continue;
        };
        let Some(value) = literal_value(arg) else {
            warn!(desc = ?desc(arg), "TEST-ARGUMENT-ELEMENT without value, skipped");
            continue;
        };
        res.push(Argument {
            desc: desc(arg),
            arg_type: text_field(arg, "TYPE-REF"),
            direction: text_field(arg, "DIRECTION"),
            value,
        });
    }
    res
}

/// `TEST-CONSTANTS/TEST-CONSTANT` name/value pairs in document order.
pub fn test_constants(children: &[Node]) -> Vec<TestConstant> {
    let Some(constants) = first_children(children, "TEST-CONSTANTS") else {
        return vec![];
    };

    all_values(constants, "TEST-CONSTANT")
        .filter_map(|c| c.as_seq())
        .filter_map(|c| match (short_name(c), literal_value(c)) {
            (Some(name), Some(value)) => Some(TestConstant { name, value }),
            (name, _) => {
                warn!(name = ?name, "TEST-CONSTANT without name or value, skipped");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn argument(desc: &str, value: &str) -> Node {
        Node::element(
            "TEST-ARGUMENT-ELEMENT",
            vec![
                Node::element("DESC", vec![Node::text("L-2", desc)]),
                Node::text("DIRECTION", "IN"),
                Node::text("TYPE-REF", "/types/String"),
                Node::element(
                    "LITERAL-VALUE",
                    vec![Node::element(
                        "TEXT-VALUE-SPECIFICATION",
                        vec![Node::text("VALUE", value)],
                    )],
                ),
            ],
        )
    }

    #[test]
    fn short_name_requires_text() {
        assert_eq!(short_name(&[Node::text("SHORT-NAME", "TC1")]).as_deref(), Some("TC1"));
        assert_eq!(short_name(&[Node::element("SHORT-NAME", vec![])]), None);
        assert_eq!(short_name(&[]), None);
    }

    #[test]
    fn execution_time_parses_decimal_text() {
        assert_eq!(execution_time(&[Node::text("EXECUTION-TIME", "1.5")]), Some(1.5));
        assert_eq!(execution_time(&[Node::text("EXECUTION-TIME", "abc")]), None);
        assert_eq!(execution_time(&[]), None);
    }

    #[test]
    fn verdict_reads_nested_path() {
        let children = vec![Node::element(
            "VERDICT-RESULT",
            vec![Node::text("VERDICT", "INCONCLUSIVE")],
        )];
        assert_eq!(verdict(&children), Some(Verdict::Inconclusive));
        assert_eq!(verdict(&[Node::element("VERDICT-RESULT", vec![])]), None);
    }

    #[test]
    fn date_reads_first_revision() {
        let children = vec![Node::element(
            "ADMIN-DATA",
            vec![Node::element(
                "DOC-REVISIONS",
                vec![
                    Node::element("DOC-REVISION", vec![Node::text("DATE", "2023-05-12T10:11:12+02:00")]),
                    Node::element("DOC-REVISION", vec![Node::text("DATE", "2020-01-01")]),
                ],
            )],
        )];
        let d = date(&children).unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2023, 5, 12, 8));
    }

    #[test]
    fn parse_date_accepts_local_and_bare_forms() {
        assert!(parse_date("2023-05-12T10:11:12").is_some());
        assert!(parse_date("2023-05-12T10:11:12.250").is_some());
        assert!(parse_date("2023-05-12").is_some());
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn arguments_keep_order_and_skip_valueless() {
        let children = vec![Node::element(
            "ARGUMENT-LIST",
            vec![Node::element(
                "ARGUMENTS",
                vec![
                    argument("speed", "50"),
                    Node::element("TEST-ARGUMENT-ELEMENT", vec![Node::text("DIRECTION", "OUT")]),
                    argument("gear", "3"),
                ],
            )],
        )];
        let args = arguments(&children);
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].desc.as_deref(), Some("speed"));
        assert_eq!(args[0].value, "50");
        assert_eq!(args[0].direction.as_deref(), Some("IN"));
        assert_eq!(args[0].arg_type.as_deref(), Some("/types/String"));
        assert_eq!(args[1].value, "3");
    }

    #[test]
    fn test_constants_collects_named_values() {
        let constant = |name: &str, value: &str| {
            Node::element(
                "TEST-CONSTANT",
                vec![
                    Node::text("SHORT-NAME", name),
                    Node::element(
                        "LITERAL-VALUE",
                        vec![Node::element(
                            "TEXT-VALUE-SPECIFICATION",
                            vec![Node::text("VALUE", value)],
                        )],
                    ),
                ],
            )
        };
        let children = vec![Node::element(
            "TEST-CONSTANTS",
            vec![constant("TT_TESTSCRIPT_ID", "42"), constant("OTHER", "x")],
        )];
        let constants = test_constants(&children);
        assert_eq!(constants.len(), 2);
        assert_eq!(constants[0].name, "TT_TESTSCRIPT_ID");
        assert_eq!(constants[0].value, "42");
    }

    #[test]
    fn repetition_defaults_to_one() {
        assert_eq!(repetition(&[]), 1);
        assert_eq!(repetition(&[Node::text("REPETITION", "0")]), 0);
        assert_eq!(repetition(&[Node::text("REPETITION", "x")]), 1);
    }
}

//! Recursive walk of the expected document.
//!
//! Every leaf of `expected` is looked up at the same path in `actual` and
//! classified. Objects are expanded key by key in declaration order and
//! arrays element by element, except:
//!
//! - an object whose leaves are all `null` is scored as one opaque field,
//!   so a "not applicable" block counts once instead of once per child;
//! - an empty array is scored as one field and compared structurally.

use serde::Serialize;
use serde_json::Value;

use crate::classify::{Lookup, classify};
use crate::path::FieldPath;
use crate::{ActualValue, EvalError, FieldResult, Report};

/// Compare an extracted document against its ground truth.
///
/// Pure and deterministic: the same inputs always produce the same report,
/// with results ordered depth-first by the expected document.
pub fn compare(expected: &Value, actual: &Value) -> Report {
    let mut results = Vec::new();
    let root = FieldPath::root();
    let actual = Lookup::Present(actual);

    match expected {
        Value::Object(map) => {
            for (key, value) in map {
                walk(&root.child(key), value, actual.key(key), &mut results);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, value) in items.iter().enumerate() {
                walk(&root.index(i), value, actual.index(i), &mut results);
            }
        }
        leaf => score(root, leaf, actual, &mut results),
    }

    let report = Report::from_results(results);
    let s = &report.summary_metrics;
    tracing::debug!(
        fields = s.total(),
        exact = s.exact_matches,
        partial = s.partial_matches,
        mismatches = s.mismatches,
        missing = s.missing_fields,
        "comparison complete"
    );
    report
}

/// Compare two typed documents by first converting them to document trees.
///
/// Fails with [`EvalError::UnsupportedValue`] when either side contains
/// something that has no document-tree representation, such as a map with
/// non-string keys.
pub fn compare_serializable<E, A>(expected: &E, actual: &A) -> Result<Report, EvalError>
where
    E: Serialize + ?Sized,
    A: Serialize + ?Sized,
{
    let expected = serde_json::to_value(expected)
        .map_err(|e| EvalError::UnsupportedValue(format!("expected document: {e}")))?;
    let actual = serde_json::to_value(actual)
        .map_err(|e| EvalError::UnsupportedValue(format!("actual document: {e}")))?;
    Ok(compare(&expected, &actual))
}

fn walk(path: &FieldPath, expected: &Value, actual: Lookup<'_>, out: &mut Vec<FieldResult>) {
    match expected {
        Value::Object(_) if is_all_null(expected) => score(path.clone(), expected, actual, out),
        Value::Object(map) => {
            for (key, value) in map {
                walk(&path.child(key), value, actual.key(key), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, value) in items.iter().enumerate() {
                walk(&path.index(i), value, actual.index(i), out);
            }
        }
        _ => score(path.clone(), expected, actual, out),
    }
}

fn score(path: FieldPath, expected: &Value, actual: Lookup<'_>, out: &mut Vec<FieldResult>) {
    let status = classify(expected, actual);
    tracing::trace!(path = %path, status = status.as_str(), "field scored");
    out.push(FieldResult {
        path,
        expected: expected.clone(),
        actual: actual
            .value()
            .map_or(ActualValue::Absent, |v| ActualValue::Present(v.clone())),
        status,
    });
}

/// True when every leaf below `value` is `null`. Empty containers qualify.
fn is_all_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.values().all(is_all_null),
        Value::Array(items) => items.iter().all(is_all_null),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;
    use serde_json::json;

    fn paths(report: &Report) -> Vec<String> {
        report.results().iter().map(|r| r.path.to_string()).collect()
    }

    #[test]
    fn flat_object_scores_each_key_in_order() {
        let expected = json!({"title": "Mr", "surname": "Smith", "deceased": false});
        let actual = json!({"deceased": false, "surname": "Smith", "title": "Mr"});
        let report = compare(&expected, &actual);
        assert_eq!(paths(&report), vec!["title", "surname", "deceased"]);
        assert!(report.results().iter().all(|r| r.status == Status::ExactMatch));
    }

    #[test]
    fn nested_objects_expand_with_dotted_paths() {
        let expected = json!({"donor_details": {"surname": "Smith", "forenames": "Jane"}});
        let actual = json!({"donor_details": {"surname": "Smyth"}});
        let report = compare(&expected, &actual);
        assert_eq!(
            paths(&report),
            vec!["donor_details.surname", "donor_details.forenames"]
        );
        assert_eq!(report.field("donor_details.surname").unwrap().status, Status::PartialMatch);
        assert_eq!(report.field("donor_details.forenames").unwrap().status, Status::Missing);
    }

    #[test]
    fn missing_section_marks_every_leaf_missing() {
        let expected = json!({"nominated_bank_account": {
            "account_holder_name": "J Smith",
            "account_number": "12345678",
            "sort_code": null
        }});
        let report = compare(&expected, &json!({}));
        assert_eq!(report.results().len(), 3);
        assert!(report.results().iter().all(|r| r.status == Status::Missing));
        assert!(report.results().iter().all(|r| r.actual.is_absent()));
    }

    #[test]
    fn broken_chain_through_scalar_is_absent() {
        let expected = json!({"trustee": {"not_uk_details": {"nationality": "French"}}});
        let actual = json!({"trustee": {"not_uk_details": null}});
        let report = compare(&expected, &actual);
        assert_eq!(
            report.field("trustee.not_uk_details.nationality").unwrap().status,
            Status::Missing
        );
    }

    #[test]
    fn all_null_block_is_one_opaque_field() {
        let expected = json!({"security_information": {
            "username": "jsmith",
            "security_questions": {"mother_maiden_name": null, "first_school_name": null}
        }});
        let actual = json!({"security_information": {
            "username": "jsmith",
            "security_questions": {"mother_maiden_name": "Jones", "first_school_name": null}
        }});
        let report = compare(&expected, &actual);
        assert_eq!(
            paths(&report),
            vec![
                "security_information.username",
                "security_information.security_questions"
            ]
        );
        assert_eq!(
            report
                .field("security_information.security_questions")
                .unwrap()
                .status,
            Status::Mismatch
        );
    }

    #[test]
    fn opaque_block_missing_in_actual() {
        let expected = json!({"block": {"a": null}});
        let report = compare(&expected, &json!({"other": 1}));
        assert_eq!(report.field("block").unwrap().status, Status::Missing);
    }

    #[test]
    fn empty_object_counts_as_one_field() {
        let expected = json!({"extra": {}});
        assert_eq!(
            compare(&expected, &json!({"extra": {}})).field("extra").unwrap().status,
            Status::ExactMatch
        );
        assert_eq!(
            compare(&expected, &json!({"extra": null})).field("extra").unwrap().status,
            Status::Mismatch
        );
    }

    #[test]
    fn arrays_align_by_position() {
        let expected = json!({"sigs": [
            {"name": "A Smith", "date": "1/1/2020"},
            {"name": "B Jones", "date": "2/2/2020"}
        ]});
        let actual = json!({"sigs": [
            {"name": "A Smith", "date": "01/01/2020"}
        ]});
        let report = compare(&expected, &actual);
        assert_eq!(
            paths(&report),
            vec!["sigs[0].name", "sigs[0].date", "sigs[1].name", "sigs[1].date"]
        );
        assert_eq!(report.field("sigs[0].name").unwrap().status, Status::ExactMatch);
        assert_eq!(report.field("sigs[0].date").unwrap().status, Status::PartialMatch);
        assert_eq!(report.field("sigs[1].name").unwrap().status, Status::Missing);
        assert_eq!(report.field("sigs[1].date").unwrap().status, Status::Missing);
    }

    #[test]
    fn extra_actual_elements_are_ignored() {
        let expected = json!({"tags": ["a"]});
        let actual = json!({"tags": ["a", "b", "c"]});
        let report = compare(&expected, &actual);
        assert_eq!(paths(&report), vec!["tags[0]"]);
        assert_eq!(report.summary_metrics.exact_matches, 1);
    }

    #[test]
    fn empty_expected_array_is_one_leaf() {
        let expected = json!({"trustee_signatures": []});
        let report = compare(&expected, &json!({"trustee_signatures": [{"name": "x"}]}));
        assert_eq!(paths(&report), vec!["trustee_signatures"]);
        assert_eq!(report.results()[0].status, Status::Mismatch);
    }

    #[test]
    fn array_where_object_expected_is_absent_below() {
        let expected = json!({"sigs": [{"name": "A"}]});
        let actual = json!({"sigs": {"name": "A"}});
        let report = compare(&expected, &actual);
        assert_eq!(report.field("sigs[0].name").unwrap().status, Status::Missing);
    }

    #[test]
    fn scalar_root_is_single_field() {
        let report = compare(&json!("abc"), &json!("abc"));
        assert_eq!(paths(&report), vec![""]);
        assert_eq!(report.results()[0].status, Status::ExactMatch);
    }

    #[test]
    fn root_array_is_expanded() {
        let report = compare(&json!([{"a": 1}]), &json!([{"a": 2}]));
        assert_eq!(paths(&report), vec!["[0].a"]);
        assert_eq!(report.results()[0].status, Status::Mismatch);
    }

    #[test]
    fn empty_root_scores_nothing() {
        let report = compare(&json!({}), &json!({"a": 1}));
        assert!(report.results().is_empty());
        assert_eq!(report.summary_metrics.total(), 0);
    }

    #[test]
    fn inputs_are_not_modified() {
        let expected = json!({"a": {"b": null}, "c": [1, 2]});
        let actual = json!({"a": {"b": 1}});
        let (e0, a0) = (expected.clone(), actual.clone());
        let _ = compare(&expected, &actual);
        assert_eq!(expected, e0);
        assert_eq!(actual, a0);
    }

    #[test]
    fn dotted_key_does_not_collide_with_nested_path() {
        let expected = json!({"a.b": "x", "a": {"b": "y"}});
        let actual = json!({"a.b": "x", "a": {"b": "z"}});
        let report = compare(&expected, &actual);
        assert_eq!(paths(&report), vec![r"a\.b", "a.b"]);
        assert_eq!(report.field(r"a\.b").unwrap().status, Status::ExactMatch);
        assert_eq!(report.field("a.b").unwrap().status, Status::Mismatch);

        let value = report.to_value().unwrap();
        let detailed = value["detailed_results"].as_object().unwrap();
        assert_eq!(detailed.len(), 2);
        assert_eq!(detailed[r"a\.b"]["status"], json!("exact_match"));
        assert_eq!(detailed["a.b"]["status"], json!("mismatch"));
    }

    #[derive(serde::Serialize)]
    struct Signature {
        name: Option<String>,
        date: Option<String>,
    }

    #[test]
    fn serializable_inputs_are_compared() {
        let expected = Signature {
            name: Some("Jane".into()),
            date: Some("1/1/1980".into()),
        };
        let actual = Signature {
            name: Some("Jane".into()),
            date: None,
        };
        let report = compare_serializable(&expected, &actual).unwrap();
        assert_eq!(report.field("name").unwrap().status, Status::ExactMatch);
        assert_eq!(report.field("date").unwrap().status, Status::Mismatch);
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut expected = std::collections::BTreeMap::new();
        expected.insert((1, 2), "x");
        let err = compare_serializable(&expected, &json!({})).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedValue(_)));
    }
}

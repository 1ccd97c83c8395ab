//! Shape checks for request fields supplied as untyped JSON
//!
//! Each validator either returns the typed form of its input or fails with
//! [`Error::InvalidParameter`] naming the field and the accepted kinds. `null`
//! stands for an absent optional field. Typed construction through
//! [`crate::params::RequestParams`] setters cannot produce an invalid shape and
//! does not need these checks.

use crate::params::{field, TagSelector, ValueFilter, ValueKind};
use crate::tag::{TagId, TimePoint};
use crate::{Error, Result};
use serde_json::Value;

pub(crate) const TAG_ID_KINDS: &str = "string, composite id, or list of them";
const TIME_KINDS: &str = "string or integer";
const VALUE_KINDS: &str = "type tag {\"kind\": ...} or list of type tags";

/// Timestamp field: string or integer
pub fn validate_time(name: &'static str, value: &Value) -> Result<Option<TimePoint>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(TimePoint::Text(s.clone()))),
        Value::Number(n) => n
            .as_i64()
            .map(|v| Some(TimePoint::Epoch(v)))
            .ok_or_else(|| Error::invalid(name, TIME_KINDS)),
        _ => Err(Error::invalid(name, TIME_KINDS)),
    }
}

/// Tag id: a string, a composite id, or a list whose every element is one of those
pub fn validate_tag_id(value: &Value) -> Result<TagSelector> {
    match value {
        Value::String(_) | Value::Object(_) => Ok(TagSelector::One(TagId::from_json(value)?)),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(_) | Value::Object(_) => TagId::from_json(item),
                _ => Err(Error::invalid(field::TAG_ID, TAG_ID_KINDS)),
            })
            .collect::<Result<Vec<_>>>()
            .map(TagSelector::Many),
        _ => Err(Error::invalid(field::TAG_ID, TAG_ID_KINDS)),
    }
}

/// Maximum sample count: absent or a non-negative integer
pub fn validate_max_count(value: &Value) -> Result<Option<u64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_u64()
            .map(Some)
            .ok_or_else(|| Error::invalid(field::MAX_COUNT, "non-negative integer")),
        _ => Err(Error::invalid(field::MAX_COUNT, "non-negative integer")),
    }
}

/// Time step in microseconds: absent or an integer
pub fn validate_time_step(value: &Value) -> Result<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| Error::invalid(field::TIME_STEP, "integer")),
        _ => Err(Error::invalid(field::TIME_STEP, "integer")),
    }
}

/// Value filter: absent, one type tag, or a list of type tags
///
/// A type tag is an object `{"kind": "int"}`. A bare string such as `"int"` is a
/// raw value, not a type tag, and is rejected.
pub fn validate_value(value: &Value) -> Result<Option<ValueFilter>> {
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => type_tag(value).map(|kind| Some(ValueFilter::One(kind))),
        Value::Array(items) => items
            .iter()
            .map(type_tag)
            .collect::<Result<Vec<_>>>()
            .map(|kinds| Some(ValueFilter::Many(kinds))),
        _ => Err(Error::invalid(field::VALUE, VALUE_KINDS)),
    }
}

fn type_tag(value: &Value) -> Result<ValueKind> {
    value
        .as_object()
        .filter(|map| map.len() == 1)
        .and_then(|map| map.get("kind"))
        .and_then(Value::as_str)
        .and_then(ValueKind::parse)
        .ok_or_else(|| Error::invalid(field::VALUE, VALUE_KINDS))
}

/// Boolean toggle: absent or a bool
pub fn validate_flag(name: &'static str, value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        _ => Err(Error::invalid(name, "boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_of(err: Error) -> &'static str {
        match err {
            Error::InvalidParameter { field, .. } => field,
            other => panic!("expected InvalidParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_time_accepts_string_and_integer() {
        assert_eq!(
            validate_time("from", &json!("2024-01-01")).unwrap(),
            Some(TimePoint::Text("2024-01-01".to_string()))
        );
        assert_eq!(
            validate_time("to", &json!(1_700_000_000_i64)).unwrap(),
            Some(TimePoint::Epoch(1_700_000_000))
        );
        assert_eq!(validate_time("from", &Value::Null).unwrap(), None);
    }

    #[test]
    fn test_time_rejects_other_shapes() {
        for bad in [json!([1, 2]), json!(1.5), json!(true), json!({"t": 1})] {
            assert_eq!(field_of(validate_time("from", &bad).unwrap_err()), "from");
        }
    }

    #[test]
    fn test_tag_id_shapes() {
        assert_eq!(
            validate_tag_id(&json!("t1")).unwrap(),
            TagSelector::One(TagId::from("t1"))
        );
        assert_eq!(
            validate_tag_id(&json!(["b", "a", "b"])).unwrap(),
            TagSelector::from(vec!["b", "a", "b"])
        );
        assert_eq!(field_of(validate_tag_id(&json!(42)).unwrap_err()), "tagId");
        assert_eq!(field_of(validate_tag_id(&json!(["a", 1])).unwrap_err()), "tagId");
        assert!(matches!(
            validate_tag_id(&json!([{"tagName": "a"}])).unwrap_err(),
            Error::MalformedIdentifier(_)
        ));
    }

    #[test]
    fn test_counts_reject_numeric_strings() {
        assert_eq!(validate_max_count(&json!(10)).unwrap(), Some(10));
        assert_eq!(validate_max_count(&Value::Null).unwrap(), None);
        assert_eq!(field_of(validate_max_count(&json!("10")).unwrap_err()), "maxCount");
        assert_eq!(field_of(validate_max_count(&json!(-1)).unwrap_err()), "maxCount");

        assert_eq!(validate_time_step(&json!(-500)).unwrap(), Some(-500));
        assert_eq!(field_of(validate_time_step(&json!("1000")).unwrap_err()), "timeStep");
        assert_eq!(field_of(validate_time_step(&json!(0.5)).unwrap_err()), "timeStep");
    }

    #[test]
    fn test_value_requires_type_tags() {
        assert_eq!(
            validate_value(&json!({"kind": "int"})).unwrap(),
            Some(ValueFilter::One(ValueKind::Int))
        );
        assert_eq!(
            validate_value(&json!([{"kind": "float"}, {"kind": "string"}])).unwrap(),
            Some(ValueFilter::Many(vec![ValueKind::Float, ValueKind::String]))
        );
        assert_eq!(validate_value(&Value::Null).unwrap(), None);

        for bad in [
            json!("int"),
            json!(["int"]),
            json!(5),
            json!({"kind": "decimal"}),
            json!({"kind": "int", "extra": true}),
        ] {
            assert_eq!(field_of(validate_value(&bad).unwrap_err()), "value");
        }
    }

    #[test]
    fn test_flags() {
        assert_eq!(validate_flag("actual", &json!(false)).unwrap(), Some(false));
        assert_eq!(field_of(validate_flag("format", &json!("yes")).unwrap_err()), "format");
    }
}

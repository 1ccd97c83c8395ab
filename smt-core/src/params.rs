//! Parameters of a historical data query
//!
//! [`RequestParams`] is the typed form of a `get data` request. It can be built in
//! code with chained setters, or from caller-supplied JSON using wire field names,
//! in which case every field goes through the checks in [`crate::validation`].

use crate::tag::{TagId, TimePoint};
use crate::validation;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire field names
pub mod field {
    pub const TAG_ID: &str = "tagId";
    pub const FROM: &str = "from";
    pub const TO: &str = "to";
    pub const MAX_COUNT: &str = "maxCount";
    pub const TIME_STEP: &str = "timeStep";
    pub const FORMAT: &str = "format";
    pub const ACTUAL: &str = "actual";
    pub const VALUE: &str = "value";
}

/// Kind of value used as a query filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
    String,
    Bool,
}

impl ValueKind {
    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "int" | "integer" => Some(Self::Int),
            "float" | "double" => Some(Self::Float),
            "string" | "str" => Some(Self::String),
            "bool" | "boolean" => Some(Self::Bool),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
        }
    }
}

/// Single value kind or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValueFilter {
    One(ValueKind),
    Many(Vec<ValueKind>),
}

impl From<ValueKind> for ValueFilter {
    fn from(v: ValueKind) -> Self {
        Self::One(v)
    }
}

impl From<Vec<ValueKind>> for ValueFilter {
    fn from(v: Vec<ValueKind>) -> Self {
        Self::Many(v)
    }
}

/// Tag ids a query applies to, order preserved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TagSelector {
    One(TagId),
    Many(Vec<TagId>),
}

impl From<TagId> for TagSelector {
    fn from(v: TagId) -> Self {
        Self::One(v)
    }
}

impl From<&str> for TagSelector {
    fn from(v: &str) -> Self {
        Self::One(v.into())
    }
}

impl From<String> for TagSelector {
    fn from(v: String) -> Self {
        Self::One(v.into())
    }
}

impl From<Vec<TagId>> for TagSelector {
    fn from(v: Vec<TagId>) -> Self {
        Self::Many(v)
    }
}

impl From<Vec<&str>> for TagSelector {
    fn from(v: Vec<&str>) -> Self {
        Self::Many(v.into_iter().map(TagId::from).collect())
    }
}

/// Historical data query; only `tag_id` is mandatory
///
/// Serialises to the wire form: camelCase field names, absent fields omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    pub tag_id: TagSelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<TimePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<TimePoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u64>,
    /// Step between returned values, microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_step: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ValueFilter>,
    /// Render timestamps as ISO 8601 strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<bool>,
    /// Only physically recorded, non-interpolated values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<bool>,
}

impl RequestParams {
    pub fn new(tag_id: impl Into<TagSelector>) -> Self {
        Self {
            tag_id: tag_id.into(),
            from: None,
            to: None,
            max_count: None,
            time_step: None,
            value: None,
            format: None,
            actual: None,
        }
    }

    pub fn from(mut self, from: impl Into<TimePoint>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn to(mut self, to: impl Into<TimePoint>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn max_count(mut self, max_count: u64) -> Self {
        self.max_count = Some(max_count);
        self
    }

    pub fn time_step(mut self, micros: i64) -> Self {
        self.time_step = Some(micros);
        self
    }

    pub fn value(mut self, value: impl Into<ValueFilter>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn format(mut self, format: bool) -> Self {
        self.format = Some(format);
        self
    }

    pub fn actual(mut self, actual: bool) -> Self {
        self.actual = Some(actual);
        self
    }

    /// Build parameters from a JSON object keyed by wire field names
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = as_object(value)?;
        let tag_id = map
            .get(field::TAG_ID)
            .ok_or_else(|| Error::invalid(field::TAG_ID, validation::TAG_ID_KINDS))?;

        let mut params = Self::new(validation::validate_tag_id(tag_id)?);
        params.apply(map)?;
        Ok(params)
    }

    /// Apply a JSON patch keyed by wire field names
    ///
    /// Present keys are validated and set, `null` clears an optional field, absent
    /// keys are left alone. On error the parameters are unchanged.
    pub fn update(&mut self, patch: &Value) -> Result<()> {
        let mut updated = self.clone();
        updated.apply(as_object(patch)?)?;
        *self = updated;
        Ok(())
    }

    fn apply(&mut self, map: &Map<String, Value>) -> Result<()> {
        for (key, value) in map {
            match key.as_str() {
                field::TAG_ID => self.tag_id = validation::validate_tag_id(value)?,
                field::FROM => self.from = validation::validate_time(field::FROM, value)?,
                field::TO => self.to = validation::validate_time(field::TO, value)?,
                field::MAX_COUNT => self.max_count = validation::validate_max_count(value)?,
                field::TIME_STEP => self.time_step = validation::validate_time_step(value)?,
                field::VALUE => self.value = validation::validate_value(value)?,
                field::FORMAT => self.format = validation::validate_flag(field::FORMAT, value)?,
                field::ACTUAL => self.actual = validation::validate_flag(field::ACTUAL, value)?,
                unknown => {
                    tracing::debug!(field = %unknown, "Rejecting unknown query field");
                    return Err(Error::invalid("params", "only known query fields"));
                }
            }
        }
        Ok(())
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid("params", "object keyed by field name"))
}

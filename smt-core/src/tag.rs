//! Tag metadata and pending sample buffer
//!
//! A [`Tag`] is a named time-series channel. It is created either by the caller or
//! from the descriptors returned by `connect`, accumulates samples through
//! [`Tag::add_sample`], and is drained by a successful `set_data` round-trip.
//!
//! Sample mutation is guarded by a per-tag `parking_lot::Mutex`, so a tag can be
//! shared behind an `Arc` between several producers. Operations on different tags
//! never contend.

use crate::{Error, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

const TAG_NAME_KEY: &str = "tagName";
const PARENT_OBJECT_ID_KEY: &str = "parentObjectId";

/// Timestamp or sequence key: either free-form text or an epoch-like integer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimePoint {
    Epoch(i64),
    Text(String),
}

impl From<i64> for TimePoint {
    fn from(v: i64) -> Self {
        Self::Epoch(v)
    }
}

impl From<i32> for TimePoint {
    fn from(v: i32) -> Self {
        Self::Epoch(v.into())
    }
}

impl From<&str> for TimePoint {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for TimePoint {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for TimePoint {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Text(v.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

/// Numeric sample value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SampleValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for SampleValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for SampleValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for SampleValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// One `{x, y, q}` triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub x: TimePoint,
    pub y: SampleValue,
    /// Quality code, 0 when unspecified
    #[serde(default)]
    pub q: i32,
}

impl Sample {
    pub fn new(x: impl Into<TimePoint>, y: impl Into<SampleValue>) -> Self {
        Self::with_quality(x, y, 0)
    }

    pub fn with_quality(x: impl Into<TimePoint>, y: impl Into<SampleValue>, q: i32) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
            q,
        }
    }
}

/// Tag identifier: a flat name or a `(tagName, parentObjectId)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagId {
    Name(String),
    Composite {
        tag_name: String,
        parent_object_id: String,
    },
}

impl TagId {
    pub fn composite(tag_name: impl Into<String>, parent_object_id: impl Into<String>) -> Self {
        Self::Composite {
            tag_name: tag_name.into(),
            parent_object_id: parent_object_id.into(),
        }
    }

    /// Parse an identifier from its wire form
    ///
    /// A string becomes [`TagId::Name`]. An object must carry exactly the
    /// `tagName` and `parentObjectId` keys, both strings.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(name) => Ok(Self::Name(name.clone())),
            Value::Object(map) => Self::from_map(map),
            other => Err(Error::MalformedIdentifier(format!(
                "expected string or object, got {}",
                other
            ))),
        }
    }

    fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let field = |key: &str| map.get(key).and_then(Value::as_str);

        match (field(TAG_NAME_KEY), field(PARENT_OBJECT_ID_KEY)) {
            (Some(tag_name), Some(parent_object_id)) if map.len() == 2 => {
                Ok(Self::composite(tag_name, parent_object_id))
            }
            _ => Err(Error::MalformedIdentifier(format!(
                "composite id must contain exactly '{}' and '{}': {}",
                TAG_NAME_KEY,
                PARENT_OBJECT_ID_KEY,
                Value::Object(map.clone())
            ))),
        }
    }

    /// The tag name, whichever form the id takes
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Composite { tag_name, .. } => tag_name,
        }
    }

    pub fn parent_object_id(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Composite {
                parent_object_id, ..
            } => Some(parent_object_id),
        }
    }
}

impl From<&str> for TagId {
    fn from(v: &str) -> Self {
        Self::Name(v.to_string())
    }
}

impl From<String> for TagId {
    fn from(v: String) -> Self {
        Self::Name(v)
    }
}

impl Serialize for TagId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Name(name) => serializer.serialize_str(name),
            Self::Composite {
                tag_name,
                parent_object_id,
            } => {
                let mut s = serializer.serialize_struct("TagId", 2)?;
                s.serialize_field(TAG_NAME_KEY, tag_name)?;
                s.serialize_field(PARENT_OBJECT_ID_KEY, parent_object_id)?;
                s.end()
            }
        }
    }
}

#[derive(Debug, Default)]
struct PendingSamples {
    samples: Vec<Sample>,
    /// Sequence number of `samples[0]`; grows as acknowledged samples are drained
    head: u64,
    /// Bumped whenever the buffer is reset, so stale acknowledgements are ignored
    generation: u64,
}

impl PendingSamples {
    /// Sequence number one past the last pending sample
    fn end(&self) -> u64 {
        self.head + self.samples.len() as u64
    }
}

/// Samples captured for one outgoing batch
#[derive(Debug, Clone)]
pub(crate) struct SampleSnapshot {
    pub samples: Vec<Sample>,
    end: u64,
    generation: u64,
}

/// Named time-series channel with metadata and pending samples
#[derive(Debug)]
pub struct Tag {
    id: TagId,
    attributes: Map<String, Value>,
    pending: Mutex<PendingSamples>,
}

impl Tag {
    pub fn new(id: impl Into<TagId>, attributes: Map<String, Value>) -> Self {
        Self::with_samples(id, attributes, Vec::new())
    }

    pub fn with_samples(
        id: impl Into<TagId>,
        attributes: Map<String, Value>,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            id: id.into(),
            attributes,
            pending: Mutex::new(PendingSamples {
                samples,
                head: 0,
                generation: 0,
            }),
        }
    }

    /// Build a tag from a `{id, attributes}` descriptor as returned by `connect`
    pub fn from_descriptor(descriptor: &Value) -> Result<Self> {
        let id = descriptor
            .get("id")
            .ok_or_else(|| Error::MalformedIdentifier(format!("descriptor has no id: {}", descriptor)))?;
        let attributes = match descriptor.get("attributes") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        Ok(Self::new(TagId::from_json(id)?, attributes))
    }

    /// Wire descriptor `{id, attributes}` of this tag
    pub fn to_descriptor(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "attributes": self.attributes,
        })
    }

    pub fn id(&self) -> &TagId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Parent object id, empty for flat ids
    pub fn parent_object_id(&self) -> &str {
        self.id.parent_object_id().unwrap_or_default()
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Append a sample with quality code 0
    pub fn add_sample(&self, x: impl Into<TimePoint>, y: impl Into<SampleValue>) {
        self.push(Sample::new(x, y));
    }

    pub fn add_sample_with_quality(
        &self,
        x: impl Into<TimePoint>,
        y: impl Into<SampleValue>,
        q: i32,
    ) {
        self.push(Sample::with_quality(x, y, q));
    }

    pub fn push(&self, sample: Sample) {
        self.pending.lock().samples.push(sample);
    }

    /// Drop every pending sample
    pub fn clear_samples(&self) {
        self.replace_samples(Vec::new());
    }

    /// Swap the pending buffer for `samples`
    pub fn replace_samples(&self, samples: Vec<Sample>) {
        let mut pending = self.pending.lock();
        pending.samples = samples;
        pending.head = 0;
        pending.generation += 1;
    }

    /// Copy of the pending samples
    pub fn samples(&self) -> Vec<Sample> {
        self.pending.lock().samples.clone()
    }

    pub fn sample_count(&self) -> usize {
        self.pending.lock().samples.len()
    }

    pub fn has_samples(&self) -> bool {
        !self.pending.lock().samples.is_empty()
    }

    /// Capture the pending samples for sending, `None` when there are none
    pub(crate) fn snapshot(&self) -> Option<SampleSnapshot> {
        let pending = self.pending.lock();
        if pending.samples.is_empty() {
            return None;
        }
        Some(SampleSnapshot {
            samples: pending.samples.clone(),
            end: pending.end(),
            generation: pending.generation,
        })
    }

    /// Remove the samples carried by a confirmed batch
    ///
    /// Samples appended after the snapshot are kept, and samples already drained
    /// by an overlapping batch are not removed twice. If the buffer was reset in
    /// the meantime the acknowledgement no longer applies and nothing is removed.
    pub(crate) fn acknowledge(&self, snapshot: &SampleSnapshot) {
        let mut pending = self.pending.lock();
        if pending.generation != snapshot.generation {
            return;
        }
        let sent = snapshot.end.saturating_sub(pending.head) as usize;
        let sent = sent.min(pending.samples.len());
        pending.samples.drain(..sent);
        pending.head += sent as u64;
    }
}

impl Clone for Tag {
    fn clone(&self) -> Self {
        Self::with_samples(self.id.clone(), self.attributes.clone(), self.samples())
    }
}

impl AsRef<Tag> for Tag {
    fn as_ref(&self) -> &Tag {
        self
    }
}

/// Map every `{id, attributes}` descriptor into a [`Tag`]
pub fn tags_from_descriptors(descriptors: &[Value]) -> Result<Vec<Tag>> {
    descriptors.iter().map(Tag::from_descriptor).collect()
}

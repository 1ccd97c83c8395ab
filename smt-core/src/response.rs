//! Interpretation of decoded platform responses
//!
//! Every response carries an `error` envelope; a non-zero `error.id` becomes
//! [`Error::Server`] whichever operation produced it. The per-operation
//! interpreters run that check first and only then look at the payload.

use crate::request::SetDataBatch;
use crate::tag::{tags_from_descriptors, Tag};
use crate::{Error, Result};
use serde::Deserialize;
use serde_json::Value;

/// Platform error envelope, `id == 0` on success
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub id: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct SourceAttributes {
    #[serde(rename = "smtActive")]
    smt_active: bool,
}

#[derive(Debug, Deserialize)]
struct ConnectBody {
    attributes: SourceAttributes,
    #[serde(default)]
    tags: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GetDataBody {
    data: Vec<Value>,
}

/// Fail with [`Error::Server`] if the envelope reports an error
pub fn check_error(response: &Value) -> Result<()> {
    let envelope = ErrorEnvelope::deserialize(response.get("error").unwrap_or(&Value::Null))?;
    if envelope.id != 0 {
        return Err(Error::Server {
            code: envelope.id,
            message: envelope.message,
        });
    }
    Ok(())
}

/// `connect`: the tags of an active data source
///
/// An inactive source fails with [`Error::SourceInactive`] before any tag is mapped.
pub fn interpret_connect(response: &Value) -> Result<Vec<Tag>> {
    check_error(response)?;
    let body = ConnectBody::deserialize(response)?;
    if !body.attributes.smt_active {
        return Err(Error::SourceInactive);
    }
    tags_from_descriptors(&body.tags)
}

/// `set data`: on success, drain the transmitted samples from the batch's tags
///
/// Tags that were filtered out of the batch are not touched. On failure no tag is
/// modified.
pub fn interpret_set_data(response: &Value, batch: &SetDataBatch<'_>) -> Result<()> {
    check_error(response)?;
    batch.acknowledge();
    Ok(())
}

/// `get data`: the `data` list as returned
pub fn interpret_get_data(response: &Value) -> Result<Vec<Value>> {
    check_error(response)?;
    Ok(GetDataBody::deserialize(response)?.data)
}

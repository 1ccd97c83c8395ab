//! Outbound request construction
//!
//! Builds the parameter set for each platform operation. Everything here is local:
//! a failure means nothing was sent.

use crate::params::RequestParams;
use crate::tag::{Sample, SampleSnapshot, Tag, TagId};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Endpoint paths, relative to the platform base URL
pub mod path {
    pub const CONNECT: &str = "/smt/dataSources/connect";
    pub const SET_DATA: &str = "/smt/data/set";
    pub const GET_DATA: &str = "/smt/data/get";
}

/// Operation path plus its top-level parameters
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub path: &'static str,
    pub params: Map<String, Value>,
}

impl WireRequest {
    fn new(path: &'static str, key: &str, value: Value) -> Self {
        let mut params = Map::new();
        params.insert(key.to_string(), value);
        Self { path, params }
    }

    /// Query-string pairs: strings are sent raw, anything else as compact JSON
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(key, value)| {
                let encoded = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), encoded)
            })
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetDataEntry<'a> {
    tag_id: &'a TagId,
    data: &'a [Sample],
}

/// A set-data request together with the tags and samples it carries
///
/// Kept until the platform answers so that exactly the transmitted samples can be
/// removed from their tags.
#[derive(Debug)]
pub struct SetDataBatch<'a> {
    request: WireRequest,
    entries: Vec<(&'a Tag, SampleSnapshot)>,
}

impl<'a> SetDataBatch<'a> {
    pub fn request(&self) -> &WireRequest {
        &self.request
    }

    /// Tags included in the batch, in call order
    pub fn tags(&self) -> impl Iterator<Item = &'a Tag> + '_ {
        self.entries.iter().map(|(tag, _)| *tag)
    }

    pub fn sample_count(&self) -> usize {
        self.entries.iter().map(|(_, s)| s.samples.len()).sum()
    }

    /// Remove the transmitted samples from every included tag
    pub(crate) fn acknowledge(&self) {
        for (tag, snapshot) in &self.entries {
            tag.acknowledge(snapshot);
        }
    }
}

/// `connect`: `{id: data_source_id}`, the id sent as given
pub fn build_connect(data_source_id: &str) -> WireRequest {
    WireRequest::new(path::CONNECT, "id", Value::String(data_source_id.to_string()))
}

/// `set data`: `{data: [{tagId, data: [{x, y, q}]}]}`
///
/// Tags without pending samples are left out. Fails with [`Error::NoDataToSend`]
/// when no tag carries any.
pub fn build_set_data<'a, T: AsRef<Tag>>(tags: &'a [T]) -> Result<SetDataBatch<'a>> {
    let entries: Vec<(&'a Tag, SampleSnapshot)> = tags
        .iter()
        .map(<T as AsRef<Tag>>::as_ref)
        .filter_map(|tag| tag.snapshot().map(|snapshot| (tag, snapshot)))
        .collect();

    if entries.is_empty() {
        return Err(Error::NoDataToSend);
    }

    let data: Vec<SetDataEntry<'_>> = entries
        .iter()
        .map(|(tag, snapshot)| SetDataEntry {
            tag_id: tag.id(),
            data: &snapshot.samples,
        })
        .collect();
    let request = WireRequest::new(path::SET_DATA, "data", encode("data", &data)?);

    Ok(SetDataBatch { request, entries })
}

/// `get data`: `{params: {tagId, from?, to?, maxCount?, timeStep?, format?, actual?, value?}}`
///
/// Absent fields are omitted, never sent as null. Tag ids keep their order.
pub fn build_get_data(params: &RequestParams) -> Result<WireRequest> {
    Ok(WireRequest::new(
        path::GET_DATA,
        "params",
        encode("params", params)?,
    ))
}

fn encode<T: Serialize + ?Sized>(field: &'static str, value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|_| Error::invalid(field, "JSON-encodable value"))
}

//! Client facade for the SMT platform
//!
//! Each operation validates and builds its request, performs exactly one POST and
//! interprets the answer. Errors are returned to the caller as they are; nothing is
//! retried.

use crate::config::ClientConfig;
use crate::metrics::ClientMetrics;
use crate::params::RequestParams;
use crate::request::{build_connect, build_get_data, build_set_data, WireRequest};
use crate::response::{interpret_connect, interpret_get_data, interpret_set_data};
use crate::tag::Tag;
use crate::transport::HttpTransport;
use crate::Result;
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, instrument};

/// Connector to an SMT platform instance
#[derive(Clone)]
pub struct DataInteractionClient {
    transport: HttpTransport,
    metrics: ClientMetrics,
}

impl DataInteractionClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(&config)?,
            metrics: ClientMetrics::new(),
        })
    }

    /// Client for `base_url` with the default timeout
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(base_url))
    }

    /// Client configured from `SMT_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn metrics(&self) -> &ClientMetrics {
        &self.metrics
    }

    /// Connect to a data source and return its tags
    #[instrument(skip(self))]
    pub async fn connect(&self, data_source_id: &str) -> Result<Vec<Tag>> {
        let result = self.try_connect(data_source_id).await;
        self.observe(result)
    }

    /// Send the pending samples of `tags`
    ///
    /// Tags without samples are skipped. Once the platform confirms, the
    /// transmitted samples are removed from the tags that were sent.
    #[instrument(skip(self, tags), fields(tags = tags.len()))]
    pub async fn set_data<T: AsRef<Tag>>(&self, tags: &[T]) -> Result<()> {
        let result = self.try_set_data(tags).await;
        self.observe(result)
            .map(|sent| self.metrics.record_samples_sent(sent))
    }

    /// Query historical data
    #[instrument(skip(self, params))]
    pub async fn get_data(&self, params: &RequestParams) -> Result<Vec<Value>> {
        let result = self.try_get_data(params).await;
        self.observe(result)
    }

    async fn try_connect(&self, data_source_id: &str) -> Result<Vec<Tag>> {
        let request = build_connect(data_source_id);
        let response = self.round_trip(&request).await?;
        interpret_connect(&response)
    }

    async fn try_set_data<T: AsRef<Tag>>(&self, tags: &[T]) -> Result<usize> {
        let batch = build_set_data(tags)?;
        let response = self.round_trip(batch.request()).await?;
        interpret_set_data(&response, &batch)?;

        debug!(
            tags = batch.tags().count(),
            samples = batch.sample_count(),
            "Batch acknowledged"
        );
        Ok(batch.sample_count())
    }

    async fn try_get_data(&self, params: &RequestParams) -> Result<Vec<Value>> {
        let request = build_get_data(params)?;
        let response = self.round_trip(&request).await?;
        interpret_get_data(&response)
    }

    async fn round_trip(&self, request: &WireRequest) -> Result<Value> {
        self.metrics.record_request();
        let start = Instant::now();
        let response = self.transport.post(request).await?;
        self.metrics
            .record_latency(start.elapsed().as_micros() as u64);
        Ok(response)
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        self.metrics.record_operation();
        if let Err(e) = &result {
            self.metrics.record_failure(e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ValueKind;
    use crate::tag::TagId;
    use crate::{Error, TransportError};
    use mockito::{Matcher, Server};
    use serde_json::{json, Map};
    use std::sync::Arc;

    const OK: &str = r#"{"error": {"id": 0, "message": ""}}"#;

    fn client(server: &Server) -> DataInteractionClient {
        DataInteractionClient::with_base_url(server.url()).unwrap()
    }

    #[tokio::test]
    async fn test_connect_active_source() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/smt/dataSources/connect")
            .match_query(Matcher::UrlEncoded("id".into(), "source1".into()))
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "error": {"id": 0, "message": ""},
                    "attributes": {"smtActive": true},
                    "tags": [
                        {"id": "tag1", "attributes": {"name": "Tag 1"}},
                        {"id": "tag2", "attributes": {"name": "Tag 2"}}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tags = client(&server).connect("source1").await.unwrap();

        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].id(), &TagId::from("tag1"));
        assert_eq!(tags[1].attributes()["name"], "Tag 2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_connect_inactive_source() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/smt/dataSources/connect")
            .match_query(Matcher::Any)
            .with_body(r#"{"error": {"id": 0, "message": ""}, "attributes": {"smtActive": false}, "tags": []}"#)
            .create_async()
            .await;

        let err = client(&server).connect("src1").await.unwrap_err();
        assert!(matches!(err, Error::SourceInactive));
    }

    #[tokio::test]
    async fn test_connect_sends_empty_id_as_given() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/smt/dataSources/connect")
            .match_query(Matcher::UrlEncoded("id".into(), "".into()))
            .with_body(r#"{"error": {"id": 0, "message": ""}, "attributes": {"smtActive": true}, "tags": []}"#)
            .create_async()
            .await;

        let tags = client(&server).connect("").await.unwrap();

        assert!(tags.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_set_data_sends_and_clears_only_tags_with_samples() {
        let mut server = Server::new_async().await;
        let expected = json!([{"tagId": "t1", "data": [{"x": 1, "y": 2, "q": 0}]}]).to_string();
        let mock = server
            .mock("POST", "/smt/data/set")
            .match_query(Matcher::UrlEncoded("data".into(), expected))
            .with_body(OK)
            .create_async()
            .await;

        let first = Arc::new(Tag::new("t1", Map::new()));
        first.add_sample(1, 2);
        let second = Arc::new(Tag::new("t2", Map::new()));

        let client = client(&server);
        client
            .set_data(&[Arc::clone(&first), Arc::clone(&second)])
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(!first.has_samples());
        assert!(!second.has_samples());
        assert_eq!(client.metrics().samples_sent(), 1);
    }

    #[tokio::test]
    async fn test_set_data_without_samples_sends_nothing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let tags = vec![Tag::new("t1", Map::new())];
        let err = client(&server).set_data(&tags).await.unwrap_err();

        assert!(matches!(err, Error::NoDataToSend));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_metrics_separate_operations_from_requests() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/smt/data/set")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let client = client(&server);
        let empty = Tag::new("t0", Map::new());
        client
            .set_data(std::slice::from_ref(&empty))
            .await
            .unwrap_err();

        let tag = Tag::new("t1", Map::new());
        tag.add_sample(1, 1);
        client.set_data(std::slice::from_ref(&tag)).await.unwrap_err();

        let snapshot = client.metrics().snapshot();
        assert_eq!(snapshot.operations_total, 2);
        assert_eq!(snapshot.operations_failed, 2);
        assert_eq!(snapshot.requests_total, 1);
        assert_eq!(snapshot.local_rejections, 1);
        assert_eq!(snapshot.transport_failures, 1);
        assert!(snapshot.operations_failed <= snapshot.operations_total);
    }

    #[tokio::test]
    async fn test_set_data_server_error_keeps_samples() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/smt/data/set")
            .match_query(Matcher::Any)
            .with_body(r#"{"error": {"id": 42, "message": "write rejected"}}"#)
            .create_async()
            .await;

        let tag = Tag::new("t1", Map::new());
        tag.add_sample("2024-01-01T00:00:00Z", 1.5);

        let client = client(&server);
        let err = client
            .set_data(std::slice::from_ref(&tag))
            .await
            .unwrap_err();

        assert_eq!(err.server_code(), Some(42));
        assert!(err.to_string().contains("write rejected"));
        assert_eq!(tag.sample_count(), 1);
        assert_eq!(client.metrics().snapshot().server_errors, 1);
    }

    #[tokio::test]
    async fn test_set_data_http_failure_keeps_samples() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/smt/data/set")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let tag = Tag::new("t1", Map::new());
        tag.add_sample(1, 1);

        let client = client(&server);
        let err = client
            .set_data(std::slice::from_ref(&tag))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(TransportError::Http(_))));
        assert!(tag.has_samples());
        assert_eq!(client.metrics().snapshot().transport_failures, 1);
    }

    #[tokio::test]
    async fn test_get_data_sends_only_present_fields() {
        let mut server = Server::new_async().await;
        let expected = json!({"tagId": "t1", "maxCount": 10}).to_string();
        let mock = server
            .mock("POST", "/smt/data/get")
            .match_query(Matcher::UrlEncoded("params".into(), expected))
            .with_body(
                json!({
                    "error": {"id": 0, "message": ""},
                    "data": [[{"x": "2024-01-01T00:00:00", "y": 5, "q": 0}]]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let data = client(&server)
            .get_data(&RequestParams::new("t1").max_count(10))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(data.len(), 1);
        assert_eq!(data[0][0]["y"], 5);
    }

    #[tokio::test]
    async fn test_get_data_server_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/smt/data/get")
            .match_query(Matcher::Any)
            .with_body(r#"{"error": {"id": 2, "message": "unknown tag"}, "data": []}"#)
            .create_async()
            .await;

        let params = RequestParams::new(vec!["t1", "t2"]).value(ValueKind::Int);
        let err = client(&server).get_data(&params).await.unwrap_err();

        assert_eq!(err.server_code(), Some(2));
    }
}

//! HTTP client wrapper for interacting with Qdrant.

use crate::config::VectorStoreConfig;
use crate::qdrant::{
    VectorStore,
    filters::build_metadata_filter,
    payload::build_point,
    types::{
        DistanceMetric, QueryResponse, QueryResponseResult, ScoredPoint, VectorQuery,
        VectorStoreError,
    },
};
use crate::records::VectorRecord;
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client from the vector store configuration.
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let client = Client::builder().user_agent("finrag/0.1").build()?;

        let base_url =
            normalize_base_url(config.require_url()?).map_err(VectorStoreError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %config
                .api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
        metric: DistanceMetric,
    ) -> Result<(), VectorStoreError> {
        if self.collection_exists(collection_name).await? {
            tracing::info!(collection = collection_name, "Index already exists");
            return Ok(());
        }

        tracing::info!(
            collection = collection_name,
            vector_size,
            metric = metric.as_qdrant(),
            "Index not found; creating"
        );
        self.create_collection(collection_name, vector_size, metric).await?;
        self.ensure_payload_indexes(collection_name).await
    }

    /// Create or update a collection with the specified vector size.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
        metric: DistanceMetric,
    ) -> Result<(), VectorStoreError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": metric.as_qdrant()
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::info!(collection = collection_name, "Index created");
        })
        .await
    }

    /// Upload one batch of vectors, waiting until Qdrant has applied it.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError> {
        if records.is_empty() {
            return Ok(0);
        }

        let points: Vec<Value> = records.into_iter().map(build_point).collect();
        let point_count = points.len();
        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}/points"))
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, points = point_count, "Points upserted");
        })
        .await?;

        Ok(point_count)
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        query: VectorQuery,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        let VectorQuery {
            vector,
            top_k,
            filter,
            include_metadata,
        } = query;

        let mut body = json!({
            "query": vector,
            "limit": top_k,
            "with_payload": include_metadata,
        });
        if let Some(filter_value) = filter.as_ref().and_then(build_metadata_filter)
            && let Some(object) = body.as_object_mut()
        {
            object.insert("filter".into(), filter_value);
        }

        let response = self
            .request(Method::POST, &format!("collections/{collection_name}/points/query"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = VectorStoreError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    /// Ensure payload indexes exist for the fields used by metadata filters.
    pub async fn ensure_payload_indexes(
        &self,
        collection_name: &str,
    ) -> Result<(), VectorStoreError> {
        let fields: [(&str, &str); 3] = [
            ("company", "keyword"),
            ("year", "integer"),
            ("page", "integer"),
        ];

        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index ensured"
                );
            } else if response.status() == StatusCode::CONFLICT {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index already exists"
                );
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = VectorStoreError::UnexpectedStatus { status, body };
                tracing::warn!(
                    collection = collection_name,
                    field,
                    schema,
                    error = %error,
                    "Failed to ensure payload index"
                );
            }
        }

        Ok(())
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, VectorStoreError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = VectorStoreError::UnexpectedStatus { status, body };
                tracing::error!(
                    collection = collection_name,
                    error = %error,
                    "Collection existence check failed"
                );
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), VectorStoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = VectorStoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl VectorStore for QdrantService {
    async fn ensure_index(
        &self,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<(), VectorStoreError> {
        self.create_collection_if_not_exists(name, dimension as u64, metric).await
    }

    async fn upsert(
        &self,
        name: &str,
        records: Vec<VectorRecord>,
    ) -> Result<usize, VectorStoreError> {
        self.upsert_points(name, records).await
    }

    async fn query(
        &self,
        name: &str,
        query: VectorQuery,
    ) -> Result<Vec<ScoredPoint>, VectorStoreError> {
        self.search_points(name, query).await
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qdrant::types::MetadataFilter;
    use crate::records::VectorMetadata;
    use httpmock::{
        Method::{GET, POST, PUT},
        MockServer,
    };

    fn service(server: &MockServer, api_key: Option<&str>) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("finrag-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: api_key.map(str::to_string),
        }
    }

    fn record(page: u32) -> VectorRecord {
        VectorRecord {
            id: format!("00000000-0000-4000-8000-00000000000{page}"),
            vector: vec![0.1, 0.2],
            metadata: VectorMetadata {
                company: "HDFC".into(),
                year: 2024,
                page,
                summarized: "Deposits grew 18%.".into(),
                content: "Deposits grew 18% year on year".into(),
            },
        }
    }

    #[tokio::test]
    async fn missing_index_is_created_with_cosine_metric() {
        let server = MockServer::start_async().await;
        let exists = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/financial-rag");
                then.status(404).body("not found");
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/financial-rag")
                    .header("api-key", "secret")
                    .json_body(json!({ "vectors": { "size": 384, "distance": "Cosine" } }));
                then.status(200).json_body(json!({ "status": "ok", "result": true }));
            })
            .await;
        let indexes = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/financial-rag/index");
                then.status(200).json_body(json!({ "status": "ok" }));
            })
            .await;

        service(&server, Some("secret"))
            .ensure_index("financial-rag", 384, DistanceMetric::Cosine)
            .await
            .expect("ensure index");

        exists.assert();
        create.assert();
        indexes.assert_hits(3);
    }

    #[tokio::test]
    async fn existing_index_is_left_alone() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/financial-rag");
                then.status(200).json_body(json!({ "status": "ok", "result": {} }));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/financial-rag");
                then.status(200);
            })
            .await;

        service(&server, None)
            .ensure_index("financial-rag", 384, DistanceMetric::Cosine)
            .await
            .expect("ensure index");

        create.assert_hits(0);
    }

    #[tokio::test]
    async fn upsert_sends_points_with_metadata() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/financial-rag/points")
                    .query_param("wait", "true")
                    .body_contains("\"company\":\"HDFC\"")
                    .body_contains("\"page\":2");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "result": { "operation_id": 1, "status": "completed" }
                }));
            })
            .await;

        let written = service(&server, None)
            .upsert("financial-rag", vec![record(1), record(2)])
            .await
            .expect("upsert");

        mock.assert();
        assert_eq!(written, 2);
    }

    #[tokio::test]
    async fn upsert_failure_surfaces_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/financial-rag/points");
                then.status(500).body("disk full");
            })
            .await;

        let error = service(&server, None)
            .upsert("financial-rag", vec![record(1)])
            .await
            .expect_err("upsert should fail");

        assert!(matches!(
            error,
            VectorStoreError::UnexpectedStatus { status, ref body }
                if status == StatusCode::INTERNAL_SERVER_ERROR && body == "disk full"
        ));
    }

    #[tokio::test]
    async fn search_points_emits_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/financial-rag/points/query")
                    .json_body(json!({
                        "query": [0.1, 0.2],
                        "limit": 5,
                        "with_payload": true,
                        "filter": {
                            "must": [
                                { "key": "company", "match": { "value": "SBI" } },
                                { "key": "year", "match": { "value": 2023 } }
                            ]
                        }
                    }));
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "points": [
                            {
                                "id": "point-1",
                                "score": 0.87,
                                "payload": { "company": "SBI", "year": 2023, "page": 9 }
                            }
                        ]
                    }
                }));
            })
            .await;

        let results = service(&server, None)
            .query(
                "financial-rag",
                VectorQuery {
                    vector: vec![0.1, 0.2],
                    top_k: 5,
                    filter: Some(MetadataFilter {
                        company: Some("SBI".into()),
                        year: Some(2023),
                        ..Default::default()
                    }),
                    include_metadata: true,
                },
            )
            .await
            .expect("search request");

        mock.assert();
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, "point-1");
        assert!((hit.score - 0.87).abs() < f32::EPSILON);
        let payload = hit.payload.as_ref().expect("payload");
        assert_eq!(payload["page"], 9);
    }

    #[test]
    fn numeric_point_ids_are_stringified() {
        assert_eq!(stringify_point_id(json!(42)), "42");
        assert_eq!(stringify_point_id(json!("abc")), "abc");
        assert_eq!(stringify_point_id(Value::Null), "");
    }
}

use super::{Element, PartitionError, PartitionOptions, Partitioner};
use async_trait::async_trait;
use reqwest::{
    Client,
    multipart::{Form, Part},
};
use serde::Deserialize;
use std::path::Path;

/// Partitioner backed by a hosted Unstructured `general` partition endpoint.
pub struct UnstructuredPartitioner {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct RemoteElement {
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: RemoteMetadata,
}

#[derive(Deserialize, Default)]
struct RemoteMetadata {
    #[serde(default)]
    page_number: Option<u32>,
}

impl UnstructuredPartitioner {
    /// Construct a partitioner posting to `endpoint`.
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self, PartitionError> {
        let http = Client::builder()
            .user_agent("finrag/partition")
            .build()
            .map_err(|error| PartitionError::Service(error.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl Partitioner for UnstructuredPartitioner {
    async fn partition(
        &self,
        path: &Path,
        options: PartitionOptions,
    ) -> Result<Vec<Element>, PartitionError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let file_part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|error| PartitionError::Service(error.to_string()))?;
        let form = Form::new()
            .part("files", file_part)
            .text("strategy", options.strategy.as_str())
            .text(
                "pdf_infer_table_structure",
                options.infer_table_structure.to_string(),
            );

        let mut request = self
            .http
            .post(&self.endpoint)
            .header("accept", "application/json")
            .multipart(form);
        if let Some(key) = self.api_key.as_deref() {
            request = request.header("unstructured-api-key", key);
        }

        tracing::debug!(
            document = %path.display(),
            strategy = options.strategy.as_str(),
            "Requesting remote partition"
        );
        let response = request.send().await.map_err(|error| {
            PartitionError::Service(format!("failed to reach {}: {error}", self.endpoint))
        })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PartitionError::Service(format!(
                "partition API returned {status}: {body}"
            )));
        }

        let elements: Vec<RemoteElement> = response
            .json()
            .await
            .map_err(|error| PartitionError::Service(format!("malformed response: {error}")))?;
        Ok(elements
            .into_iter()
            .map(|element| Element {
                text: element.text,
                page_number: element.metadata.page_number,
            })
            .collect())
    }
}

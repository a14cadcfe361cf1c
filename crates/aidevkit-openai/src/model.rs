use aidevkit_common::crud::ObjectProvider;
use aidevkit_common::request_builder::{Endpoint, HttpMethod};
use aidevkit_common::{async_trait, RequestError};
use serde::{Deserialize, Serialize};

use crate::OpenAI;

/// A model as reported by the models endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub object: String,

    #[serde(default)]
    pub created: u64,

    #[serde(default)]
    pub owned_by: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    data: Vec<ModelInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct DeleteModelResponse {
    #[serde(default)]
    deleted: bool,
}

/// Model management through the generic CRUD provider.
///
/// OpenAI models cannot be created or updated over the API; those operations
/// surface as unsupported-task failures so callers can distinguish them from
/// transport problems.
pub struct Models {
    client: OpenAI,
}

impl Models {
    pub(crate) fn new(client: OpenAI) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectProvider for Models {
    type Object = ModelInfo;
    type CreateParams = ();
    type UpdateParams = ();
    type ListQuery = ();
    type ListPage = Vec<ModelInfo>;

    fn resource_name(&self) -> &str {
        "model"
    }

    async fn create_impl(&self, _params: &()) -> Result<Option<ModelInfo>, RequestError> {
        Err(RequestError::UnsupportedTask(
            "models cannot be created over the API".to_string(),
        ))
    }

    async fn retrieve_impl(&self, id: &str) -> Result<Option<ModelInfo>, RequestError> {
        let builder = self
            .client
            .request_builder()
            .map_err(|_| RequestError::AuthenticationMissing)?;
        let endpoint = Endpoint::new("models", HttpMethod::Get).with_id(id);
        let model: ModelInfo = builder.request(&endpoint).await?;
        Ok((!model.id.is_empty()).then_some(model))
    }

    async fn update_impl(&self, _id: &str, _params: &()) -> Result<Option<ModelInfo>, RequestError> {
        Err(RequestError::UnsupportedTask(
            "models cannot be updated over the API".to_string(),
        ))
    }

    async fn list_impl(&self, _query: &()) -> Result<Option<Vec<ModelInfo>>, RequestError> {
        let builder = self
            .client
            .request_builder()
            .map_err(|_| RequestError::AuthenticationMissing)?;
        let endpoint = Endpoint::new("models", HttpMethod::Get);
        let response: ListModelsResponse = builder.request(&endpoint).await?;
        Ok(Some(response.data))
    }

    async fn delete_impl(&self, id: &str) -> Result<bool, RequestError> {
        let builder = self
            .client
            .request_builder()
            .map_err(|_| RequestError::AuthenticationMissing)?;
        let endpoint = Endpoint::new("models", HttpMethod::Delete).with_id(id);
        let response: DeleteModelResponse = builder.request(&endpoint).await?;
        Ok(response.deleted)
    }
}

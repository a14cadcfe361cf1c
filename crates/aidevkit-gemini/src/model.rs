use aidevkit_common::request_builder::{Endpoint, HttpMethod};
use serde::{Deserialize, Serialize};

use crate::{Gemini, GeminiError};

/// Metadata for one published model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// Resource name, e.g. `models/gemini-2.0-flash`
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub input_token_limit: u64,

    #[serde(default)]
    pub output_token_limit: u64,

    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

/// One page of the model listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl Gemini {
    /// List published models, one page at a time.
    pub async fn list_models(
        &self,
        page_size: Option<u32>,
        page_token: Option<&str>,
    ) -> Result<ListModelsResponse, GeminiError> {
        let builder = self.request_builder()?;
        let mut endpoint = Endpoint::new("models", HttpMethod::Get);
        if let Some(size) = page_size {
            endpoint = endpoint.with_query("pageSize", size.to_string());
        }
        if let Some(token) = page_token {
            endpoint = endpoint.with_query("pageToken", token);
        }
        Ok(builder.request(&endpoint).await?)
    }

    /// Fetch metadata for one model by bare name, e.g. `gemini-2.0-flash`.
    pub async fn get_model(&self, name: &str) -> Result<ModelInfo, GeminiError> {
        let builder = self.request_builder()?;
        let endpoint = Endpoint::new(format!("models/{name}"), HttpMethod::Get);
        Ok(builder.request(&endpoint).await?)
    }
}

//! Generic create/retrieve/update/list/delete orchestration.
//!
//! Provider-specific resources implement the `*_impl` methods; the provided
//! methods wrap them with uniform failure conversion, templated messages and
//! per-operation hooks. Expected failures always travel as an [`OpError`]
//! result, never as a panic.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::RequestError;

/// Minimum wait between a failed retrieve and the create fallback in
/// [`ObjectProvider::retrieve_or_create`].
pub const RETRIEVE_OR_CREATE_DELAY: Duration = Duration::from_millis(500);

/// Failure envelope for CRUD operations.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct OpError {
    pub message: String,
    #[source]
    pub source: Option<RequestError>,
}

impl OpError {
    /// The implementation returned nothing for an operation that must
    /// produce a value.
    fn empty(resource: &str, operation: &str) -> Self {
        Self {
            message: format!("{resource} {operation} failed: empty result"),
            source: None,
        }
    }

    fn failed(resource: &str, operation: &str, source: RequestError) -> Self {
        Self {
            message: format!("{resource} {operation} failed: {source}"),
            source: Some(source),
        }
    }
}

pub type OpResult<T> = Result<T, OpError>;

/// Uniform CRUD wrapper over an abstract resource type.
#[async_trait]
pub trait ObjectProvider: Send + Sync {
    type Object: Send + Sync;
    type CreateParams: Send + Sync + ?Sized;
    type UpdateParams: Send + Sync + ?Sized;
    type ListQuery: Send + Sync + ?Sized;
    type ListPage: Send + Sync;

    /// Human-readable resource name used in failure messages.
    fn resource_name(&self) -> &str;

    async fn create_impl(
        &self,
        params: &Self::CreateParams,
    ) -> Result<Option<Self::Object>, RequestError>;

    async fn retrieve_impl(&self, id: &str) -> Result<Option<Self::Object>, RequestError>;

    async fn update_impl(
        &self,
        id: &str,
        params: &Self::UpdateParams,
    ) -> Result<Option<Self::Object>, RequestError>;

    async fn list_impl(
        &self,
        query: &Self::ListQuery,
    ) -> Result<Option<Self::ListPage>, RequestError>;

    async fn delete_impl(&self, id: &str) -> Result<bool, RequestError>;

    /// Hooks raised after the matching operation succeeds, before the result
    /// is returned. Default no-ops.
    fn on_create(&self, _object: &Self::Object) {}
    fn on_retrieve(&self, _object: &Self::Object) {}
    fn on_update(&self, _object: &Self::Object) {}
    fn on_list(&self, _page: &Self::ListPage) {}
    fn on_delete(&self, _id: &str) {}

    async fn create(&self, params: &Self::CreateParams) -> OpResult<Self::Object> {
        match self.create_impl(params).await {
            Ok(Some(object)) => {
                self.on_create(&object);
                Ok(object)
            }
            Ok(None) => Err(OpError::empty(self.resource_name(), "create")),
            Err(err) => Err(OpError::failed(self.resource_name(), "create", err)),
        }
    }

    async fn retrieve(&self, id: &str) -> OpResult<Self::Object> {
        match self.retrieve_impl(id).await {
            Ok(Some(object)) => {
                self.on_retrieve(&object);
                Ok(object)
            }
            Ok(None) => Err(OpError::empty(self.resource_name(), "retrieve")),
            Err(err) => Err(OpError::failed(self.resource_name(), "retrieve", err)),
        }
    }

    /// Attempt retrieve; on failure wait [`RETRIEVE_OR_CREATE_DELAY`] and
    /// attempt create exactly once. No backoff, no further retries.
    async fn retrieve_or_create(
        &self,
        id: &str,
        params: &Self::CreateParams,
    ) -> OpResult<Self::Object> {
        match self.retrieve(id).await {
            Ok(object) => Ok(object),
            Err(err) => {
                warn!(
                    resource = self.resource_name(),
                    id, "retrieve failed, falling back to create: {err}"
                );
                tokio::time::sleep(RETRIEVE_OR_CREATE_DELAY).await;
                self.create(params).await
            }
        }
    }

    async fn update(&self, id: &str, params: &Self::UpdateParams) -> OpResult<Self::Object> {
        match self.update_impl(id, params).await {
            Ok(Some(object)) => {
                self.on_update(&object);
                Ok(object)
            }
            Ok(None) => Err(OpError::empty(self.resource_name(), "update")),
            Err(err) => Err(OpError::failed(self.resource_name(), "update", err)),
        }
    }

    async fn list(&self, query: &Self::ListQuery) -> OpResult<Self::ListPage> {
        match self.list_impl(query).await {
            Ok(Some(page)) => {
                self.on_list(&page);
                Ok(page)
            }
            Ok(None) => Err(OpError::empty(self.resource_name(), "list")),
            Err(err) => Err(OpError::failed(self.resource_name(), "list", err)),
        }
    }

    async fn delete(&self, id: &str) -> OpResult<()> {
        match self.delete_impl(id).await {
            Ok(true) => {
                self.on_delete(id);
                Ok(())
            }
            Ok(false) => Err(OpError::empty(self.resource_name(), "delete")),
            Err(err) => Err(OpError::failed(self.resource_name(), "delete", err)),
        }
    }
}

//! Typed access to the CookedGPT backend.
//!
//! `CookedApi` is the seam between the app actor and the network: the actor
//! only ever talks to an `Arc<dyn CookedApi>`, so tests can swap in a scripted
//! implementation. `HttpApi` is the production implementation.

mod error;
mod http;
mod types;

use async_trait::async_trait;

pub use error::ApiError;
pub use http::{HttpApi, DEFAULT_REQUEST_TIMEOUT};
pub use types::*;

/// Filter label used when no tag is selected.
pub const ALL_TAG: &str = "ALL";

/// Tag filters and custom tag names travel upper-cased and trimmed.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_uppercase()
}

#[async_trait]
pub trait CookedApi: Send + Sync {
    async fn list_tags(&self, token: &str) -> Result<TagCatalog, ApiError>;

    async fn list_custom_tags(&self, token: &str) -> Result<Vec<CustomTag>, ApiError>;

    async fn create_custom_tag(
        &self,
        token: &str,
        name: &str,
        prompt: &str,
    ) -> Result<CustomTag, ApiError>;

    async fn update_custom_tag(
        &self,
        token: &str,
        id: &str,
        name: &str,
        prompt: &str,
    ) -> Result<CustomTag, ApiError>;

    async fn delete_custom_tag(&self, token: &str, id: &str) -> Result<(), ApiError>;

    async fn list_api_keys(&self, token: &str) -> Result<Vec<ApiKey>, ApiError>;

    async fn create_api_key(
        &self,
        token: &str,
        api_key: &str,
        kind: ProviderKind,
    ) -> Result<ApiKey, ApiError>;

    async fn update_api_key(&self, token: &str, id: &str, api_key: &str)
        -> Result<ApiKey, ApiError>;

    async fn delete_api_key(&self, token: &str, id: &str) -> Result<(), ApiError>;

    async fn list_transformations(
        &self,
        token: &str,
        tag: &str,
        page: u32,
    ) -> Result<TransformationPage, ApiError>;

    async fn search_transformations(
        &self,
        token: &str,
        keyword: &str,
        page: u32,
    ) -> Result<TransformationPage, ApiError>;

    async fn delete_transformation(&self, token: &str, id: &str) -> Result<(), ApiError>;

    async fn transform(
        &self,
        token: &str,
        request: &TransformRequest,
    ) -> Result<TransformationResult, ApiError>;

    async fn list_models(&self, token: &str, page: u32) -> Result<Vec<Model>, ApiError>;

    async fn get_profile(&self, token: &str) -> Result<UserProfile, ApiError>;
}

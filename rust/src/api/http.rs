use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    normalize_tag, ApiError, ApiKey, CookedApi, CustomTag, CustomTagList, Model, ProviderKind,
    TagCatalog, TransformRequest, TransformationPage, TransformationResult, UserProfile,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Append path segments to the base URL. Segments are percent-encoded,
    /// so ids and tags like `GEN Z` are safe to pass through.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::Transport(format!("invalid base url {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, token: &str, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ApiError::MissingToken);
        }
        Ok(self
            .client
            .request(method, self.url(segments)?)
            .bearer_auth(token)
            .timeout(self.timeout))
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send(req).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send(&self, req: RequestBuilder) -> Result<String, ApiError> {
        let resp = req.send().await.map_err(ApiError::from_reqwest)?;
        let status = resp.status();
        let body = resp.text().await.map_err(ApiError::from_reqwest)?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "api: request failed");
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl CookedApi for HttpApi {
    async fn list_tags(&self, token: &str) -> Result<TagCatalog, ApiError> {
        self.send_json(self.request(Method::GET, token, &["user", "tags"])?)
            .await
    }

    async fn list_custom_tags(&self, token: &str) -> Result<Vec<CustomTag>, ApiError> {
        let list: CustomTagList = self
            .send_json(self.request(Method::GET, token, &["user", "custom-tags"])?)
            .await?;
        Ok(list.data)
    }

    async fn create_custom_tag(
        &self,
        token: &str,
        name: &str,
        prompt: &str,
    ) -> Result<CustomTag, ApiError> {
        let req = self
            .request(Method::POST, token, &["user", "custom-tags"])?
            .json(&json!({ "name": normalize_tag(name), "prompt": prompt }));
        self.send_json(req).await
    }

    async fn update_custom_tag(
        &self,
        token: &str,
        id: &str,
        name: &str,
        prompt: &str,
    ) -> Result<CustomTag, ApiError> {
        let req = self
            .request(Method::PUT, token, &["user", "custom-tags"])?
            .json(&json!({ "id": id, "name": normalize_tag(name), "prompt": prompt }));
        self.send_json(req).await
    }

    async fn delete_custom_tag(&self, token: &str, id: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, token, &["user", "custom-tags", id])?)
            .await
            .map(|_| ())
    }

    async fn list_api_keys(&self, token: &str) -> Result<Vec<ApiKey>, ApiError> {
        self.send_json(self.request(Method::GET, token, &["api-key", "all"])?)
            .await
    }

    async fn create_api_key(
        &self,
        token: &str,
        api_key: &str,
        kind: ProviderKind,
    ) -> Result<ApiKey, ApiError> {
        let req = self
            .request(Method::POST, token, &["api-key", "create"])?
            .json(&json!({ "apiKey": api_key.trim(), "type": kind }));
        self.send_json(req).await
    }

    async fn update_api_key(
        &self,
        token: &str,
        id: &str,
        api_key: &str,
    ) -> Result<ApiKey, ApiError> {
        let req = self
            .request(Method::PUT, token, &["api-key", "update"])?
            .json(&json!({ "id": id, "apiKey": api_key.trim() }));
        self.send_json(req).await
    }

    async fn delete_api_key(&self, token: &str, id: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, token, &["api-key", id])?)
            .await
            .map(|_| ())
    }

    async fn list_transformations(
        &self,
        token: &str,
        tag: &str,
        page: u32,
    ) -> Result<TransformationPage, ApiError> {
        let tag = normalize_tag(tag);
        let req = self
            .request(Method::GET, token, &["user", "transformations", &tag])?
            .query(&[("page", page)]);
        self.send_json(req).await
    }

    async fn search_transformations(
        &self,
        token: &str,
        keyword: &str,
        page: u32,
    ) -> Result<TransformationPage, ApiError> {
        let req = self
            .request(
                Method::GET,
                token,
                &["user", "transformations", "search", "for"],
            )?
            .query(&[("keyword", keyword.trim().to_string()), ("page", page.to_string())]);
        self.send_json(req).await
    }

    async fn delete_transformation(&self, token: &str, id: &str) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, token, &["user", "transformations", id])?)
            .await
            .map(|_| ())
    }

    async fn transform(
        &self,
        token: &str,
        request: &TransformRequest,
    ) -> Result<TransformationResult, ApiError> {
        let req = self
            .request(Method::POST, token, &["transform"])?
            .json(request);
        self.send_json(req).await
    }

    async fn list_models(&self, token: &str, page: u32) -> Result<Vec<Model>, ApiError> {
        let req = self
            .request(Method::GET, token, &["ai-model", "all"])?
            .query(&[("page", page)]);
        self.send_json(req).await
    }

    async fn get_profile(&self, token: &str) -> Result<UserProfile, ApiError> {
        self.send_json(self.request(Method::GET, token, &["user", "profile"])?)
            .await
    }
}

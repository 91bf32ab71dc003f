#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cooked_core::api::{
    ApiError, ApiKey, CookedApi, CustomTag, Model, ModelPerformance, ProviderKind, TagCatalog,
    TagPrompt, TransformRequest, Transformation, TransformationPage, TransformationResult,
    UserProfile,
};
use tokio::sync::Semaphore;

pub const PAGE_SIZE: usize = 2;

/// In-memory stand-in for the backend. Mutations and list fetches can be
/// held in flight and scripted to fail; every call is recorded as
/// `"METHOD path"`.
pub struct MockApi {
    custom_tags: Mutex<Vec<CustomTag>>,
    api_keys: Mutex<Vec<ApiKey>>,
    transformations: Mutex<Vec<Transformation>>,
    transform_requests: Mutex<Vec<TransformRequest>>,
    calls: Mutex<Vec<String>>,
    mutation_error: Mutex<Option<ApiError>>,
    hold_mutations: AtomicBool,
    release: Semaphore,
    fetch_error: Mutex<Option<ApiError>>,
    hold_fetches: AtomicBool,
    release_fetches: Semaphore,
    next_id: AtomicU64,
}

pub fn transformation(id: &str, content: &str, tags: &[&str]) -> Transformation {
    Transformation {
        id: id.to_string(),
        author_id: Some("user-1".to_string()),
        model_name: Some("gemini-2.0-flash-lite".to_string()),
        input: format!("input for {id}"),
        content: content.to_string(),
        tags: tags.iter().map(ToString::to_string).collect(),
        created_at: Some("2025-01-01T00:00:00.000Z".to_string()),
        updated_at: None,
    }
}

pub fn custom_tag(id: &str, name: &str, prompt: &str) -> CustomTag {
    CustomTag {
        id: id.to_string(),
        name: name.to_string(),
        prompt: prompt.to_string(),
        created_at: Some("2025-01-01T00:00:00.000Z".to_string()),
        updated_at: Some("2025-01-01T00:00:00.000Z".to_string()),
    }
}

fn model(id: &str, name: &str, kind: ProviderKind) -> Model {
    Model {
        id: id.to_string(),
        name: name.to_string(),
        performance: ModelPerformance::Good,
        kind,
        pro: false,
        speed: 1.8,
        accuracy: 64.0,
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            custom_tags: Mutex::new(vec![custom_tag("tag-1", "PIRATE", "Talk like a pirate")]),
            api_keys: Mutex::new(vec![]),
            transformations: Mutex::new(vec![
                transformation("t1", "roast of my boss", &["SAVAGE"]),
                transformation("t2", "polite decline", &["PRO"]),
                transformation("t3", "another roast", &["SAVAGE"]),
            ]),
            transform_requests: Mutex::new(vec![]),
            calls: Mutex::new(vec![]),
            mutation_error: Mutex::new(None),
            hold_mutations: AtomicBool::new(false),
            release: Semaphore::new(0),
            fetch_error: Mutex::new(None),
            hold_fetches: AtomicBool::new(false),
            release_fetches: Semaphore::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls().iter().any(|c| c == call)
    }

    pub fn transform_requests(&self) -> Vec<TransformRequest> {
        self.transform_requests.lock().unwrap().clone()
    }

    pub fn server_custom_tags(&self) -> Vec<CustomTag> {
        self.custom_tags.lock().unwrap().clone()
    }

    /// Make every following mutation fail with `err` (or succeed with `None`).
    pub fn fail_mutations(&self, err: Option<ApiError>) {
        *self.mutation_error.lock().unwrap() = err;
    }

    /// Park mutations after they are recorded until `release` is called.
    pub fn hold_mutations(&self) {
        self.hold_mutations.store(true, Ordering::SeqCst);
    }

    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    /// Make custom-tag, key and history list fetches fail with `err`.
    pub fn fail_fetches(&self, err: Option<ApiError>) {
        *self.fetch_error.lock().unwrap() = err;
    }

    /// Park list fetches after they are recorded until `resume_fetches`.
    pub fn hold_fetches(&self) {
        self.hold_fetches.store(true, Ordering::SeqCst);
    }

    pub fn resume_fetches(&self) {
        self.hold_fetches.store(false, Ordering::SeqCst);
        self.release_fetches.add_permits(64);
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    async fn mutation_gate(&self) -> Result<(), ApiError> {
        if self.hold_mutations.load(Ordering::SeqCst) {
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }
        match self.mutation_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn fetch_gate(&self) -> Result<(), ApiError> {
        if self.hold_fetches.load(Ordering::SeqCst) {
            if let Ok(permit) = self.release_fetches.acquire().await {
                permit.forget();
            }
        }
        match self.fetch_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn server_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn page_of(&self, matches: Vec<Transformation>, page: u32, total: usize) -> TransformationPage {
        let start = (page.saturating_sub(1) as usize) * PAGE_SIZE;
        let found = matches.len();
        let items: Vec<_> = matches.into_iter().skip(start).take(PAGE_SIZE).collect();
        TransformationPage {
            has_next_page: start + items.len() < found,
            transformations: items,
            page,
            total_transformations: Some(total as u32),
            found_transformations: Some(found as u32),
        }
    }
}

fn not_found(what: &str) -> ApiError {
    ApiError::Server {
        status: 404,
        message: Some(format!("{what} not found")),
    }
}

#[async_trait]
impl CookedApi for MockApi {
    async fn list_tags(&self, _token: &str) -> Result<TagCatalog, ApiError> {
        self.record("GET /user/tags");
        Ok(TagCatalog {
            default_tags: vec!["SAVAGE".into(), "PRO".into(), "GEN Z".into()],
            custom_tags: self
                .server_custom_tags()
                .into_iter()
                .map(|t| TagPrompt {
                    name: t.name,
                    prompt: t.prompt,
                })
                .collect(),
        })
    }

    async fn list_custom_tags(&self, _token: &str) -> Result<Vec<CustomTag>, ApiError> {
        self.record("GET /user/custom-tags");
        self.fetch_gate().await?;
        Ok(self.server_custom_tags())
    }

    async fn create_custom_tag(
        &self,
        _token: &str,
        name: &str,
        prompt: &str,
    ) -> Result<CustomTag, ApiError> {
        self.record("POST /user/custom-tags");
        self.mutation_gate().await?;
        let tag = custom_tag(&self.server_id("tag"), &name.to_uppercase(), prompt);
        self.custom_tags.lock().unwrap().push(tag.clone());
        Ok(tag)
    }

    async fn update_custom_tag(
        &self,
        _token: &str,
        id: &str,
        name: &str,
        prompt: &str,
    ) -> Result<CustomTag, ApiError> {
        self.record("PUT /user/custom-tags");
        self.mutation_gate().await?;
        let mut tags = self.custom_tags.lock().unwrap();
        let tag = tags
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Tag"))?;
        tag.name = name.to_uppercase();
        tag.prompt = prompt.to_string();
        Ok(tag.clone())
    }

    async fn delete_custom_tag(&self, _token: &str, id: &str) -> Result<(), ApiError> {
        self.record(format!("DELETE /user/custom-tags/{id}"));
        self.mutation_gate().await?;
        self.custom_tags.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn list_api_keys(&self, _token: &str) -> Result<Vec<ApiKey>, ApiError> {
        self.record("GET /api-key/all");
        self.fetch_gate().await?;
        Ok(self.api_keys.lock().unwrap().clone())
    }

    async fn create_api_key(
        &self,
        _token: &str,
        api_key: &str,
        kind: ProviderKind,
    ) -> Result<ApiKey, ApiError> {
        self.record("POST /api-key/create");
        self.mutation_gate().await?;
        let key = ApiKey {
            id: self.server_id("key"),
            api_key: api_key.to_string(),
            kind,
            created_at: Some("2025-02-01T00:00:00.000Z".into()),
            updated_at: Some("2025-02-01T00:00:00.000Z".into()),
        };
        self.api_keys.lock().unwrap().push(key.clone());
        Ok(key)
    }

    async fn update_api_key(
        &self,
        _token: &str,
        id: &str,
        api_key: &str,
    ) -> Result<ApiKey, ApiError> {
        self.record("PUT /api-key/update");
        self.mutation_gate().await?;
        let mut keys = self.api_keys.lock().unwrap();
        let key = keys
            .iter_mut()
            .find(|k| k.id == id)
            .ok_or_else(|| not_found("Key"))?;
        key.api_key = api_key.to_string();
        Ok(key.clone())
    }

    async fn delete_api_key(&self, _token: &str, id: &str) -> Result<(), ApiError> {
        self.record(format!("DELETE /api-key/{id}"));
        self.mutation_gate().await?;
        self.api_keys.lock().unwrap().retain(|k| k.id != id);
        Ok(())
    }

    async fn list_transformations(
        &self,
        _token: &str,
        tag: &str,
        page: u32,
    ) -> Result<TransformationPage, ApiError> {
        self.record(format!("GET /user/transformations/{tag}?page={page}"));
        self.fetch_gate().await?;
        let all = self.transformations.lock().unwrap().clone();
        let total = all.len();
        let matches = all
            .into_iter()
            .filter(|t| tag == "ALL" || t.tags.iter().any(|x| x == tag))
            .collect();
        Ok(self.page_of(matches, page, total))
    }

    async fn search_transformations(
        &self,
        _token: &str,
        keyword: &str,
        page: u32,
    ) -> Result<TransformationPage, ApiError> {
        self.record(format!(
            "GET /user/transformations/search/for?keyword={keyword}&page={page}"
        ));
        self.fetch_gate().await?;
        let all = self.transformations.lock().unwrap().clone();
        let total = all.len();
        let matches = all
            .into_iter()
            .filter(|t| t.content.contains(keyword) || t.input.contains(keyword))
            .collect();
        Ok(self.page_of(matches, page, total))
    }

    async fn delete_transformation(&self, _token: &str, id: &str) -> Result<(), ApiError> {
        self.record(format!("DELETE /user/transformations/{id}"));
        self.mutation_gate().await?;
        self.transformations.lock().unwrap().retain(|t| t.id != id);
        Ok(())
    }

    async fn transform(
        &self,
        _token: &str,
        request: &TransformRequest,
    ) -> Result<TransformationResult, ApiError> {
        self.record("POST /transform");
        self.transform_requests.lock().unwrap().push(request.clone());
        Ok(TransformationResult {
            content: format!("cooked: {}", request.content),
            tags: request.tags.clone(),
            model_name: Some(request.model.clone()),
        })
    }

    async fn list_models(&self, _token: &str, page: u32) -> Result<Vec<Model>, ApiError> {
        self.record(format!("GET /ai-model/all?page={page}"));
        Ok(match page {
            1 => vec![
                model("m-1", "gpt-4o-mini", ProviderKind::Openai),
                model("m-2", "gemini-2.0-flash", ProviderKind::Gemini),
            ],
            2 => vec![model("m-3", "llama-3.3-70b", ProviderKind::Openrouter)],
            _ => vec![],
        })
    }

    async fn get_profile(&self, _token: &str) -> Result<UserProfile, ApiError> {
        self.record("GET /user/profile");
        let body = serde_json::json!({
            "totalTransformations": self.transformations.lock().unwrap().len(),
            "user": { "createdAt": "2025-01-01T00:00:00.000Z" },
        });
        serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

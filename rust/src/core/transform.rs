// Model catalog paging and the transform request itself.

use crate::api::{normalize_tag, ApiError, Model, TransformRequest, TransformationResult};
use crate::cache::{FeedPage, PageRequest};
use crate::state::{ListStatus, TransformState};
use crate::updates::InternalEvent;

use super::config::AppConfig;
use super::AppCore;

pub(super) const MAX_INPUT_CHARS: usize = 7000;
const DEFAULT_TAG: &str = "SAVAGE";
const MODELS_FILTER: &str = "all";

pub(super) fn initial_transform_state(config: &AppConfig) -> TransformState {
    TransformState {
        selected_tags: vec![DEFAULT_TAG.to_string()],
        selected_model: None,
        default_model_name: config.default_model().name,
        max_input_chars: MAX_INPUT_CHARS as u32,
        result: None,
    }
}

impl AppCore {
    pub(super) fn refresh_models(&mut self) {
        self.models.clear();
        self.models.set_filter(MODELS_FILTER);
        self.load_models_page();
    }

    pub(super) fn load_more_models(&mut self) {
        if self.models.filter().is_none() {
            self.models.set_filter(MODELS_FILTER);
        }
        self.load_models_page();
    }

    fn load_models_page(&mut self) {
        let Some(token) = self.fetch_token() else {
            return;
        };
        let Some(request) = self.models.load_next() else {
            return;
        };

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = api.list_models(&token, request.page).await;
            Self::send_internal(
                &tx,
                InternalEvent::ModelsPageFetched {
                    session,
                    request,
                    result,
                },
            );
        });
    }

    pub(super) fn models_page_fetched(
        &mut self,
        request: PageRequest,
        result: Result<Vec<Model>, ApiError>,
    ) {
        // The models endpoint has no continuation flag; an empty page ends it.
        let result = result
            .map(|models| {
                let has_more = !models.is_empty();
                FeedPage::new(models, request.page, has_more)
            })
            .map_err(|e| {
                tracing::warn!(%e, page = request.page, "models: page fetch failed");
                e.user_message("Couldn't load models")
            });
        self.models.complete(&request, result);
    }

    pub(super) fn select_model(&mut self, model_id: &str) {
        let model = self.models.items().into_iter().find(|m| m.id == model_id);
        if model.is_none() {
            tracing::debug!(model_id, "models: selected model not loaded");
            return;
        }
        self.state.transform.selected_model = model;
    }

    pub(super) fn set_transform_tags(&mut self, tags: Vec<String>) {
        let mut selected: Vec<String> = Vec::with_capacity(tags.len());
        for tag in tags.iter().map(|t| normalize_tag(t)) {
            if !tag.is_empty() && !selected.contains(&tag) {
                selected.push(tag);
            }
        }
        self.state.transform.selected_tags = selected;
    }

    pub(super) fn submit_transformation(&mut self, content: String) {
        let content = content.trim().to_string();
        if content.is_empty() {
            self.toast_error("Enter some text to transform", None);
            return;
        }
        if content.chars().count() > MAX_INPUT_CHARS {
            self.toast_error(
                "Text is too long",
                Some(format!("Keep it under {MAX_INPUT_CHARS} characters")),
            );
            return;
        }
        if self.state.transform.selected_tags.is_empty() {
            self.toast_error("Pick at least one tag", None);
            return;
        }
        let Some(token) = self.require_token() else {
            return;
        };

        let request = match &self.state.transform.selected_model {
            Some(model) => TransformRequest {
                content,
                tags: self.state.transform.selected_tags.clone(),
                model: model.name.clone(),
                kind: model.kind,
                model_id: Some(model.id.clone()),
            },
            None => {
                let fallback = self.config.default_model();
                TransformRequest {
                    content,
                    tags: self.state.transform.selected_tags.clone(),
                    model: fallback.name,
                    kind: fallback.kind,
                    model_id: fallback.id,
                }
            }
        };

        // Only the newest submission's result is shown.
        self.transform_token += 1;
        let token_id = self.transform_token;
        self.set_busy(|b| b.transforming = true);

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = api.transform(&token, &request).await;
            Self::send_internal(
                &tx,
                InternalEvent::TransformCompleted {
                    session,
                    token: token_id,
                    result,
                },
            );
        });
    }

    pub(super) fn transform_completed(
        &mut self,
        token: u64,
        result: Result<TransformationResult, ApiError>,
    ) {
        if token != self.transform_token {
            tracing::debug!(
                token,
                current = self.transform_token,
                "transform: dropping superseded result"
            );
            return;
        }
        self.set_busy(|b| b.transforming = false);
        match result {
            Ok(result) => {
                self.state.transform.result = Some(result);
                // New history entry exists server-side.
                self.history_invalidate_all();
            }
            Err(e) => {
                tracing::warn!(%e, "transform: request failed");
                self.toast_error(e.user_message("Something went wrong"), None);
            }
        }
    }

    pub(super) fn project_models(&mut self) {
        let loaded = self.models.feed().filter(|f| !f.pages().is_empty());
        self.state.models.status = ListStatus::derive(
            loaded.map(|f| f.items().count()),
            self.models.is_loading_first_page(),
            self.models.error().filter(|_| loaded.is_none()),
        );
        self.state.models.items = self.models.items();
        self.state.models.has_more = self.models.has_more();
        self.state.busy.loading_more_models =
            self.models.is_loading() && !self.models.is_loading_first_page();
    }
}

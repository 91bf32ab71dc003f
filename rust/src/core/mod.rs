mod api_keys;
mod config;
mod history;
mod profile;
mod tags;
mod transform;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::api::{ApiError, ApiKey, CookedApi, CustomTag, HttpApi, Model, TagCatalog};
use crate::cache::{CacheStore, FeedLoader, FetchTicket, MutationController, Snapshot};
use crate::state::{
    AppState, AuthState, BusyState, ConfirmationKind, PendingConfirmation, Toast, ToastKind,
};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

pub(crate) use config::default_app_config_json;

/// A mutation request whose response body the actor does not need.
type ApiFuture = Pin<Box<dyn Future<Output = Result<(), ApiError>> + Send>>;

/// Progress of the latest fetch for one cached key.
#[derive(Debug, Default)]
struct FetchState {
    in_flight: Option<FetchTicket>,
    error: Option<String>,
}

impl FetchState {
    fn start(&mut self, ticket: FetchTicket) {
        self.in_flight = Some(ticket);
    }

    fn finish(&mut self, error: Option<String>) {
        self.in_flight = None;
        self.error = error;
    }

    /// Stop waiting on `ticket` after its result was dropped as superseded.
    fn abandon(&mut self, ticket: &FetchTicket) {
        if self.in_flight.as_ref() == Some(ticket) {
            self.in_flight = None;
        }
    }

    fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }
}

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    config: config::AppConfig,
    runtime: tokio::runtime::Runtime,
    api: Arc<dyn CookedApi>,

    token: Option<String>,
    // Bumped on every sign-in/sign-out; async results from older sessions are dropped.
    session: u64,
    placeholder_seq: u64,

    tag_catalog: CacheStore<TagCatalog>,
    tag_catalog_fetch: FetchState,
    custom_tags: CacheStore<Snapshot<CustomTag>>,
    custom_tags_fetch: FetchState,
    custom_tag_mutations: MutationController<CustomTag>,
    api_keys: CacheStore<Snapshot<ApiKey>>,
    api_keys_fetch: FetchState,
    api_key_mutations: MutationController<ApiKey>,

    history: history::HistoryFeeds,
    models: FeedLoader<Model>,

    transform_token: u64,
    profile_token: u64,
    profile_loading: bool,
    profile_error: Option<String>,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        api: Option<Arc<dyn CookedApi>>,
    ) -> Self {
        let config = config::load_app_config(&data_dir);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .enable_io()
            .build()
            .expect("tokio runtime");

        let api = api.unwrap_or_else(|| {
            let base_url = config.api_base_url();
            tracing::info!(%base_url, "api: using http backend");
            Arc::new(HttpApi::new(&base_url).with_timeout(config.request_timeout()))
        });

        let mut state = AppState::empty();
        state.history = history::initial_history_state();
        state.transform = transform::initial_transform_state(&config);

        let this = Self {
            state,
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            config,
            runtime,
            api,
            token: None,
            session: 0,
            placeholder_seq: 0,
            tag_catalog: CacheStore::new(),
            tag_catalog_fetch: FetchState::default(),
            custom_tags: CacheStore::new(),
            custom_tags_fetch: FetchState::default(),
            custom_tag_mutations: MutationController::new(),
            api_keys: CacheStore::new(),
            api_keys_fetch: FetchState::default(),
            api_key_mutations: MutationController::new(),
            history: history::HistoryFeeds::default(),
            models: FeedLoader::new(),
            transform_token: 0,
            profile_token: 0,
            profile_loading: false,
            profile_error: None,
        };

        // Ensure CookedApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    /// Re-project every cached resource into `state` and publish it.
    fn emit_state(&mut self) {
        self.project_tags();
        self.project_api_keys();
        self.project_history();
        self.project_models();
        self.project_profile();
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn toast_success(&mut self, title: impl Into<String>) {
        self.state.toast = Some(Toast {
            kind: ToastKind::Success,
            title: title.into(),
            detail: None,
        });
    }

    // Toasts stay in state until the UI clears them, so a resync via state()
    // still shows them.
    fn toast_error(&mut self, title: impl Into<String>, detail: Option<String>) {
        let title = title.into();
        tracing::info!(%title, "toast");
        self.state.toast = Some(Toast {
            kind: ToastKind::Error,
            title,
            detail,
        });
    }

    fn set_busy(&mut self, f: impl FnOnce(&mut BusyState)) {
        f(&mut self.state.busy);
    }

    fn is_signed_in(&self) -> bool {
        self.token.is_some()
    }

    /// Token for a background fetch. Fetches are skipped silently when
    /// signed out or offline.
    fn fetch_token(&self) -> Option<String> {
        if !self.network_enabled() {
            return None;
        }
        self.token.clone()
    }

    /// Token for a user-initiated request; tells the user when it cannot go
    /// out.
    fn require_token(&mut self) -> Option<String> {
        if self.token.is_none() {
            self.toast_error("Please sign in first", None);
            return None;
        }
        if !self.network_enabled() {
            self.toast_error("Network disabled", None);
            return None;
        }
        self.token.clone()
    }

    fn placeholder_id(&mut self) -> String {
        self.placeholder_seq += 1;
        format!(
            "temp-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            self.placeholder_seq
        )
    }

    /// Post an async result back onto the actor loop.
    fn send_internal(tx: &Sender<CoreMsg>, event: InternalEvent) {
        let _ = tx.send(CoreMsg::Internal(Box::new(event)));
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(action) => {
                // Never log `?action` directly: it can contain tokens and API keys.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action);
            }
            CoreMsg::Internal(internal) => {
                if internal.session() != self.session {
                    tracing::debug!(
                        session = internal.session(),
                        current = self.session,
                        "dropping result from previous session"
                    );
                    return;
                }
                self.handle_internal(*internal);
            }
        }
        self.emit_state();
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::TagsFetched { ticket, result, .. } => {
                self.tag_catalog_fetched(ticket, result)
            }
            InternalEvent::CustomTagsFetched { ticket, result, .. } => {
                self.custom_tags_fetched(ticket, result)
            }
            InternalEvent::ApiKeysFetched { ticket, result, .. } => {
                self.api_keys_fetched(ticket, result)
            }
            InternalEvent::CustomTagMutationSettled {
                mutation, result, ..
            } => self.custom_tag_mutation_settled(mutation, result),
            InternalEvent::ApiKeyMutationSettled {
                mutation, result, ..
            } => self.api_key_mutation_settled(mutation, result),
            InternalEvent::TransformationDeleted { id, result, .. } => {
                self.transformation_deleted(id, result)
            }
            InternalEvent::HistoryPageFetched {
                slot,
                request,
                result,
                ..
            } => self.history_page_fetched(slot, request, result),
            InternalEvent::ModelsPageFetched {
                request, result, ..
            } => self.models_page_fetched(request, result),
            InternalEvent::TransformCompleted { token, result, .. } => {
                self.transform_completed(token, result)
            }
            InternalEvent::ProfileFetched { token, result, .. } => {
                self.profile_fetched(token, result)
            }
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            AppAction::SetAuthToken { token } => self.set_auth_token(token),
            AppAction::SignOut => self.sign_out(),

            AppAction::RefreshTags => self.refresh_tag_catalog(),
            AppAction::RefreshCustomTags => self.refresh_custom_tags(),
            AppAction::CreateCustomTag { name, prompt } => self.create_custom_tag(name, prompt),
            AppAction::UpdateCustomTag { id, name, prompt } => {
                self.update_custom_tag(id, name, prompt)
            }
            AppAction::RequestDeleteCustomTag { id } => self.request_delete_custom_tag(id),

            AppAction::RefreshApiKeys => self.refresh_api_keys(),
            AppAction::CreateApiKey { api_key, provider } => self.create_api_key(api_key, provider),
            AppAction::UpdateApiKey { id, api_key } => self.update_api_key(id, api_key),
            AppAction::RequestDeleteApiKey { id } => self.request_delete_api_key(id),

            AppAction::SelectHistoryTag { tag } => self.select_history_tag(&tag),
            AppAction::SetHistorySearch { query } => self.set_history_search(&query),
            AppAction::LoadMoreHistory => self.load_more_history(),
            AppAction::RefreshHistory => self.refresh_history(),
            AppAction::RequestDeleteTransformation { id } => {
                self.request_delete_transformation(id)
            }

            AppAction::RefreshModels => self.refresh_models(),
            AppAction::LoadMoreModels => self.load_more_models(),
            AppAction::SelectModel { model_id } => self.select_model(&model_id),
            AppAction::SetTransformTags { tags } => self.set_transform_tags(tags),
            AppAction::SubmitTransformation { content } => self.submit_transformation(content),

            AppAction::RefreshProfile => self.refresh_profile(),

            AppAction::ConfirmPending => self.confirm_pending(),
            AppAction::CancelPending => self.state.pending_confirmation = None,
            AppAction::ClearToast => self.state.toast = None,

            AppAction::Foregrounded => self.refresh_stale(),
        }
    }

    fn set_auth_token(&mut self, token: String) {
        let token = token.trim().to_string();
        if token.is_empty() {
            self.sign_out();
            return;
        }
        let was_signed_in = self.is_signed_in();
        // Identity providers rotate tokens; a fresh token keeps the session.
        self.token = Some(token);
        if was_signed_in {
            return;
        }
        self.session += 1;
        self.state.auth = AuthState::SignedIn;
        tracing::info!(session = self.session, "auth: signed in");

        self.refresh_tag_catalog();
        // Screens may have picked a filter while signed out; nothing was
        // fetched for it, so start both feeds over.
        let (tag, query) = (
            self.state.history.selected_tag.clone(),
            self.state.history.search_query.clone(),
        );
        self.history = history::HistoryFeeds::default();
        self.select_history_tag(&tag);
        if !query.is_empty() {
            self.set_history_search(&query);
        }
        self.refresh_models();
    }

    fn sign_out(&mut self) {
        if !self.is_signed_in() {
            return;
        }
        self.token = None;
        self.session += 1;
        tracing::info!(session = self.session, "auth: signed out");

        self.tag_catalog.clear();
        self.tag_catalog_fetch = FetchState::default();
        self.custom_tags.clear();
        self.custom_tags_fetch = FetchState::default();
        self.custom_tag_mutations.clear();
        self.api_keys.clear();
        self.api_keys_fetch = FetchState::default();
        self.api_key_mutations.clear();
        self.history = history::HistoryFeeds::default();
        self.models.clear();
        self.profile_loading = false;
        self.profile_error = None;

        let mut state = AppState::empty();
        state.history = history::initial_history_state();
        state.transform = transform::initial_transform_state(&self.config);
        state.rev = self.state.rev;
        self.state = state;
    }

    fn confirm_pending(&mut self) {
        let Some(PendingConfirmation {
            kind, target_id, ..
        }) = self.state.pending_confirmation.take()
        else {
            return;
        };
        match kind {
            ConfirmationKind::DeleteCustomTag => self.delete_custom_tag(target_id),
            ConfirmationKind::DeleteApiKey => self.delete_api_key(target_id),
            ConfirmationKind::DeleteTransformation => {
                self.delete_transformation(target_id)
            }
        }
    }

    fn refresh_stale(&mut self) {
        if !self.is_signed_in() {
            return;
        }
        if self.tag_catalog.is_stale(&tags::catalog_key()) {
            self.refresh_tag_catalog();
        }
        if self.custom_tags.get(&tags::custom_tags_key()).is_some()
            && self.custom_tags.is_stale(&tags::custom_tags_key())
        {
            self.refresh_custom_tags();
        }
        if self.api_keys.get(&api_keys::api_keys_key()).is_some()
            && self.api_keys.is_stale(&api_keys::api_keys_key())
        {
            self.refresh_api_keys();
        }
        self.reload_visible_history_if_stale();
    }
}

/// Server-style timestamp for placeholder items.
fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

use crate::api::{CustomTag, Model, ProviderKind, TagCatalog, Transformation, TransformationResult};

#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct AppState {
    pub rev: u64,
    pub auth: AuthState,
    pub busy: BusyState,
    pub tags: TagCatalogState,
    pub custom_tags: CustomTagsState,
    pub api_keys: ApiKeysState,
    pub history: HistoryState,
    pub models: ModelsState,
    pub transform: TransformState,
    pub profile: ProfileState,
    pub pending_confirmation: Option<PendingConfirmation>,
    pub toast: Option<Toast>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            auth: AuthState::SignedOut,
            busy: BusyState::idle(),
            tags: TagCatalogState {
                status: ListStatus::Idle,
                catalog: TagCatalog::default(),
            },
            custom_tags: CustomTagsState {
                status: ListStatus::Idle,
                items: vec![],
            },
            api_keys: ApiKeysState {
                status: ListStatus::Idle,
                items: vec![],
            },
            history: HistoryState::empty(),
            models: ModelsState {
                status: ListStatus::Idle,
                items: vec![],
                has_more: false,
            },
            transform: TransformState::empty(),
            profile: ProfileState {
                status: ListStatus::Idle,
                total_transformations: None,
                member_since: None,
                days_active: None,
            },
            pending_confirmation: None,
            toast: None,
        }
    }
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    SignedOut,
    SignedIn,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct BusyState {
    pub transforming: bool,
    pub saving_custom_tag: bool,
    pub saving_api_key: bool,
    pub deleting_transformation: bool,
    pub loading_more_history: bool,
    pub loading_more_models: bool,
}

impl BusyState {
    pub fn idle() -> Self {
        Self {
            transforming: false,
            saving_custom_tag: false,
            saving_api_key: false,
            deleting_transformation: false,
            loading_more_history: false,
            loading_more_models: false,
        }
    }
}

/// What a list screen should render.
#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum ListStatus {
    /// Nothing requested yet.
    Idle,
    Loading,
    Error { message: String },
    Empty,
    Populated,
}

impl ListStatus {
    /// A fetch error replaces the list; otherwise loading only shows while
    /// there is nothing cached to render.
    pub fn derive(len: Option<usize>, loading: bool, error: Option<&str>) -> Self {
        if let Some(message) = error {
            return ListStatus::Error {
                message: message.to_string(),
            };
        }
        match len {
            None if loading => ListStatus::Loading,
            None => ListStatus::Idle,
            Some(0) => ListStatus::Empty,
            Some(_) => ListStatus::Populated,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct TagCatalogState {
    pub status: ListStatus,
    pub catalog: TagCatalog,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct CustomTagsState {
    pub status: ListStatus,
    pub items: Vec<CustomTag>,
}

/// An API key as the UI may show it. The full key never leaves the core.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ApiKeyView {
    pub id: String,
    pub provider: ProviderKind,
    pub masked_key: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    /// Placeholder awaiting server confirmation.
    pub pending: bool,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ApiKeysState {
    pub status: ListStatus,
    pub items: Vec<ApiKeyView>,
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryMode {
    ByTag,
    Search,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct HistoryState {
    pub filters: Vec<String>,
    pub selected_tag: String,
    pub search_query: String,
    /// Which feed `items` comes from: search whenever a query is present.
    pub mode: HistoryMode,
    pub status: ListStatus,
    pub items: Vec<Transformation>,
    pub has_more: bool,
    pub total: Option<u32>,
    pub found: Option<u32>,
}

impl HistoryState {
    pub fn empty() -> Self {
        Self {
            filters: vec![],
            selected_tag: String::new(),
            search_query: String::new(),
            mode: HistoryMode::ByTag,
            status: ListStatus::Idle,
            items: vec![],
            has_more: false,
            total: None,
            found: None,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct ModelsState {
    pub status: ListStatus,
    pub items: Vec<Model>,
    pub has_more: bool,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct TransformState {
    pub selected_tags: Vec<String>,
    /// `None` means the configured default model.
    pub selected_model: Option<Model>,
    pub default_model_name: String,
    pub max_input_chars: u32,
    pub result: Option<TransformationResult>,
}

impl TransformState {
    pub fn empty() -> Self {
        Self {
            selected_tags: vec![],
            selected_model: None,
            default_model_name: String::new(),
            max_input_chars: 0,
            result: None,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ProfileState {
    pub status: ListStatus,
    pub total_transformations: Option<u32>,
    pub member_since: Option<String>,
    pub days_active: Option<u32>,
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmationKind {
    DeleteCustomTag,
    DeleteApiKey,
    DeleteTransformation,
}

/// A destructive action waiting for `ConfirmPending` / `CancelPending`.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct PendingConfirmation {
    pub kind: ConfirmationKind,
    pub target_id: String,
    pub message: String,
}

#[derive(uniffi::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_wins_over_cached_items() {
        assert_eq!(
            ListStatus::derive(Some(3), false, Some("offline")),
            ListStatus::Error {
                message: "offline".into()
            }
        );
    }

    #[test]
    fn loading_only_without_cached_value() {
        assert_eq!(ListStatus::derive(None, true, None), ListStatus::Loading);
        assert_eq!(ListStatus::derive(Some(2), true, None), ListStatus::Populated);
        assert_eq!(ListStatus::derive(Some(0), false, None), ListStatus::Empty);
        assert_eq!(ListStatus::derive(None, false, None), ListStatus::Idle);
    }
}

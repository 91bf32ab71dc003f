use crate::api::ProviderKind;

#[derive(uniffi::Enum, Debug, Clone)]
pub enum AppAction {
    // Auth
    SetAuthToken {
        token: String,
    },
    SignOut,

    // Tags
    RefreshTags,
    RefreshCustomTags,
    CreateCustomTag {
        name: String,
        prompt: String,
    },
    UpdateCustomTag {
        id: String,
        name: String,
        prompt: String,
    },
    RequestDeleteCustomTag {
        id: String,
    },

    // API keys
    RefreshApiKeys,
    CreateApiKey {
        api_key: String,
        provider: ProviderKind,
    },
    UpdateApiKey {
        id: String,
        api_key: String,
    },
    RequestDeleteApiKey {
        id: String,
    },

    // History
    SelectHistoryTag {
        tag: String,
    },
    SetHistorySearch {
        query: String,
    },
    LoadMoreHistory,
    RefreshHistory,
    RequestDeleteTransformation {
        id: String,
    },

    // Models + transform
    RefreshModels,
    LoadMoreModels,
    SelectModel {
        model_id: String,
    },
    SetTransformTags {
        tags: Vec<String>,
    },
    SubmitTransformation {
        content: String,
    },

    // Profile
    RefreshProfile,

    // UI
    ConfirmPending,
    CancelPending,
    ClearToast,

    // Lifecycle
    Foregrounded,
}

impl AppAction {
    /// Log-safe action tag (never includes tokens or API keys).
    pub fn tag(&self) -> &'static str {
        match self {
            // Auth
            AppAction::SetAuthToken { .. } => "SetAuthToken",
            AppAction::SignOut => "SignOut",

            // Tags
            AppAction::RefreshTags => "RefreshTags",
            AppAction::RefreshCustomTags => "RefreshCustomTags",
            AppAction::CreateCustomTag { .. } => "CreateCustomTag",
            AppAction::UpdateCustomTag { .. } => "UpdateCustomTag",
            AppAction::RequestDeleteCustomTag { .. } => "RequestDeleteCustomTag",

            // API keys
            AppAction::RefreshApiKeys => "RefreshApiKeys",
            AppAction::CreateApiKey { .. } => "CreateApiKey",
            AppAction::UpdateApiKey { .. } => "UpdateApiKey",
            AppAction::RequestDeleteApiKey { .. } => "RequestDeleteApiKey",

            // History
            AppAction::SelectHistoryTag { .. } => "SelectHistoryTag",
            AppAction::SetHistorySearch { .. } => "SetHistorySearch",
            AppAction::LoadMoreHistory => "LoadMoreHistory",
            AppAction::RefreshHistory => "RefreshHistory",
            AppAction::RequestDeleteTransformation { .. } => "RequestDeleteTransformation",

            // Models + transform
            AppAction::RefreshModels => "RefreshModels",
            AppAction::LoadMoreModels => "LoadMoreModels",
            AppAction::SelectModel { .. } => "SelectModel",
            AppAction::SetTransformTags { .. } => "SetTransformTags",
            AppAction::SubmitTransformation { .. } => "SubmitTransformation",

            // Profile
            AppAction::RefreshProfile => "RefreshProfile",

            // UI
            AppAction::ConfirmPending => "ConfirmPending",
            AppAction::CancelPending => "CancelPending",
            AppAction::ClearToast => "ClearToast",

            // Lifecycle
            AppAction::Foregrounded => "Foregrounded",
        }
    }
}

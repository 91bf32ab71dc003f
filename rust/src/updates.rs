use crate::api::{
    ApiError, ApiKey, CustomTag, Model, TagCatalog, TransformationPage, TransformationResult,
    UserProfile,
};
use crate::cache::{FetchTicket, MutationId, PageRequest};
use crate::state::AppState;
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySlot {
    ByTag,
    Search,
}

/// Async results posted back to the actor. Every event carries the auth
/// `session` it was started under; results from an earlier session are
/// dropped.
#[derive(Debug)]
pub enum InternalEvent {
    TagsFetched {
        session: u64,
        ticket: FetchTicket,
        result: Result<TagCatalog, ApiError>,
    },
    CustomTagsFetched {
        session: u64,
        ticket: FetchTicket,
        result: Result<Vec<CustomTag>, ApiError>,
    },
    ApiKeysFetched {
        session: u64,
        ticket: FetchTicket,
        result: Result<Vec<ApiKey>, ApiError>,
    },
    CustomTagMutationSettled {
        session: u64,
        mutation: MutationId,
        result: Result<(), ApiError>,
    },
    ApiKeyMutationSettled {
        session: u64,
        mutation: MutationId,
        result: Result<(), ApiError>,
    },
    TransformationDeleted {
        session: u64,
        id: String,
        result: Result<(), ApiError>,
    },
    HistoryPageFetched {
        session: u64,
        slot: HistorySlot,
        request: PageRequest,
        result: Result<TransformationPage, ApiError>,
    },
    ModelsPageFetched {
        session: u64,
        request: PageRequest,
        result: Result<Vec<Model>, ApiError>,
    },
    TransformCompleted {
        session: u64,
        token: u64,
        result: Result<TransformationResult, ApiError>,
    },
    ProfileFetched {
        session: u64,
        token: u64,
        result: Result<UserProfile, ApiError>,
    },
}

impl InternalEvent {
    pub fn session(&self) -> u64 {
        match self {
            InternalEvent::TagsFetched { session, .. }
            | InternalEvent::CustomTagsFetched { session, .. }
            | InternalEvent::ApiKeysFetched { session, .. }
            | InternalEvent::CustomTagMutationSettled { session, .. }
            | InternalEvent::ApiKeyMutationSettled { session, .. }
            | InternalEvent::TransformationDeleted { session, .. }
            | InternalEvent::HistoryPageFetched { session, .. }
            | InternalEvent::ModelsPageFetched { session, .. }
            | InternalEvent::TransformCompleted { session, .. }
            | InternalEvent::ProfileFetched { session, .. } => *session,
        }
    }
}

// Transformation history: a tag-filtered feed and a free-text search feed.
// Both stay loaded side by side; the UI shows search whenever a query is set.

use std::collections::HashMap;

use crate::api::{normalize_tag, ApiError, Transformation, TransformationPage, ALL_TAG};
use crate::cache::{FeedLoader, FeedPage, FeedRollback, PageRequest};
use crate::state::{ConfirmationKind, HistoryMode, HistoryState, ListStatus, PendingConfirmation};
use crate::updates::{HistorySlot, InternalEvent};

use super::AppCore;

const HISTORY_FILTERS: &[&str] = &["All", "Pro", "Savage", "Gen Z", "Insult"];

pub(super) fn initial_history_state() -> HistoryState {
    HistoryState {
        filters: HISTORY_FILTERS.iter().map(ToString::to_string).collect(),
        selected_tag: ALL_TAG.to_string(),
        ..HistoryState::empty()
    }
}

fn feed_page(page: TransformationPage) -> FeedPage<Transformation> {
    FeedPage {
        items: page.transformations,
        page: page.page,
        has_more: page.has_next_page,
        total: page.total_transformations,
        found: page.found_transformations,
    }
}

#[derive(Default)]
pub(super) struct HistoryFeeds {
    by_tag: FeedLoader<Transformation>,
    search: FeedLoader<Transformation>,
    /// Optimistic removals awaiting the server, by transformation id.
    pending_deletes: HashMap<String, Vec<(HistorySlot, FeedRollback<Transformation>)>>,
}

impl HistoryFeeds {
    fn feed_mut(&mut self, slot: HistorySlot) -> &mut FeedLoader<Transformation> {
        match slot {
            HistorySlot::ByTag => &mut self.by_tag,
            HistorySlot::Search => &mut self.search,
        }
    }

    fn feed(&self, slot: HistorySlot) -> &FeedLoader<Transformation> {
        match slot {
            HistorySlot::ByTag => &self.by_tag,
            HistorySlot::Search => &self.search,
        }
    }
}

impl AppCore {
    fn visible_history_slot(&self) -> HistorySlot {
        if self.state.history.search_query.is_empty() {
            HistorySlot::ByTag
        } else {
            HistorySlot::Search
        }
    }

    pub(super) fn select_history_tag(&mut self, tag: &str) {
        let mut tag = normalize_tag(tag);
        if tag.is_empty() {
            tag = ALL_TAG.to_string();
        }
        self.state.history.selected_tag = tag.clone();
        let never_loaded =
            self.history.by_tag.loaded_pages() == 0 && !self.history.by_tag.is_loading();
        if self.history.by_tag.set_filter(&tag)
            || self.history.by_tag.is_stale()
            || never_loaded
        {
            self.history.by_tag.reset();
            self.load_history_page(HistorySlot::ByTag);
        }
    }

    pub(super) fn set_history_search(&mut self, query: &str) {
        let query = query.trim().to_string();
        self.state.history.search_query = query.clone();
        if query.is_empty() {
            self.history.search.clear();
            self.reload_visible_history_if_stale();
            return;
        }
        if self.history.search.set_filter(&query) || self.history.search.is_stale() {
            self.history.search.reset();
            self.load_history_page(HistorySlot::Search);
        }
    }

    pub(super) fn load_more_history(&mut self) {
        self.load_history_page(self.visible_history_slot());
    }

    pub(super) fn refresh_history(&mut self) {
        let slot = self.visible_history_slot();
        self.history.feed_mut(slot).reset();
        self.load_history_page(slot);
    }

    pub(super) fn reload_visible_history_if_stale(&mut self) {
        let slot = self.visible_history_slot();
        if self.history.feed(slot).is_stale() {
            self.refresh_history();
        }
    }

    fn load_history_page(&mut self, slot: HistorySlot) {
        let Some(token) = self.fetch_token() else {
            return;
        };
        let Some(request) = self.history.feed_mut(slot).load_next() else {
            return;
        };

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = match slot {
                HistorySlot::ByTag => {
                    api.list_transformations(&token, &request.filter, request.page)
                        .await
                }
                HistorySlot::Search => {
                    api.search_transformations(&token, &request.filter, request.page)
                        .await
                }
            };
            Self::send_internal(
                &tx,
                InternalEvent::HistoryPageFetched {
                    session,
                    slot,
                    request,
                    result,
                },
            );
        });
    }

    pub(super) fn history_page_fetched(
        &mut self,
        slot: HistorySlot,
        request: PageRequest,
        result: Result<TransformationPage, ApiError>,
    ) {
        let result = result.map(feed_page).map_err(|e| {
            tracing::warn!(
                %e,
                ?slot,
                page = request.page,
                "history: page fetch failed"
            );
            e.user_message("Couldn't load your history")
        });
        self.history.feed_mut(slot).complete(&request, result);
    }

    pub(super) fn request_delete_transformation(&mut self, id: String) {
        self.state.pending_confirmation = Some(PendingConfirmation {
            kind: ConfirmationKind::DeleteTransformation,
            target_id: id,
            message: "Delete this transformation? This can't be undone.".to_string(),
        });
    }

    pub(super) fn delete_transformation(&mut self, id: String) {
        let Some(token) = self.require_token() else {
            return;
        };

        let mut rollbacks = Vec::new();
        for slot in [HistorySlot::ByTag, HistorySlot::Search] {
            if let Some(rollback) = self.history.feed_mut(slot).remove_item(&id) {
                rollbacks.push((slot, rollback));
            }
        }
        self.history
            .pending_deletes
            .entry(id.clone())
            .or_default()
            .extend(rollbacks);

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = api.delete_transformation(&token, &id).await;
            Self::send_internal(
                &tx,
                InternalEvent::TransformationDeleted {
                    session,
                    id,
                    result,
                },
            );
        });
    }

    pub(super) fn transformation_deleted(&mut self, id: String, result: Result<(), ApiError>) {
        let rollbacks = self
            .history
            .pending_deletes
            .remove(&id)
            .unwrap_or_default();

        match result {
            Ok(()) => {
                self.toast_success("Transformation deleted");
                // Loaded pages already reflect the delete; reload when next shown.
                self.history_invalidate_all();
            }
            Err(e) => {
                tracing::warn!(%e, "history: delete failed");
                self.toast_error("Failed to delete transformation", None);
                let visible = self.visible_history_slot();
                for (slot, rollback) in rollbacks.into_iter().rev() {
                    if self.history.feed_mut(slot).restore(rollback) {
                        continue;
                    }
                    // The feed moved on since the removal; converge by refetching.
                    if slot == visible {
                        self.refresh_history();
                    } else {
                        self.history.feed_mut(slot).invalidate();
                    }
                }
            }
        }
    }

    pub(super) fn history_invalidate_all(&mut self) {
        self.history.by_tag.invalidate();
        self.history.search.invalidate();
    }

    pub(super) fn project_history(&mut self) {
        let slot = self.visible_history_slot();
        let feed = self.history.feed(slot);
        let loaded = feed.feed().filter(|f| !f.pages().is_empty());

        let history = &mut self.state.history;
        history.mode = match slot {
            HistorySlot::ByTag => HistoryMode::ByTag,
            HistorySlot::Search => HistoryMode::Search,
        };
        history.status = ListStatus::derive(
            loaded.map(|f| f.items().count()),
            feed.is_loading_first_page(),
            // A failed follow-up page keeps the loaded list visible.
            feed.error().filter(|_| loaded.is_none()),
        );
        history.items = feed.items();
        history.has_more = feed.has_more();
        history.total = loaded.and_then(|f| f.total());
        history.found = loaded.and_then(|f| f.found());

        self.state.busy.loading_more_history = feed.is_loading() && !feed.is_loading_first_page();
        self.state.busy.deleting_transformation = !self.history.pending_deletes.is_empty();
    }
}

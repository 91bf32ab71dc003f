// Tag catalog (style picker) and user-managed custom tags.

use std::sync::Arc;

use crate::api::{normalize_tag, ApiError, CookedApi, CustomTag, TagCatalog};
use crate::cache::{
    FetchTicket, MutationId, MutationKind, OptimisticPatch, ResourceKey, Settlement, Snapshot,
};
use crate::state::{ConfirmationKind, ListStatus, PendingConfirmation};
use crate::updates::InternalEvent;

use super::{now_iso, ApiFuture, AppCore};

pub(super) fn catalog_key() -> ResourceKey {
    ResourceKey::new("tags")
}

pub(super) fn custom_tags_key() -> ResourceKey {
    ResourceKey::new("customTags")
}

impl AppCore {
    pub(super) fn refresh_tag_catalog(&mut self) {
        let Some(token) = self.fetch_token() else {
            return;
        };
        let ticket = self.tag_catalog.begin_fetch(&catalog_key());
        self.tag_catalog_fetch.start(ticket.clone());

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = api.list_tags(&token).await;
            Self::send_internal(
                &tx,
                InternalEvent::TagsFetched {
                    session,
                    ticket,
                    result,
                },
            );
        });
    }

    pub(super) fn tag_catalog_fetched(
        &mut self,
        ticket: FetchTicket,
        result: Result<TagCatalog, ApiError>,
    ) {
        if !self.tag_catalog.is_current(&ticket) {
            tracing::debug!("tags: dropping stale catalog");
            self.tag_catalog_fetch.abandon(&ticket);
            return;
        }
        match result {
            Ok(catalog) => {
                self.tag_catalog.complete_fetch(&ticket, catalog);
                self.tag_catalog_fetch.finish(None);
            }
            Err(e) => {
                tracing::warn!(%e, "tags: catalog fetch failed");
                self.tag_catalog.abandon_fetch(&ticket);
                self.tag_catalog_fetch
                    .finish(Some(e.user_message("Couldn't load tags")));
            }
        }
    }

    pub(super) fn refresh_custom_tags(&mut self) {
        let key = custom_tags_key();
        if self.custom_tag_mutations.has_pending(&key) {
            self.custom_tag_mutations.defer_refetch(key);
            return;
        }
        let Some(token) = self.fetch_token() else {
            return;
        };
        let ticket = self.custom_tags.begin_fetch(&key);
        self.custom_tags_fetch.start(ticket.clone());

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = api.list_custom_tags(&token).await;
            Self::send_internal(
                &tx,
                InternalEvent::CustomTagsFetched {
                    session,
                    ticket,
                    result,
                },
            );
        });
    }

    pub(super) fn custom_tags_fetched(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<CustomTag>, ApiError>,
    ) {
        if !self.custom_tags.is_current(&ticket) {
            tracing::debug!("tags: dropping stale custom tag list");
            self.custom_tags_fetch.abandon(&ticket);
            return;
        }
        match result {
            Ok(items) => {
                self.custom_tags.complete_fetch(&ticket, Snapshot::new(items));
                self.custom_tags_fetch.finish(None);
            }
            Err(e) => {
                tracing::warn!(%e, "tags: custom tag fetch failed");
                self.custom_tags.abandon_fetch(&ticket);
                self.custom_tags_fetch
                    .finish(Some(e.user_message("Couldn't load custom tags")));
            }
        }
    }

    pub(super) fn create_custom_tag(&mut self, name: String, prompt: String) {
        let name = normalize_tag(&name);
        let prompt = prompt.trim().to_string();
        if name.is_empty() || prompt.is_empty() {
            self.toast_error("Name and prompt are required", None);
            return;
        }
        let Some(token) = self.require_token() else {
            return;
        };

        let now = now_iso();
        let placeholder = CustomTag {
            id: self.placeholder_id(),
            name: name.clone(),
            prompt: prompt.clone(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        let mutation = self.custom_tag_mutations.begin(
            &mut self.custom_tags,
            custom_tags_key(),
            OptimisticPatch::Create(placeholder),
        );

        self.spawn_custom_tag_mutation(mutation, move |api| {
            Box::pin(async move {
                api.create_custom_tag(&token, &name, &prompt)
                    .await
                    .map(|_| ())
            })
        });
    }

    pub(super) fn update_custom_tag(&mut self, id: String, name: String, prompt: String) {
        let name = normalize_tag(&name);
        let prompt = prompt.trim().to_string();
        if id.trim().is_empty() || name.is_empty() || prompt.is_empty() {
            self.toast_error("Name and prompt are required", None);
            return;
        }
        let Some(token) = self.require_token() else {
            return;
        };

        let (patched_name, patched_prompt, now) = (name.clone(), prompt.clone(), now_iso());
        let mutation = self.custom_tag_mutations.begin(
            &mut self.custom_tags,
            custom_tags_key(),
            OptimisticPatch::Update {
                id: id.clone(),
                apply: Box::new(move |tag: &CustomTag| CustomTag {
                    name: patched_name,
                    prompt: patched_prompt,
                    updated_at: Some(now),
                    ..tag.clone()
                }),
            },
        );

        self.spawn_custom_tag_mutation(mutation, move |api| {
            Box::pin(async move {
                api.update_custom_tag(&token, &id, &name, &prompt)
                    .await
                    .map(|_| ())
            })
        });
    }

    pub(super) fn request_delete_custom_tag(&mut self, id: String) {
        let name = self
            .custom_tags
            .get(&custom_tags_key())
            .and_then(|s| s.get(&id))
            .map(|t| t.name.clone());
        let message = match name {
            Some(name) => format!("Delete tag \"{name}\"? This can't be undone."),
            None => "Delete this tag? This can't be undone.".to_string(),
        };
        self.state.pending_confirmation = Some(PendingConfirmation {
            kind: ConfirmationKind::DeleteCustomTag,
            target_id: id,
            message,
        });
    }

    pub(super) fn delete_custom_tag(&mut self, id: String) {
        let Some(token) = self.require_token() else {
            return;
        };
        let mutation = self.custom_tag_mutations.begin(
            &mut self.custom_tags,
            custom_tags_key(),
            OptimisticPatch::Delete { id: id.clone() },
        );

        self.spawn_custom_tag_mutation(mutation, move |api| {
            Box::pin(async move { api.delete_custom_tag(&token, &id).await })
        });
    }

    fn spawn_custom_tag_mutation<F>(&self, mutation: MutationId, request: F)
    where
        F: FnOnce(Arc<dyn CookedApi>) -> ApiFuture + Send + 'static,
    {
        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = request(api).await;
            Self::send_internal(
                &tx,
                InternalEvent::CustomTagMutationSettled {
                    session,
                    mutation,
                    result,
                },
            );
        });
    }

    pub(super) fn custom_tag_mutation_settled(
        &mut self,
        mutation: MutationId,
        result: Result<(), ApiError>,
    ) {
        let Some(outcome) =
            self.custom_tag_mutations
                .settle(&mut self.custom_tags, mutation, result.is_ok())
        else {
            return;
        };

        match (&result, outcome.kind) {
            (Ok(()), MutationKind::Create) => self.toast_success("Tag created successfully!"),
            (Ok(()), MutationKind::Update) => self.toast_success("Tag updated successfully!"),
            (Ok(()), MutationKind::Delete) => self.toast_success("Tag deleted successfully!"),
            (Err(e), kind) => {
                tracing::warn!(%e, ?kind, settlement = ?outcome.settlement, "tags: mutation failed");
                let fallback = match kind {
                    MutationKind::Create => "Failed to save tag",
                    MutationKind::Update => "Failed to update tag",
                    MutationKind::Delete => "Failed to delete tag",
                };
                self.toast_error(e.user_message(fallback), None);
            }
        }

        if outcome.settlement != Settlement::RolledBack || outcome.refetch {
            // The style picker merges custom tags into the catalog.
            self.tag_catalog.invalidate(&catalog_key());
            self.refresh_tag_catalog();
        }
        if outcome.refetch {
            self.refresh_custom_tags();
        }
    }

    pub(super) fn project_tags(&mut self) {
        let catalog = self.tag_catalog.get(&catalog_key());
        self.state.tags.status = ListStatus::derive(
            catalog.map(|c| c.default_tags.len() + c.custom_tags.len()),
            self.tag_catalog_fetch.is_loading(),
            self.tag_catalog_fetch.error.as_deref(),
        );
        self.state.tags.catalog = catalog.cloned().unwrap_or_default();

        let key = custom_tags_key();
        let snapshot = self.custom_tags.get(&key);
        self.state.custom_tags.status = ListStatus::derive(
            snapshot.map(Snapshot::len),
            self.custom_tags_fetch.is_loading(),
            self.custom_tags_fetch.error.as_deref(),
        );
        self.state.custom_tags.items = snapshot.map(|s| s.items().to_vec()).unwrap_or_default();
        self.state.busy.saving_custom_tag = self.custom_tag_mutations.has_pending(&key);
    }
}

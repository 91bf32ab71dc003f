// Per-provider API keys. Keys are shape-checked before any request and only
// ever leave the core masked.

use std::sync::Arc;

use crate::api::{ApiError, ApiKey, CookedApi, ProviderKind};
use crate::cache::{FetchTicket, MutationId, MutationKind, OptimisticPatch, ResourceKey, Snapshot};
use crate::key_format::{is_valid_api_key, mask_key};
use crate::state::{ApiKeyView, ConfirmationKind, ListStatus, PendingConfirmation};
use crate::updates::InternalEvent;

use super::{now_iso, ApiFuture, AppCore};

pub(super) fn api_keys_key() -> ResourceKey {
    ResourceKey::new("apiKeys")
}

fn key_view(key: &ApiKey) -> ApiKeyView {
    ApiKeyView {
        id: key.id.clone(),
        provider: key.kind,
        masked_key: mask_key(&key.api_key),
        created_at: key.created_at.clone(),
        updated_at: key.updated_at.clone(),
        pending: key.id.starts_with("temp-"),
    }
}

impl AppCore {
    pub(super) fn refresh_api_keys(&mut self) {
        let key = api_keys_key();
        if self.api_key_mutations.has_pending(&key) {
            self.api_key_mutations.defer_refetch(key);
            return;
        }
        let Some(token) = self.fetch_token() else {
            return;
        };
        let ticket = self.api_keys.begin_fetch(&key);
        self.api_keys_fetch.start(ticket.clone());

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = api.list_api_keys(&token).await;
            Self::send_internal(
                &tx,
                InternalEvent::ApiKeysFetched {
                    session,
                    ticket,
                    result,
                },
            );
        });
    }

    pub(super) fn api_keys_fetched(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<ApiKey>, ApiError>,
    ) {
        if !self.api_keys.is_current(&ticket) {
            tracing::debug!("api keys: dropping stale list");
            self.api_keys_fetch.abandon(&ticket);
            return;
        }
        match result {
            Ok(items) => {
                self.api_keys.complete_fetch(&ticket, Snapshot::new(items));
                self.api_keys_fetch.finish(None);
            }
            Err(e) => {
                tracing::warn!(%e, "api keys: fetch failed");
                self.api_keys.abandon_fetch(&ticket);
                self.api_keys_fetch
                    .finish(Some(e.user_message("Couldn't load API keys")));
            }
        }
    }

    fn reject_invalid_key(&mut self) {
        self.toast_error("Invalid API key", Some("Please enter a valid API key".to_string()));
    }

    pub(super) fn create_api_key(&mut self, api_key: String, provider: ProviderKind) {
        let api_key = api_key.trim().to_string();
        if !is_valid_api_key(&api_key, provider) {
            self.reject_invalid_key();
            return;
        }
        let Some(token) = self.require_token() else {
            return;
        };

        let now = now_iso();
        let placeholder = ApiKey {
            id: self.placeholder_id(),
            api_key: api_key.clone(),
            kind: provider,
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        let mutation = self.api_key_mutations.begin(
            &mut self.api_keys,
            api_keys_key(),
            OptimisticPatch::Create(placeholder),
        );

        self.spawn_api_key_mutation(mutation, move |api| {
            Box::pin(async move {
                api.create_api_key(&token, &api_key, provider)
                    .await
                    .map(|_| ())
            })
        });
    }

    pub(super) fn update_api_key(&mut self, id: String, api_key: String) {
        let api_key = api_key.trim().to_string();
        // A key no longer in the list is checked against the generic rule.
        let provider = self
            .api_keys
            .get(&api_keys_key())
            .and_then(|s| s.get(&id))
            .map(|k| k.kind)
            .unwrap_or(ProviderKind::Other);
        if !is_valid_api_key(&api_key, provider) {
            self.reject_invalid_key();
            return;
        }
        let Some(token) = self.require_token() else {
            return;
        };

        let (patched_key, now) = (api_key.clone(), now_iso());
        let mutation = self.api_key_mutations.begin(
            &mut self.api_keys,
            api_keys_key(),
            OptimisticPatch::Update {
                id: id.clone(),
                apply: Box::new(move |key: &ApiKey| ApiKey {
                    api_key: patched_key,
                    updated_at: Some(now),
                    ..key.clone()
                }),
            },
        );

        self.spawn_api_key_mutation(mutation, move |api| {
            Box::pin(async move {
                api.update_api_key(&token, &id, &api_key)
                    .await
                    .map(|_| ())
            })
        });
    }

    pub(super) fn request_delete_api_key(&mut self, id: String) {
        let provider = self
            .api_keys
            .get(&api_keys_key())
            .and_then(|s| s.get(&id))
            .map(|k| k.kind);
        let message = match provider {
            Some(provider) => format!("Delete your {provider} key? This can't be undone."),
            None => "Delete this API key? This can't be undone.".to_string(),
        };
        self.state.pending_confirmation = Some(PendingConfirmation {
            kind: ConfirmationKind::DeleteApiKey,
            target_id: id,
            message,
        });
    }

    pub(super) fn delete_api_key(&mut self, id: String) {
        let Some(token) = self.require_token() else {
            return;
        };
        let mutation = self.api_key_mutations.begin(
            &mut self.api_keys,
            api_keys_key(),
            OptimisticPatch::Delete { id: id.clone() },
        );

        self.spawn_api_key_mutation(mutation, move |api| {
            Box::pin(async move { api.delete_api_key(&token, &id).await })
        });
    }

    fn spawn_api_key_mutation<F>(&self, mutation: MutationId, request: F)
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
                InternalEvent::ApiKeyMutationSettled {
                    session,
                    mutation,
                    result,
                },
            );
        });
    }

    pub(super) fn api_key_mutation_settled(
        &mut self,
        mutation: MutationId,
        result: Result<(), ApiError>,
    ) {
        let Some(outcome) =
            self.api_key_mutations
                .settle(&mut self.api_keys, mutation, result.is_ok())
        else {
            return;
        };

        match (&result, outcome.kind) {
            (Ok(()), MutationKind::Create) => self.toast_success("Key added successfully"),
            (Ok(()), MutationKind::Update) => self.toast_success("Key updated successfully"),
            (Ok(()), MutationKind::Delete) => self.toast_success("Key deleted successfully"),
            (Err(e), MutationKind::Create) => {
                tracing::warn!(%e, "api keys: create failed");
                self.toast_error(
                    "Something went wrong",
                    Some(e.user_message("Failed to add API key")),
                );
            }
            (Err(e), MutationKind::Update) => {
                tracing::warn!(%e, "api keys: update failed");
                self.toast_error(
                    "Update failed",
                    Some(e.user_message("Failed to update API key")),
                );
            }
            (Err(e), MutationKind::Delete) => {
                tracing::warn!(%e, "api keys: delete failed");
                self.toast_error("Failed to delete API key", None);
            }
        }

        if outcome.refetch {
            self.refresh_api_keys();
        }
    }

    pub(super) fn project_api_keys(&mut self) {
        let key = api_keys_key();
        let snapshot = self.api_keys.get(&key);
        self.state.api_keys.status = ListStatus::derive(
            snapshot.map(Snapshot::len),
            self.api_keys_fetch.is_loading(),
            self.api_keys_fetch.error.as_deref(),
        );
        self.state.api_keys.items = snapshot
            .map(|s| s.items().iter().map(key_view).collect())
            .unwrap_or_default();
        self.state.busy.saving_api_key = self.api_key_mutations.has_pending(&key);
    }
}

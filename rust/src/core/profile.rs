// Profile stats. Only server-backed numbers are exposed: total
// transformations and account age.

use chrono::{DateTime, Utc};

use crate::api::{ApiError, UserProfile};
use crate::state::ListStatus;
use crate::updates::InternalEvent;

use super::AppCore;

/// Whole days between account creation and `now`; `None` if the timestamp
/// does not parse.
pub(super) fn days_active(created_at: &str, now: DateTime<Utc>) -> Option<u32> {
    let created = DateTime::parse_from_rfc3339(created_at).ok()?;
    let days = now.signed_duration_since(created.with_timezone(&Utc)).num_days();
    u32::try_from(days.max(0)).ok()
}

impl AppCore {
    pub(super) fn refresh_profile(&mut self) {
        let Some(token) = self.fetch_token() else {
            return;
        };
        self.profile_token += 1;
        let token_id = self.profile_token;
        self.profile_loading = true;

        let api = self.api.clone();
        let tx = self.core_sender.clone();
        let session = self.session;
        self.runtime.spawn(async move {
            let result = api.get_profile(&token).await;
            Self::send_internal(
                &tx,
                InternalEvent::ProfileFetched {
                    session,
                    token: token_id,
                    result,
                },
            );
        });
    }

    pub(super) fn profile_fetched(&mut self, token: u64, result: Result<UserProfile, ApiError>) {
        if token != self.profile_token {
            return;
        }
        self.profile_loading = false;
        match result {
            Ok(profile) => {
                let member_since = profile.user.and_then(|u| u.created_at);
                let profile_state = &mut self.state.profile;
                profile_state.total_transformations = Some(profile.total_transformations);
                profile_state.days_active = member_since
                    .as_deref()
                    .and_then(|created| days_active(created, Utc::now()));
                profile_state.member_since = member_since;
                self.profile_error = None;
            }
            Err(e) => {
                tracing::warn!(%e, "profile: fetch failed");
                self.profile_error = Some(e.user_message("Couldn't load your profile"));
            }
        }
    }

    pub(super) fn project_profile(&mut self) {
        let loaded = self.state.profile.total_transformations.map(|_| 1);
        self.state.profile.status = ListStatus::derive(
            loaded,
            self.profile_loading,
            self.profile_error.as_deref(),
        );
    }
}

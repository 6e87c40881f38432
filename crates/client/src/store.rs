//! View-model stores over the API facade.
//!
//! Each store keeps the last known server state in memory and exposes it as a
//! [`Snapshot`]. Mutations call the facade first and reconcile local state only
//! when the call succeeds. Failures are recorded as a user-facing message and
//! the error itself is handed back to the caller.
//!
//! State lives behind a `tokio::sync::RwLock` that is only taken between
//! network calls, never across one, so a mutation in flight does not block a
//! concurrent refetch. Overlapping requests are not coalesced: whichever
//! response lands last wins.

use std::future::Future;
use std::sync::Arc;

use tabularium_core::character::{
    Ability, AbilityInput, AkinSheet, CharacterProfile, VirtueFlaw, VirtueFlawInput,
    VirtueFlawKind,
};
use tabularium_core::library::{LibraryFilter, LibraryItem, LibraryItemDraft};
use tabularium_core::spells::Spell;
use tokio::sync::RwLock;

use crate::api::ApiClient;
use crate::error::ApiError;

/// Point-in-time view of a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot<T> {
    pub data: T,
    /// A refetch is in flight.
    pub loading: bool,
    /// Message of the last failed operation, cleared when the next one starts.
    pub error: Option<String>,
}

struct StoreState<T> {
    inner: RwLock<Snapshot<T>>,
}

impl<T: Clone> StoreState<T> {
    fn new(data: T) -> Self {
        Self {
            inner: RwLock::new(Snapshot {
                data,
                loading: false,
                error: None,
            }),
        }
    }

    async fn snapshot(&self) -> Snapshot<T> {
        self.inner.read().await.clone()
    }

    /// Run one operation with the error bookkeeping every store shares.
    async fn track<R, F>(&self, refetch: bool, call: F) -> Result<R, ApiError>
    where
        F: Future<Output = Result<R, ApiError>>,
    {
        {
            let mut state = self.inner.write().await;
            state.error = None;
            if refetch {
                state.loading = true;
            }
        }

        let result = call.await;

        let mut state = self.inner.write().await;
        if refetch {
            state.loading = false;
        }
        if let Err(e) = &result {
            state.error = Some(e.to_string());
        }
        result
    }

    async fn update(&self, apply: impl FnOnce(&mut T)) {
        apply(&mut self.inner.write().await.data);
    }
}

/* --------------------------------------------------------------------------
Library
-------------------------------------------------------------------------- */

/// The whole library list.
pub struct LibraryStore {
    api: Arc<ApiClient>,
    state: StoreState<Vec<LibraryItem>>,
}

impl LibraryStore {
    /// An empty store. Call [`refetch`](Self::refetch) to load it.
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: StoreState::new(Vec::new()),
        }
    }

    /// A store loaded once. A failed load is recorded in the snapshot.
    pub async fn mount(api: Arc<ApiClient>) -> Self {
        let store = Self::new(api);
        if let Err(e) = store.refetch().await {
            tracing::warn!(error = %e, "Initial library load failed");
        }
        store
    }

    pub async fn snapshot(&self) -> Snapshot<Vec<LibraryItem>> {
        self.state.snapshot().await
    }

    /// The current snapshot with `filter` applied, newest first.
    ///
    /// Only the view is narrowed; the stored list keeps its server order.
    pub async fn snapshot_filtered(&self, filter: &LibraryFilter) -> Snapshot<Vec<LibraryItem>> {
        let snapshot = self.state.snapshot().await;
        Snapshot {
            data: filter.apply(&snapshot.data),
            ..snapshot
        }
    }

    pub async fn refetch(&self) -> Result<(), ApiError> {
        let items = self.state.track(true, self.api.list_library()).await?;
        self.state.update(|data| *data = items).await;
        Ok(())
    }

    /// Validate and create an item, then put it at the top of the list.
    pub async fn add_item(&self, draft: &LibraryItemDraft) -> Result<LibraryItem, ApiError> {
        let created = self
            .state
            .track(false, async {
                draft.validate()?;
                self.api.create_library_item(draft).await
            })
            .await?;

        let item = created.clone();
        self.state.update(|data| data.insert(0, item)).await;
        Ok(created)
    }

    pub async fn update_item(
        &self,
        id: &str,
        draft: &LibraryItemDraft,
    ) -> Result<LibraryItem, ApiError> {
        let updated = self
            .state
            .track(false, async {
                draft.validate()?;
                self.api.update_library_item(id, draft).await
            })
            .await?;

        let item = updated.clone();
        self.state
            .update(|data| {
                if let Some(slot) = data.iter_mut().find(|i| i.id() == Some(id)) {
                    *slot = item;
                }
            })
            .await;
        Ok(updated)
    }

    pub async fn delete_item(&self, id: &str) -> Result<(), ApiError> {
        self.state
            .track(false, self.api.delete_library_item(id))
            .await?;
        self.state
            .update(|data| data.retain(|i| i.id() != Some(id)))
            .await;
        Ok(())
    }
}

/// A single library item, e.g. for a detail or edit view.
pub struct LibraryItemStore {
    api: Arc<ApiClient>,
    id: String,
    state: StoreState<Option<LibraryItem>>,
}

impl LibraryItemStore {
    pub fn new(api: Arc<ApiClient>, id: impl Into<String>) -> Self {
        Self {
            api,
            id: id.into(),
            state: StoreState::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn snapshot(&self) -> Snapshot<Option<LibraryItem>> {
        self.state.snapshot().await
    }

    pub async fn refetch(&self) -> Result<(), ApiError> {
        let item = self
            .state
            .track(true, self.api.get_library_item(&self.id))
            .await?;
        self.state.update(|data| *data = Some(item)).await;
        Ok(())
    }

    /// Save `draft` over this item and keep the result.
    pub async fn set_item(&self, draft: &LibraryItemDraft) -> Result<LibraryItem, ApiError> {
        let updated = self
            .state
            .track(false, async {
                draft.validate()?;
                self.api.update_library_item(&self.id, draft).await
            })
            .await?;

        let item = updated.clone();
        self.state.update(|data| *data = Some(item)).await;
        Ok(updated)
    }
}

/* --------------------------------------------------------------------------
Character sheet
-------------------------------------------------------------------------- */

/// The AKIN sheet: profile, abilities, virtues and flaws.
pub struct AkinStore {
    api: Arc<ApiClient>,
    state: StoreState<AkinSheet>,
}

impl AkinStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            state: StoreState::new(AkinSheet::default()),
        }
    }

    pub async fn mount(api: Arc<ApiClient>) -> Self {
        let store = Self::new(api);
        if let Err(e) = store.refetch().await {
            tracing::warn!(error = %e, "Initial character sheet load failed");
        }
        store
    }

    pub async fn snapshot(&self) -> Snapshot<AkinSheet> {
        self.state.snapshot().await
    }

    pub async fn refetch(&self) -> Result<(), ApiError> {
        let sheet = self.state.track(true, self.api.get_akin()).await?;
        self.state.update(|data| *data = sheet).await;
        Ok(())
    }

    /// Upsert the profile and keep what the backend stored.
    pub async fn save_profile(
        &self,
        profile: &CharacterProfile,
    ) -> Result<CharacterProfile, ApiError> {
        let stored = self
            .state
            .track(false, self.api.upsert_akin(profile))
            .await?;

        let kept = stored.clone();
        self.state.update(|data| data.profile = Some(kept)).await;
        Ok(stored)
    }

    /// Encode `spells` into the current profile and save it.
    ///
    /// When no profile has been loaded yet the sheet is fetched first, so the
    /// save never overwrites stored fields. A blank profile is used only when
    /// the backend has none either.
    pub async fn set_spells(&self, spells: &[Spell]) -> Result<CharacterProfile, ApiError> {
        let loaded = self.state.snapshot().await.data.profile;
        let mut profile = match loaded {
            Some(profile) => profile,
            None => {
                let sheet = self.state.track(false, self.api.get_akin()).await?;
                let stored = sheet.profile.clone();
                self.state.update(|data| *data = sheet).await;
                stored.unwrap_or_default()
            }
        };
        profile.set_spells(spells);
        self.save_profile(&profile).await
    }

    pub async fn add_ability(&self, input: &AbilityInput) -> Result<Ability, ApiError> {
        let created = self
            .state
            .track(false, self.api.create_ability(input))
            .await?;

        let ability = created.clone();
        self.state.update(|data| data.abilities.push(ability)).await;
        Ok(created)
    }

    pub async fn update_ability(
        &self,
        id: &str,
        input: &AbilityInput,
    ) -> Result<Ability, ApiError> {
        let updated = self
            .state
            .track(false, self.api.update_ability(id, input))
            .await?;

        let ability = updated.clone();
        self.state
            .update(|data| {
                if let Some(slot) = data.abilities.iter_mut().find(|a| a.id == id) {
                    *slot = ability;
                }
            })
            .await;
        Ok(updated)
    }

    pub async fn remove_ability(&self, id: &str) -> Result<(), ApiError> {
        self.state
            .track(false, self.api.delete_ability(id))
            .await?;
        self.state
            .update(|data| data.abilities.retain(|a| a.id != id))
            .await;
        Ok(())
    }

    pub async fn add_virtue_flaw(
        &self,
        kind: VirtueFlawKind,
        input: &VirtueFlawInput,
    ) -> Result<VirtueFlaw, ApiError> {
        let created = self
            .state
            .track(false, self.api.create_virtue_flaw(kind, input))
            .await?;

        let entry = created.clone();
        self.state
            .update(|data| data.collection_mut(kind).push(entry))
            .await;
        Ok(created)
    }

    pub async fn update_virtue_flaw(
        &self,
        kind: VirtueFlawKind,
        id: &str,
        input: &VirtueFlawInput,
    ) -> Result<VirtueFlaw, ApiError> {
        let updated = self
            .state
            .track(false, self.api.update_virtue_flaw(kind, id, input))
            .await?;

        let entry = updated.clone();
        self.state
            .update(|data| {
                if let Some(slot) = data.collection_mut(kind).iter_mut().find(|v| v.id == id) {
                    *slot = entry;
                }
            })
            .await;
        Ok(updated)
    }

    pub async fn remove_virtue_flaw(&self, kind: VirtueFlawKind, id: &str) -> Result<(), ApiError> {
        self.state
            .track(false, self.api.delete_virtue_flaw(kind, id))
            .await?;
        self.state
            .update(|data| data.collection_mut(kind).retain(|v| v.id != id))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tabularium_core::error::CoreError;

    use super::*;

    #[tokio::test]
    async fn track_records_and_clears_errors() {
        let state = StoreState::new(0u32);

        let err = state
            .track(false, async {
                Err::<(), _>(ApiError::Core(CoreError::Validation(
                    "Title is required".into(),
                )))
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(
            state.snapshot().await.error.as_deref(),
            Some("Title is required")
        );

        state.track(false, async { Ok(()) }).await.unwrap();
        assert_eq!(state.snapshot().await.error, None);
    }

    #[tokio::test]
    async fn refetch_toggles_loading() {
        let state = StoreState::new(Vec::<u32>::new());
        let seen = state
            .track(true, async { Ok::<_, ApiError>(state.snapshot().await.loading) })
            .await
            .unwrap();
        assert!(seen);
        assert!(!state.snapshot().await.loading);
    }
}

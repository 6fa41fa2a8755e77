//! Process-wide application state.
//!
//! `AppState` holds the enriched catalog, the favorites store and the
//! playback controller. Mutating methods are only called from the daemon
//! core loop; everything else takes snapshots.

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{EpisodeId, Show};
use crate::error::CatalogError;
use crate::favorites::{Favorites, FavoritesStore};
use crate::playback::{MediaCommand, PlayableEpisode, PlaybackController, PlaybackState};
use crate::view;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum CatalogStatus {
    #[default]
    Empty,
    Loading,
    Ready,
    Failed(String),
}

/// Read-only view of the catalog slot.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    pub generation: u64,
    pub status: CatalogStatus,
    pub shows: Arc<Vec<Show>>,
}

struct CatalogSlot {
    generation: u64,
    status: CatalogStatus,
    shows: Arc<Vec<Show>>,
    cancel: CancellationToken,
}

pub struct AppState {
    catalog: RwLock<CatalogSlot>,
    favorites: RwLock<FavoritesStore>,
    playback: RwLock<PlaybackController>,
}

impl AppState {
    pub fn new(favorites_file: PathBuf) -> Self {
        Self {
            catalog: RwLock::new(CatalogSlot {
                generation: 0,
                status: CatalogStatus::Empty,
                shows: Arc::new(Vec::new()),
                cancel: CancellationToken::new(),
            }),
            favorites: RwLock::new(FavoritesStore::open(favorites_file)),
            playback: RwLock::new(PlaybackController::new()),
        }
    }

    // ── Catalog ──────────────────────────────────────────────────────────────

    /// Start a new load: cancels whatever load is in flight and hands back
    /// the generation and token the new load must carry.
    pub async fn begin_catalog_load(&self) -> (u64, CancellationToken) {
        let mut slot = self.catalog.write().await;
        slot.cancel.cancel();
        slot.cancel = CancellationToken::new();
        slot.generation += 1;
        slot.status = CatalogStatus::Loading;
        debug!("Catalog load generation {} started", slot.generation);
        (slot.generation, slot.cancel.clone())
    }

    /// Apply a finished load. Returns false when the result was dropped
    /// because a newer load superseded it.
    pub async fn finish_catalog_load(
        &self,
        generation: u64,
        result: Result<Vec<Show>, CatalogError>,
    ) -> bool {
        let mut slot = self.catalog.write().await;
        if generation != slot.generation {
            debug!(
                "Dropping stale catalog result (generation {}, current {})",
                generation, slot.generation
            );
            return false;
        }

        match result {
            Ok(shows) => {
                info!("Catalog ready: {} shows", shows.len());
                slot.shows = Arc::new(shows);
                slot.status = CatalogStatus::Ready;
            }
            Err(CatalogError::Cancelled) => {
                // Only shutdown cancels the current generation; fall back to
                // whatever the slot held before the load began.
                slot.status = if slot.shows.is_empty() {
                    CatalogStatus::Empty
                } else {
                    CatalogStatus::Ready
                };
                return false;
            }
            Err(e) => {
                warn!("Catalog load failed: {}", e);
                slot.shows = Arc::new(Vec::new());
                slot.status = CatalogStatus::Failed(e.to_string());
            }
        }
        true
    }

    /// Abandon any in-flight load (shutdown).
    pub async fn cancel_catalog_load(&self) {
        self.catalog.read().await.cancel.cancel();
    }

    pub async fn catalog(&self) -> CatalogSnapshot {
        let slot = self.catalog.read().await;
        CatalogSnapshot {
            generation: slot.generation,
            status: slot.status.clone(),
            shows: Arc::clone(&slot.shows),
        }
    }

    /// Look up a show. A miss before any load has landed is `NotLoaded`,
    /// not `NotFound`: the id may well exist.
    pub async fn show(&self, id: &str) -> Result<Show, CatalogError> {
        let slot = self.catalog.read().await;
        match view::find_show(&slot.shows, id) {
            Ok(show) => Ok(show.clone()),
            Err(_) if slot.status != CatalogStatus::Ready => Err(CatalogError::NotLoaded),
            Err(e) => Err(e),
        }
    }

    async fn playable(
        &self,
        show_id: &str,
        season_index: usize,
        episode_number: u32,
    ) -> Result<PlayableEpisode, CatalogError> {
        let show = self.show(show_id).await?;
        let identity = EpisodeId::new(show_id, season_index, episode_number);
        let episode = show
            .episode(season_index, episode_number)
            .ok_or_else(|| CatalogError::NotFound(identity.to_string()))?;
        Ok(PlayableEpisode::from_episode(show_id, episode))
    }

    // ── Favorites ────────────────────────────────────────────────────────────

    pub async fn favorites(&self) -> Favorites {
        self.favorites.read().await.snapshot()
    }

    /// Toggle an episode picked from the loaded catalog.
    pub async fn toggle_favorite(
        &self,
        show_id: &str,
        season_index: usize,
        episode_number: u32,
    ) -> Result<Favorites, CatalogError> {
        let identity = EpisodeId::new(show_id, season_index, episode_number);
        let mut store = self.favorites.write().await;
        if store.snapshot().contains(&identity) {
            return Ok(store.remove(&identity).await);
        }

        let show = self.show(show_id).await?;
        let episode = show
            .episode(season_index, episode_number)
            .ok_or_else(|| CatalogError::NotFound(identity.to_string()))?;
        Ok(store.toggle(show_id, episode).await)
    }

    pub async fn remove_favorite(&self, identity: &EpisodeId) -> Favorites {
        self.favorites.write().await.remove(identity).await
    }

    pub async fn clear_favorites(&self) -> Favorites {
        self.favorites.write().await.clear().await
    }

    // ── Playback ─────────────────────────────────────────────────────────────

    pub async fn playback(&self) -> PlaybackState {
        self.playback.read().await.state().clone()
    }

    pub async fn update_playback<R>(&self, f: impl FnOnce(&mut PlaybackController) -> R) -> R {
        let mut player = self.playback.write().await;
        f(&mut *player)
    }

    pub async fn select_episode(
        &self,
        show_id: &str,
        season_index: usize,
        episode_number: u32,
    ) -> Result<Option<MediaCommand>, CatalogError> {
        let item = self.playable(show_id, season_index, episode_number).await?;
        Ok(self.update_playback(|player| player.select(item)).await)
    }

    /// Play a favorite without needing its show in the catalog.
    pub async fn select_favorite(
        &self,
        identity: &EpisodeId,
    ) -> Result<Option<MediaCommand>, CatalogError> {
        let item = self
            .favorites
            .read()
            .await
            .snapshot()
            .get(identity)
            .map(PlayableEpisode::from)
            .ok_or_else(|| CatalogError::NotFound(identity.to_string()))?;
        Ok(self.update_playback(|player| player.select(item)).await)
    }
}

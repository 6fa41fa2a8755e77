//! DaemonCore: single-owner event loop for all mutable state.
//!
//! Every writer path goes through here: catalog load completion, favorite
//! toggles and clears, and playback transitions. HTTP handlers (and any
//! future client) send `DaemonEvent`s and read snapshots from `AppState`;
//! they never mutate it directly.
//!
//! Catalog loads run as a spawned task that reports back with a
//! `CatalogLoaded` event carrying its generation, so a load that was
//! superseded by a reload can never overwrite newer data.

use std::sync::Arc;

use podcast_proto::config::Config;
use podcast_proto::enrich::load_catalog;
use podcast_proto::protocol::Command;
use podcast_proto::{AppState, CatalogError, CatalogSource, Favorites, MediaCommand, Show};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

// ── DaemonEvent ───────────────────────────────────────────────────────────────

/// What the core answers to a command.
#[derive(Debug, Clone)]
pub enum Reply {
    Accepted,
    Favorites(Favorites),
    Media(Option<MediaCommand>),
}

pub type CommandResult = Result<Reply, CatalogError>;

/// All inputs into the DaemonCore loop.
#[derive(Debug)]
pub enum DaemonEvent {
    /// A command from the HTTP API, optionally awaiting its outcome.
    ClientCommand {
        command: Command,
        reply: Option<oneshot::Sender<CommandResult>>,
    },
    /// A spawned catalog load settled.
    CatalogLoaded {
        generation: u64,
        result: Result<Vec<Show>, CatalogError>,
    },
    /// Shutdown requested.
    Shutdown,
}

/// Cheap clonable sender for clients of the core loop.
#[derive(Clone)]
pub struct CoreHandle {
    event_tx: mpsc::Sender<DaemonEvent>,
}

impl CoreHandle {
    pub fn new(event_tx: mpsc::Sender<DaemonEvent>) -> Self {
        Self { event_tx }
    }

    /// Send a command and wait for the core to apply it.
    pub async fn request(&self, command: Command) -> anyhow::Result<CommandResult> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.event_tx
            .send(DaemonEvent::ClientCommand {
                command,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| anyhow::anyhow!("core event loop is gone"))?;
        Ok(reply_rx.await?)
    }

    pub async fn shutdown(&self) {
        let _ = self.event_tx.send(DaemonEvent::Shutdown).await;
    }
}

// ── DaemonCore ────────────────────────────────────────────────────────────────

pub struct DaemonCore<S: CatalogSource> {
    config: Config,
    state: Arc<AppState>,
    source: Arc<S>,
    /// Loopback into our own event loop for spawned loads.
    event_tx: mpsc::Sender<DaemonEvent>,
}

impl<S: CatalogSource> DaemonCore<S> {
    pub fn new(
        config: Config,
        state: Arc<AppState>,
        source: Arc<S>,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> Self {
        Self {
            config,
            state,
            source,
            event_tx,
        }
    }

    /// Run the core event loop until a `Shutdown` event arrives. The core
    /// holds a sender of its own, so the channel never closes underneath it.
    pub async fn run(self, mut event_rx: mpsc::Receiver<DaemonEvent>) -> anyhow::Result<()> {
        info!("DaemonCore: starting event loop");
        self.start_catalog_load().await;

        while let Some(event) = event_rx.recv().await {
            match event {
                DaemonEvent::ClientCommand { command, reply } => {
                    let result = self.handle_command(command).await;
                    if let Err(e) = &result {
                        debug!("Command failed: {}", e);
                    }
                    if let Some(reply) = reply {
                        // Requester may have given up; nothing to do.
                        let _ = reply.send(result);
                    }
                }
                DaemonEvent::CatalogLoaded { generation, result } => {
                    if !self.state.finish_catalog_load(generation, result).await {
                        debug!("Catalog generation {} discarded", generation);
                    }
                }
                DaemonEvent::Shutdown => {
                    info!("DaemonCore: shutdown requested");
                    break;
                }
            }
        }

        self.state.cancel_catalog_load().await;
        info!("DaemonCore: event loop stopped");
        Ok(())
    }

    async fn start_catalog_load(&self) {
        let (generation, cancel) = self.state.begin_catalog_load().await;
        let source = Arc::clone(&self.source);
        let event_tx = self.event_tx.clone();
        let max_in_flight = self.config.enrich.max_in_flight;

        info!(
            "Loading catalog (generation {}, max_in_flight {})",
            generation, max_in_flight
        );

        tokio::spawn(async move {
            let result = load_catalog(source, max_in_flight, &cancel).await;
            if cancel.is_cancelled() {
                debug!("Catalog generation {} cancelled", generation);
                return;
            }
            if event_tx
                .send(DaemonEvent::CatalogLoaded { generation, result })
                .await
                .is_err()
            {
                warn!("Core loop closed before catalog generation {} landed", generation);
            }
        });
    }

    async fn handle_command(&self, command: Command) -> CommandResult {
        if command.is_media_feedback() {
            trace!("Media feedback: {:?}", command);
        } else {
            info!("Command: {:?}", command);
        }

        let state = &self.state;
        let reply = match command {
            Command::ReloadCatalog => {
                self.start_catalog_load().await;
                Reply::Accepted
            }
            Command::ToggleFavorite { episode } => Reply::Favorites(
                state
                    .toggle_favorite(&episode.show_id, episode.season_index, episode.episode_number)
                    .await?,
            ),
            Command::RemoveFavorite { identity } => {
                Reply::Favorites(state.remove_favorite(&identity).await)
            }
            Command::ClearFavorites => Reply::Favorites(state.clear_favorites().await),
            Command::Select { episode } => Reply::Media(
                state
                    .select_episode(&episode.show_id, episode.season_index, episode.episode_number)
                    .await?,
            ),
            Command::SelectFavorite { identity } => {
                Reply::Media(state.select_favorite(&identity).await?)
            }
            Command::TogglePause => Reply::Media(state.update_playback(|p| p.toggle_pause()).await),
            Command::Seek { seconds } => Reply::Media(state.update_playback(|p| p.seek(seconds)).await),
            Command::Skip { seconds } => Reply::Media(state.update_playback(|p| p.skip(seconds)).await),
            Command::Stop => Reply::Media(state.update_playback(|p| p.stop()).await),
            Command::DurationKnown { seconds } => {
                state.update_playback(|p| p.on_duration_known(seconds)).await;
                Reply::Accepted
            }
            Command::PositionTick { seconds } => {
                state.update_playback(|p| p.on_position_tick(seconds)).await;
                Reply::Accepted
            }
            Command::Ended => {
                state.update_playback(|p| p.on_ended()).await;
                Reply::Accepted
            }
        };
        Ok(reply)
    }
}

//! Single-slot "now playing" state machine.
//!
//! The controller never owns a clock or a decoder. It records what the
//! presentation layer's media element reports (duration, position ticks,
//! end of stream) and answers user intents with a `MediaCommand` the
//! presentation layer must apply to that element.
//!
//! Transitions:
//!
//! ```text
//! Idle    -> Playing            select
//! Playing -> Playing(other)     select (replaces, never queues)
//! Playing <-> Paused            toggle_pause
//! Playing -> Paused             on_ended
//! *       -> Idle               stop
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Episode, EpisodeId};
use crate::favorites::FavoriteEntry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// What the player holds: enough to load the audio and link back to the show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayableEpisode {
    pub identity: EpisodeId,
    pub show_id: String,
    pub title: String,
    pub file_url: String,
}

impl PlayableEpisode {
    pub fn from_episode(show_id: &str, episode: &Episode) -> Self {
        Self {
            identity: episode.identity.clone(),
            show_id: show_id.to_string(),
            title: episode.title.clone(),
            file_url: episode.file_url.clone(),
        }
    }
}

impl From<&FavoriteEntry> for PlayableEpisode {
    fn from(entry: &FavoriteEntry) -> Self {
        Self {
            identity: entry.identity.clone(),
            show_id: entry.show_id.clone(),
            title: entry.title.clone(),
            file_url: entry.file_url.clone(),
        }
    }
}

/// Instruction for the media element bound by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "media", rename_all = "snake_case")]
pub enum MediaCommand {
    Load { url: String, autoplay: bool },
    Pause,
    Resume,
    SeekTo { seconds: f64 },
    Unload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlaybackState {
    /// Monotonic revision counter, incremented on every change.
    pub rev: u64,
    pub status: PlaybackStatus,
    pub now_playing: Option<PlayableEpisode>,
    pub position_secs: f64,
    /// 0 until the media element reports metadata.
    pub duration_secs: f64,
}

impl PlaybackState {
    /// Scrub bar fill in `[0, 1]`; 0 while the duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.position_secs / self.duration_secs).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Default)]
pub struct PlaybackController {
    state: PlaybackState,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn now_playing(&self) -> Option<&PlayableEpisode> {
        self.state.now_playing.as_ref()
    }

    pub fn select(&mut self, item: PlayableEpisode) -> Option<MediaCommand> {
        debug!("Now playing {} ({})", item.title, item.identity);
        let url = item.file_url.clone();
        self.state.now_playing = Some(item);
        self.state.status = PlaybackStatus::Playing;
        self.state.position_secs = 0.0;
        self.state.duration_secs = 0.0;
        self.state.rev += 1;
        Some(MediaCommand::Load {
            url,
            autoplay: true,
        })
    }

    pub fn toggle_pause(&mut self) -> Option<MediaCommand> {
        let (status, command) = match self.state.status {
            PlaybackStatus::Idle => return None,
            PlaybackStatus::Playing => (PlaybackStatus::Paused, MediaCommand::Pause),
            PlaybackStatus::Paused => (PlaybackStatus::Playing, MediaCommand::Resume),
        };
        self.state.status = status;
        self.state.rev += 1;
        Some(command)
    }

    /// Clamp into `[0, duration]`. No state change; ignored while idle.
    pub fn seek(&mut self, target_secs: f64) -> Option<MediaCommand> {
        if self.state.status == PlaybackStatus::Idle || !target_secs.is_finite() {
            return None;
        }
        let seconds = target_secs.clamp(0.0, self.state.duration_secs);
        self.state.position_secs = seconds;
        self.state.rev += 1;
        Some(MediaCommand::SeekTo { seconds })
    }

    pub fn skip(&mut self, delta_secs: f64) -> Option<MediaCommand> {
        self.seek(self.state.position_secs + delta_secs)
    }

    pub fn stop(&mut self) -> Option<MediaCommand> {
        if self.state.status == PlaybackStatus::Idle {
            return None;
        }
        self.state = PlaybackState {
            rev: self.state.rev + 1,
            ..PlaybackState::default()
        };
        Some(MediaCommand::Unload)
    }

    pub fn on_duration_known(&mut self, duration_secs: f64) {
        if self.state.status == PlaybackStatus::Idle
            || !duration_secs.is_finite()
            || duration_secs < 0.0
        {
            return;
        }
        self.state.duration_secs = duration_secs;
        self.state.position_secs = self.state.position_secs.min(duration_secs);
        self.state.rev += 1;
    }

    pub fn on_position_tick(&mut self, position_secs: f64) {
        if self.state.status == PlaybackStatus::Idle || !position_secs.is_finite() {
            return;
        }
        let mut position = position_secs.max(0.0);
        if self.state.duration_secs > 0.0 {
            position = position.min(self.state.duration_secs);
        }
        self.state.position_secs = position;
        self.state.rev += 1;
    }

    /// End of stream: stay on the item, paused at the end.
    pub fn on_ended(&mut self) {
        if self.state.status == PlaybackStatus::Idle {
            return;
        }
        self.state.status = PlaybackStatus::Paused;
        self.state.position_secs = self.state.duration_secs;
        self.state.rev += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str) -> PlayableEpisode {
        PlayableEpisode {
            identity: EpisodeId::new(id, 0, 1),
            show_id: id.to_string(),
            title: format!("Episode of {id}"),
            file_url: format!("https://cdn.invalid/{id}.mp3"),
        }
    }

    fn playing(duration: f64) -> PlaybackController {
        let mut player = PlaybackController::new();
        player.select(item("a"));
        player.on_duration_known(duration);
        player
    }

    #[test]
    fn test_select_from_idle() {
        let mut player = PlaybackController::new();
        assert_eq!(player.status(), PlaybackStatus::Idle);
        let cmd = player.select(item("a"));
        assert_eq!(
            cmd,
            Some(MediaCommand::Load {
                url: "https://cdn.invalid/a.mp3".to_string(),
                autoplay: true
            })
        );
        assert_eq!(player.status(), PlaybackStatus::Playing);
        assert_eq!(player.state().duration_secs, 0.0);
    }

    #[test]
    fn test_reselect_replaces_and_resets_position() {
        let mut player = playing(100.0);
        player.on_position_tick(42.0);
        player.toggle_pause();

        player.select(item("b"));
        assert_eq!(player.now_playing().map(|p| p.show_id.as_str()), Some("b"));
        assert_eq!(player.status(), PlaybackStatus::Playing);
        assert_eq!(player.state().position_secs, 0.0);
        assert_eq!(player.state().duration_secs, 0.0);
    }

    #[test]
    fn test_toggle_pause() {
        let mut player = PlaybackController::new();
        assert_eq!(player.toggle_pause(), None);
        assert_eq!(player.status(), PlaybackStatus::Idle);

        player.select(item("a"));
        assert_eq!(player.toggle_pause(), Some(MediaCommand::Pause));
        assert_eq!(player.status(), PlaybackStatus::Paused);
        assert_eq!(player.toggle_pause(), Some(MediaCommand::Resume));
        assert_eq!(player.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_seek_clamps_to_duration() {
        let mut player = playing(120.0);
        assert_eq!(player.seek(-5.0), Some(MediaCommand::SeekTo { seconds: 0.0 }));
        assert_eq!(player.state().position_secs, 0.0);
        assert_eq!(player.seek(500.0), Some(MediaCommand::SeekTo { seconds: 120.0 }));
        assert_eq!(player.state().position_secs, 120.0);
        assert_eq!(player.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_seek_while_paused_keeps_paused() {
        let mut player = playing(60.0);
        player.toggle_pause();
        player.seek(30.0);
        assert_eq!(player.status(), PlaybackStatus::Paused);
        assert_eq!(player.state().position_secs, 30.0);
    }

    #[test]
    fn test_seek_before_duration_is_degenerate() {
        let mut player = PlaybackController::new();
        assert_eq!(player.seek(10.0), None);
        player.select(item("a"));
        assert_eq!(player.seek(10.0), Some(MediaCommand::SeekTo { seconds: 0.0 }));
        assert_eq!(player.seek(f64::NAN), None);
    }

    #[test]
    fn test_skip_is_relative_seek() {
        let mut player = playing(100.0);
        player.on_position_tick(50.0);
        player.skip(15.0);
        assert_eq!(player.state().position_secs, 65.0);
        player.skip(-100.0);
        assert_eq!(player.state().position_secs, 0.0);
        player.skip(1_000.0);
        assert_eq!(player.state().position_secs, 100.0);
    }

    #[test]
    fn test_ticks_and_progress() {
        let mut player = PlaybackController::new();
        player.on_position_tick(5.0);
        assert_eq!(player.state().position_secs, 0.0);

        player.select(item("a"));
        player.on_position_tick(3.0);
        assert_eq!(player.state().progress(), 0.0);
        player.on_duration_known(12.0);
        assert_eq!(player.state().progress(), 0.25);
        player.on_position_tick(99.0);
        assert_eq!(player.state().position_secs, 12.0);
        player.on_duration_known(-1.0);
        assert_eq!(player.state().duration_secs, 12.0);
    }

    #[test]
    fn test_ended_and_stop() {
        let mut player = playing(30.0);
        player.on_ended();
        assert_eq!(player.status(), PlaybackStatus::Paused);
        assert_eq!(player.state().position_secs, 30.0);
        assert!(player.now_playing().is_some());

        let rev = player.state().rev;
        assert_eq!(player.stop(), Some(MediaCommand::Unload));
        assert_eq!(player.status(), PlaybackStatus::Idle);
        assert!(player.now_playing().is_none());
        assert!(player.state().rev > rev);
        assert_eq!(player.stop(), None);
    }
}

use serde::{Deserialize, Serialize};

use crate::catalog::EpisodeId;

/// Current protocol version. Bump this when the wire format changes in a
/// breaking way.
pub const PROTOCOL_VERSION: u32 = 1;

/// Address of one episode inside the loaded catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub show_id: String,
    pub season_index: usize,
    pub episode_number: u32,
}

impl EpisodeRef {
    pub fn identity(&self) -> EpisodeId {
        EpisodeId::new(&self.show_id, self.season_index, self.episode_number)
    }
}

/// Every mutation the core loop accepts, from HTTP or any other client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum Command {
    ReloadCatalog,
    ToggleFavorite { episode: EpisodeRef },
    RemoveFavorite { identity: EpisodeId },
    ClearFavorites,
    Select { episode: EpisodeRef },
    SelectFavorite { identity: EpisodeId },
    TogglePause,
    Seek { seconds: f64 },
    Skip { seconds: f64 },
    Stop,
    /// Media element resolved its metadata.
    DurationKnown { seconds: f64 },
    /// Media element time update.
    PositionTick { seconds: f64 },
    /// Media element reached the end.
    Ended,
}

impl Command {
    /// Commands fed back by the media element rather than a user intent.
    pub fn is_media_feedback(&self) -> bool {
        matches!(
            self,
            Command::DurationKnown { .. } | Command::PositionTick { .. } | Command::Ended
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let cmd = Command::ToggleFavorite {
            episode: EpisodeRef {
                show_id: "10716".to_string(),
                season_index: 1,
                episode_number: 3,
            },
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.starts_with(r#"{"cmd":"ToggleFavorite""#));
        let decoded: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, cmd);
    }

    #[test]
    fn test_decode_from_client_json() {
        let cmd: Command = serde_json::from_str(r#"{"cmd":"Seek","seconds":12.5}"#).unwrap();
        assert_eq!(cmd, Command::Seek { seconds: 12.5 });
        let cmd: Command =
            serde_json::from_str(r#"{"cmd":"RemoveFavorite","identity":"1:0:2"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::RemoveFavorite {
                identity: EpisodeId::new("1", 0, 2)
            }
        );
        assert!(Command::Ended.is_media_feedback());
        assert!(!Command::Stop.is_media_feedback());
    }

    #[test]
    fn test_episode_ref_identity() {
        let episode = EpisodeRef {
            show_id: "9".to_string(),
            season_index: 2,
            episode_number: 1,
        };
        assert_eq!(episode.identity().as_str(), "9:2:1");
    }
}

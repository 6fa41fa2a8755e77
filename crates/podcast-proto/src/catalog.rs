//! Show catalog model.
//!
//! Two layers live here: the wire records exactly as the remote source
//! delivers them (`ShowSummary`, `ShowDetail`) and the merged domain types
//! (`Show`, `Season`, `Episode`) built once at ingestion. Episode identity is
//! derived during that merge and stored on the record.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

pub type GenreId = u32;

// ── Wire records ──────────────────────────────────────────────────────────────

/// One entry of the flat show index (`GET /`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShowSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

/// Per-show detail record (`GET /id/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShowDetail {
    #[serde(default)]
    pub seasons: Vec<SeasonRecord>,
    /// Null entries are kept here and dropped at merge.
    #[serde(default)]
    pub genres: Vec<Option<GenreValue>>,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpisodeRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub episode: u32,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub description: String,
}

/// Genres arrive as ids, occasionally as numeric strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum GenreValue {
    Id(GenreId),
    Text(String),
}

impl GenreValue {
    pub fn id(&self) -> Option<GenreId> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }
}

fn lenient_u32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(0),
        Some(NumberOrText::Number(n)) => Ok(n),
        Some(NumberOrText::Text(text)) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Derived episode identity: `"{show_id}:{season_index}:{episode_number}"`.
///
/// The source does not number episodes uniquely across seasons, so the
/// season's position within the show is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(String);

impl EpisodeId {
    pub fn new(show_id: &str, season_index: usize, episode_number: u32) -> Self {
        Self(format!("{show_id}:{season_index}:{episode_number}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EpisodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ── Update timestamp ──────────────────────────────────────────────────────────

/// Last-updated instant of a show. `Unknown` when the source omitted it or
/// sent something unparseable; it orders before every known instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "Option<DateTime<Utc>>", into = "Option<DateTime<Utc>>")]
pub enum UpdatedAt {
    #[default]
    Unknown,
    Known(DateTime<Utc>),
}

impl UpdatedAt {
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Unknown;
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Self::Known(dt.with_timezone(&Utc));
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Self::Known(dt.and_utc());
            }
        }
        debug!("Unparseable update timestamp {:?}, treating as unknown", raw);
        Self::Unknown
    }

    pub fn known(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Known(dt) => Some(*dt),
            Self::Unknown => None,
        }
    }
}

impl From<Option<DateTime<Utc>>> for UpdatedAt {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::Unknown, Self::Known)
    }
}

impl From<UpdatedAt> for Option<DateTime<Utc>> {
    fn from(value: UpdatedAt) -> Self {
        value.known()
    }
}

// ── Merged domain types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub genre_ids: Vec<GenreId>,
    pub seasons: Vec<Season>,
    pub updated: UpdatedAt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub title: String,
    pub image_url: String,
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub identity: EpisodeId,
    pub episode_number: u32,
    pub title: String,
    pub file_url: String,
    pub description: String,
}

impl Show {
    /// Summary-only show, used when the detail fetch failed.
    pub fn from_summary(summary: ShowSummary) -> Self {
        Self {
            id: summary.id,
            title: summary.title,
            description: summary.description,
            image_url: summary.image,
            genre_ids: Vec::new(),
            seasons: Vec::new(),
            updated: UpdatedAt::Unknown,
        }
    }

    pub fn merge(summary: ShowSummary, detail: ShowDetail) -> Self {
        let seasons = detail
            .seasons
            .into_iter()
            .enumerate()
            .map(|(season_index, season)| Season {
                title: season.title,
                image_url: season.image,
                episodes: season
                    .episodes
                    .into_iter()
                    .map(|ep| Episode {
                        identity: EpisodeId::new(&summary.id, season_index, ep.episode),
                        episode_number: ep.episode,
                        title: ep.title,
                        file_url: ep.file,
                        description: ep.description,
                    })
                    .collect(),
            })
            .collect();

        let genre_ids = detail.genres.iter().flatten().filter_map(GenreValue::id).collect();

        Self {
            updated: UpdatedAt::parse(detail.updated.as_deref()),
            genre_ids,
            seasons,
            ..Self::from_summary(summary)
        }
    }

    pub fn season_count(&self) -> usize {
        self.seasons.len()
    }

    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|s| s.episodes.len()).sum()
    }

    pub fn episode(&self, season_index: usize, episode_number: u32) -> Option<&Episode> {
        self.seasons
            .get(season_index)?
            .episodes
            .iter()
            .find(|ep| ep.episode_number == episode_number)
    }
}

/// Keep the first summary for every id. The source guarantees unique ids,
/// so duplicates are logged.
pub fn dedup_summaries(summaries: Vec<ShowSummary>) -> Vec<ShowSummary> {
    let mut seen = HashSet::new();
    summaries
        .into_iter()
        .filter(|s| {
            let fresh = seen.insert(s.id.clone());
            if !fresh {
                warn!("Dropping duplicate show id {} ({:?})", s.id, s.title);
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, title: &str) -> ShowSummary {
        ShowSummary {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            image: String::new(),
        }
    }

    const DETAIL_JSON: &str = r#"{
        "id": "10716",
        "title": "Something Was Wrong",
        "genres": [1, "2", "Personal Growth"],
        "updated": "2022-11-03T07:00:00.000Z",
        "seasons": [
            {"season": 1, "title": "Season 1", "image": "s1.jpg", "episodes": [
                {"title": "Pilot", "episode": 1, "file": "a.mp3", "description": "d"},
                {"title": "Two", "episode": "2", "file": "b.mp3", "description": "d"}
            ]},
            {"season": 2, "title": "Season 2", "image": "s2.jpg", "episodes": [
                {"title": "Again", "episode": 1, "file": "c.mp3", "description": "d"}
            ]}
        ]
    }"#;

    #[test]
    fn test_identity_is_pure() {
        let a = EpisodeId::new("42", 1, 3);
        let b = EpisodeId::new(&String::from("42"), 1, 3);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "42:1:3");
        assert_ne!(a, EpisodeId::new("42", 0, 3));
    }

    #[test]
    fn test_merge_detail() {
        let detail: ShowDetail = serde_json::from_str(DETAIL_JSON).unwrap();
        let show = Show::merge(summary("10716", "Something Was Wrong"), detail);

        assert_eq!(show.genre_ids, vec![1, 2]);
        assert_eq!(show.season_count(), 2);
        assert_eq!(show.episode_count(), 3);
        assert!(show.updated.known().is_some());

        let first = &show.seasons[0].episodes[0];
        let other_season = &show.seasons[1].episodes[0];
        assert_eq!(first.episode_number, other_season.episode_number);
        assert_ne!(first.identity, other_season.identity);
        assert_eq!(show.seasons[0].episodes[1].episode_number, 2);
        assert_eq!(
            show.episode(1, 1).map(|e| e.title.as_str()),
            Some("Again")
        );
    }

    #[test]
    fn test_null_genre_and_episode_number_keep_the_detail() {
        let detail: ShowDetail = serde_json::from_str(
            r#"{"genres": [1, null, 3], "seasons": [{"title": "S1", "episodes": [
                {"title": "Unnumbered", "episode": null, "file": "u.mp3"},
                {"title": "Numbered", "episode": 2, "file": "n.mp3"}
            ]}]}"#,
        )
        .unwrap();
        let show = Show::merge(summary("7", "Loose"), detail);

        assert_eq!(show.genre_ids, vec![1, 3]);
        assert_eq!(show.episode_count(), 2);
        assert_eq!(show.seasons[0].episodes[0].episode_number, 0);
        assert_eq!(show.seasons[0].episodes[0].identity.as_str(), "7:0:0");
    }

    #[test]
    fn test_missing_updated_is_unknown() {
        let detail: ShowDetail = serde_json::from_str(r#"{"seasons": [], "genres": []}"#).unwrap();
        let show = Show::merge(summary("1", "x"), detail);
        assert_eq!(show.updated, UpdatedAt::Unknown);
        assert_eq!(UpdatedAt::parse(Some("not a date")), UpdatedAt::Unknown);
        assert!(UpdatedAt::parse(Some("2021-05-01")).known().is_some());
    }

    #[test]
    fn test_unknown_orders_before_known() {
        let known = UpdatedAt::parse(Some("2000-01-01T00:00:00Z"));
        assert!(UpdatedAt::Unknown < known);
    }

    #[test]
    fn test_dedup_keeps_first() {
        let deduped = dedup_summaries(vec![
            summary("1", "first"),
            summary("2", "other"),
            summary("1", "second"),
        ]);
        let titles: Vec<_> = deduped.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "other"]);
    }
}

//! Persisted favorite episodes.
//!
//! The whole set is the unit of persistence: every mutation rewrites the
//! snapshot file (write-through). Reads never fail; a missing or corrupt
//! file is an empty set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::catalog::{Episode, EpisodeId};
use crate::error::PersistenceError;
use crate::view::compare_titles;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub identity: EpisodeId,
    pub show_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub file_url: String,
    pub favorited_at: DateTime<Utc>,
}

impl FavoriteEntry {
    pub fn from_episode(show_id: &str, episode: &Episode, favorited_at: DateTime<Utc>) -> Self {
        Self {
            identity: episode.identity.clone(),
            show_id: show_id.to_string(),
            title: episode.title.clone(),
            description: episode.description.clone(),
            file_url: episode.file_url.clone(),
            favorited_at,
        }
    }
}

/// Ordering for the favorites page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FavoriteSort {
    #[default]
    TitleAsc,
    TitleDesc,
    AddedRecent,
    AddedOldest,
}

impl FavoriteSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::AddedRecent => "added-recent",
            Self::AddedOldest => "added-oldest",
        }
    }
}

impl fmt::Display for FavoriteSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FavoriteSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::TitleAsc,
            Self::TitleDesc,
            Self::AddedRecent,
            Self::AddedOldest,
        ]
        .into_iter()
        .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown favorites sort: {s}"))
    }
}

/// Immutable favorites snapshot, insertion order, unique by identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Favorites(Arc<Vec<FavoriteEntry>>);

impl Favorites {
    /// Builds a snapshot, keeping the first entry for any repeated identity.
    pub fn from_entries(entries: Vec<FavoriteEntry>) -> Self {
        let mut seen = HashSet::new();
        let unique = entries
            .into_iter()
            .filter(|entry| seen.insert(entry.identity.clone()))
            .collect();
        Self(Arc::new(unique))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FavoriteEntry> {
        self.0.iter()
    }

    pub fn entries(&self) -> &[FavoriteEntry] {
        &self.0
    }

    pub fn contains(&self, identity: &EpisodeId) -> bool {
        self.get(identity).is_some()
    }

    pub fn get(&self, identity: &EpisodeId) -> Option<&FavoriteEntry> {
        self.0.iter().find(|entry| &entry.identity == identity)
    }

    pub fn sorted(&self, sort: FavoriteSort) -> Vec<&FavoriteEntry> {
        let mut entries: Vec<&FavoriteEntry> = self.0.iter().collect();
        entries.sort_by(|a, b| match sort {
            FavoriteSort::TitleAsc => compare_titles(&a.title, &b.title),
            FavoriteSort::TitleDesc => compare_titles(&b.title, &a.title),
            FavoriteSort::AddedRecent => b
                .favorited_at
                .cmp(&a.favorited_at)
                .then_with(|| compare_titles(&a.title, &b.title)),
            FavoriteSort::AddedOldest => a
                .favorited_at
                .cmp(&b.favorited_at)
                .then_with(|| compare_titles(&a.title, &b.title)),
        });
        entries
    }

    /// Entries grouped by show, groups in first-seen order.
    pub fn by_show(&self) -> Vec<(&str, Vec<&FavoriteEntry>)> {
        let mut groups: Vec<(&str, Vec<&FavoriteEntry>)> = Vec::new();
        for entry in self.0.iter() {
            match groups.iter_mut().find(|(show_id, _)| *show_id == entry.show_id) {
                Some((_, members)) => members.push(entry),
                None => groups.push((entry.show_id.as_str(), vec![entry])),
            }
        }
        groups
    }
}

pub struct FavoritesStore {
    path: PathBuf,
    snapshot: Favorites,
}

impl FavoritesStore {
    /// Open the store at `path`, loading whatever snapshot is there.
    pub fn open(path: PathBuf) -> Self {
        let snapshot = Self::load(&path);
        info!("Loaded {} favorites from {:?}", snapshot.len(), path);
        Self { path, snapshot }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Favorites {
        self.snapshot.clone()
    }

    /// Deserialize the persisted snapshot. Never fails.
    pub fn load(path: &Path) -> Favorites {
        match Self::read_snapshot(path) {
            Ok(entries) => Favorites::from_entries(entries),
            Err(PersistenceError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No favorites snapshot at {:?}", path);
                Favorites::default()
            }
            Err(e) => {
                warn!("Ignoring unreadable favorites snapshot {:?}: {}", path, e);
                Favorites::default()
            }
        }
    }

    fn read_snapshot(path: &Path) -> Result<Vec<FavoriteEntry>, PersistenceError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Sibling file the next snapshot is staged in before it replaces
    /// the real one.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Serialize the full snapshot to disk. The previous snapshot stays in
    /// place until the new one is completely written.
    pub async fn persist(&self, snapshot: &Favorites) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(snapshot.entries())?;

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Favorite the episode, or unfavorite it if already present.
    pub async fn toggle(&mut self, show_id: &str, episode: &Episode) -> Favorites {
        if self.snapshot.contains(&episode.identity) {
            return self.remove(&episode.identity).await;
        }
        let entry = FavoriteEntry::from_episode(show_id, episode, Utc::now());
        self.insert(entry).await
    }

    /// Add an entry unless its identity is already present.
    pub async fn insert(&mut self, entry: FavoriteEntry) -> Favorites {
        if self.snapshot.contains(&entry.identity) {
            return self.snapshot();
        }
        debug!("Favoriting {}", entry.identity);
        let mut entries = self.snapshot.entries().to_vec();
        entries.push(entry);
        self.commit(entries).await
    }

    /// Unfavorite by identity alone; no catalog context needed.
    pub async fn remove(&mut self, identity: &EpisodeId) -> Favorites {
        if !self.snapshot.contains(identity) {
            return self.snapshot();
        }
        debug!("Unfavoriting {}", identity);
        let entries = self
            .snapshot
            .iter()
            .filter(|entry| &entry.identity != identity)
            .cloned()
            .collect();
        self.commit(entries).await
    }

    pub async fn clear(&mut self) -> Favorites {
        info!("Clearing {} favorites", self.snapshot.len());
        self.commit(Vec::new()).await
    }

    async fn commit(&mut self, entries: Vec<FavoriteEntry>) -> Favorites {
        self.snapshot = Favorites::from_entries(entries);
        if let Err(e) = self.persist(&self.snapshot).await {
            error!("Failed to persist favorites to {:?}: {}", self.path, e);
        }
        self.snapshot()
    }
}

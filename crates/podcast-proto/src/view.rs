//! Read-only projections over the enriched catalog.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::catalog::{GenreId, Show, UpdatedAt};
use crate::error::CatalogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    TitleAsc,
    TitleDesc,
    UpdatedRecent,
    UpdatedOldest,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::TitleAsc,
        SortKey::TitleDesc,
        SortKey::UpdatedRecent,
        SortKey::UpdatedOldest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
            Self::UpdatedRecent => "updated-recent",
            Self::UpdatedOldest => "updated-oldest",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown sort key: {s}"))
    }
}

/// Case-folded comparison first, raw text as the tie-break so the order is
/// total ("alpha" and "Alpha" never compare equal).
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
        .then_with(|| a.cmp(b))
}

/// Unknown dates go last in both directions.
fn compare_updated(a: UpdatedAt, b: UpdatedAt, recent_first: bool) -> Ordering {
    match (a.known(), b.known()) {
        (Some(a), Some(b)) if recent_first => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare(key: SortKey, a: &Show, b: &Show) -> Ordering {
    match key {
        SortKey::TitleAsc => compare_titles(&a.title, &b.title),
        SortKey::TitleDesc => compare_titles(&b.title, &a.title),
        SortKey::UpdatedRecent => compare_updated(a.updated, b.updated, true)
            .then_with(|| compare_titles(&a.title, &b.title)),
        SortKey::UpdatedOldest => compare_updated(a.updated, b.updated, false)
            .then_with(|| compare_titles(&a.title, &b.title)),
    }
}

/// Filter by genre (if any) and sort. Never touches the catalog itself.
pub fn project(catalog: &[Show], genre: Option<GenreId>, sort: SortKey) -> Vec<&Show> {
    let mut shows: Vec<&Show> = catalog
        .iter()
        .filter(|show| genre.map_or(true, |g| show.genre_ids.contains(&g)))
        .collect();
    shows.sort_by(|a, b| compare(sort, a, b));
    shows
}

/// Case-insensitive title substring match, applied on top of a projection.
pub fn search<'a>(shows: Vec<&'a Show>, query: &str) -> Vec<&'a Show> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return shows;
    }
    shows
        .into_iter()
        .filter(|show| show.title.to_lowercase().contains(&needle))
        .collect()
}

/// Every genre id in the catalog, first-seen order.
pub fn genres(catalog: &[Show]) -> Vec<GenreId> {
    let mut seen = HashSet::new();
    catalog
        .iter()
        .flat_map(|show| show.genre_ids.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect()
}

pub fn find_show<'a>(catalog: &'a [Show], id: &str) -> Result<&'a Show, CatalogError> {
    catalog
        .iter()
        .find(|show| show.id == id)
        .ok_or_else(|| CatalogError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(id: &str, title: &str, genres: &[GenreId], updated: Option<&str>) -> Show {
        Show {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            image_url: String::new(),
            genre_ids: genres.to_vec(),
            seasons: Vec::new(),
            updated: UpdatedAt::parse(updated),
        }
    }

    fn titles(shows: &[&Show]) -> Vec<String> {
        shows.iter().map(|s| s.title.clone()).collect()
    }

    #[test]
    fn test_title_sort_both_directions() {
        let catalog = vec![show("1", "Beta", &[], None), show("2", "Alpha", &[], None)];
        assert_eq!(titles(&project(&catalog, None, SortKey::TitleAsc)), ["Alpha", "Beta"]);
        assert_eq!(titles(&project(&catalog, None, SortKey::TitleDesc)), ["Beta", "Alpha"]);
        // catalog order untouched
        assert_eq!(catalog[0].title, "Beta");
    }

    #[test]
    fn test_title_sort_ignores_case() {
        let catalog = vec![
            show("1", "banana", &[], None),
            show("2", "Apple", &[], None),
            show("3", "cherry", &[], None),
        ];
        assert_eq!(
            titles(&project(&catalog, None, SortKey::TitleAsc)),
            ["Apple", "banana", "cherry"]
        );
    }

    #[test]
    fn test_unknown_dates_sort_last_both_ways() {
        let catalog = vec![
            show("1", "Zed", &[], None),
            show("2", "Old", &[], Some("2020-01-01T00:00:00Z")),
            show("3", "New", &[], Some("2023-01-01T00:00:00Z")),
            show("4", "Also unknown", &[], None),
        ];
        assert_eq!(
            titles(&project(&catalog, None, SortKey::UpdatedRecent)),
            ["New", "Old", "Also unknown", "Zed"]
        );
        assert_eq!(
            titles(&project(&catalog, None, SortKey::UpdatedOldest)),
            ["Old", "New", "Also unknown", "Zed"]
        );
    }

    #[test]
    fn test_equal_dates_tie_break_on_title() {
        let when = Some("2022-06-01T00:00:00Z");
        let catalog = vec![show("1", "b", &[], when), show("2", "a", &[], when)];
        assert_eq!(titles(&project(&catalog, None, SortKey::UpdatedRecent)), ["a", "b"]);
    }

    #[test]
    fn test_genre_filter() {
        let catalog = vec![
            show("1", "One", &[1, 2], None),
            show("2", "Two", &[3], None),
            show("3", "Three", &[2], None),
        ];
        assert_eq!(
            titles(&project(&catalog, Some(2), SortKey::TitleAsc)),
            ["One", "Three"]
        );
        assert!(project(&catalog, Some(99), SortKey::TitleAsc).is_empty());
        assert_eq!(project(&catalog, None, SortKey::TitleAsc).len(), 3);
    }

    #[test]
    fn test_projection_is_repeatable() {
        let catalog = vec![
            show("1", "Same", &[1], None),
            show("2", "Same", &[1], None),
            show("3", "Other", &[1], Some("2021-01-01T00:00:00Z")),
        ];
        for key in SortKey::ALL {
            let first: Vec<_> = project(&catalog, Some(1), key).iter().map(|s| s.id.clone()).collect();
            let second: Vec<_> = project(&catalog, Some(1), key).iter().map(|s| s.id.clone()).collect();
            assert_eq!(first, second, "{key}");
        }
    }

    #[test]
    fn test_genres_first_seen() {
        let catalog = vec![
            show("1", "a", &[5, 2], None),
            show("2", "b", &[2, 9], None),
            show("3", "c", &[], None),
        ];
        assert_eq!(genres(&catalog), vec![5, 2, 9]);
    }

    #[test]
    fn test_search_and_find() {
        let catalog = vec![show("1", "The Daily", &[], None), show("2", "Weekly", &[], None)];
        let hits = search(project(&catalog, None, SortKey::TitleAsc), "  DAILY ");
        assert_eq!(titles(&hits), ["The Daily"]);
        assert_eq!(find_show(&catalog, "2").map(|s| s.title.as_str()), Ok("Weekly"));
        assert_eq!(
            find_show(&catalog, "nope").err(),
            Some(CatalogError::NotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_sort_key_strings() {
        assert_eq!("updated-recent".parse::<SortKey>(), Ok(SortKey::UpdatedRecent));
        assert_eq!("TITLE-DESC".parse::<SortKey>(), Ok(SortKey::TitleDesc));
        assert!("sideways".parse::<SortKey>().is_err());
        assert_eq!(SortKey::UpdatedOldest.to_string(), "updated-oldest");
    }
}

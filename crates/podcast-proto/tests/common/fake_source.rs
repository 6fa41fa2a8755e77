#![allow(dead_code)]

use podcast_proto::catalog::{ShowDetail, ShowSummary};
use podcast_proto::{CatalogError, CatalogSource};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory catalog source with per-show latency and failure injection.
#[derive(Default)]
pub struct FakeSource {
    pub index: Vec<ShowSummary>,
    pub details: HashMap<String, Value>,
    pub delays: HashMap<String, Duration>,
    pub failing: Vec<String>,
    pub index_error: Option<CatalogError>,
    pub detail_calls: AtomicUsize,
    pub completion_order: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(mut self, id: &str, title: &str, detail: Value) -> Self {
        self.index.push(ShowSummary {
            id: id.to_string(),
            title: title.to_string(),
            description: format!("About {title}"),
            image: format!("https://img.invalid/{id}.jpg"),
        });
        self.details.insert(id.to_string(), detail);
        self
    }

    pub fn delay(mut self, id: &str, millis: u64) -> Self {
        self.delays.insert(id.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn fail(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    pub fn completions(&self) -> Vec<String> {
        self.completion_order.lock().unwrap().clone()
    }
}

impl CatalogSource for FakeSource {
    async fn fetch_catalog(&self) -> Result<Vec<ShowSummary>, CatalogError> {
        match &self.index_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.index.clone()),
        }
    }

    async fn fetch_detail(&self, id: &str) -> Result<ShowDetail, CatalogError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(id) {
            tokio::time::sleep(*delay).await;
        }
        self.completion_order.lock().unwrap().push(id.to_string());

        if self.failing.iter().any(|f| f == id) {
            return Err(CatalogError::Network(format!("{id}: connection reset")));
        }
        let value = self
            .details
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;
        serde_json::from_value(value).map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

/// Detail body shaped like the real `/id/{id}` response.
pub fn detail(genres: &[u32], updated: Option<&str>, seasons: &[&[u32]]) -> Value {
    let seasons: Vec<Value> = seasons
        .iter()
        .enumerate()
        .map(|(idx, episodes)| {
            json!({
                "season": idx + 1,
                "title": format!("Season {}", idx + 1),
                "image": format!("https://img.invalid/season-{}.jpg", idx + 1),
                "episodes": episodes.iter().map(|n| json!({
                    "title": format!("S{} Episode {}", idx + 1, n),
                    "episode": n,
                    "file": format!("https://audio.invalid/{}/{}.mp3", idx + 1, n),
                    "description": "",
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let mut body = json!({ "genres": genres, "seasons": seasons });
    if let Some(updated) = updated {
        body["updated"] = json!(updated);
    }
    body
}

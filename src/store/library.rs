//! Per-user media library.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::StoreError;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

/// A saved generation result.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaItem {
    pub id: Uuid,
    pub user_id: String,
    pub url: String,
    pub media_type: MediaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when saving an item.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMediaItem {
    pub url: String,
    #[serde(alias = "mediaType", alias = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Default)]
pub struct MediaLibrary {
    items: DashMap<String, Vec<MediaItem>>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user_id: &str, item: NewMediaItem) -> MediaItem {
        let item = MediaItem {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            url: item.url,
            media_type: item.media_type,
            prompt: item.prompt,
            title: item.title,
            created_at: Utc::now(),
        };
        self.items
            .entry(user_id.to_string())
            .or_default()
            .push(item.clone());
        item
    }

    /// The user's items, newest first.
    pub fn list(&self, user_id: &str, limit: usize) -> Vec<MediaItem> {
        self.items
            .get(user_id)
            .map(|items| items.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub fn remove(&self, user_id: &str, id: Uuid) -> Result<MediaItem, StoreError> {
        let mut items = self
            .items
            .get_mut(user_id)
            .ok_or(StoreError::NotFound("Media item"))?;
        let index = items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreError::NotFound("Media item"))?;
        Ok(items.remove(index))
    }

    pub fn count(&self, user_id: &str) -> usize {
        self.items.get(user_id).map_or(0, |items| items.len())
    }
}

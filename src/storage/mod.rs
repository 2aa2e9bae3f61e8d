//! In-memory media store.
//!
//! Trivial map-based repository consumed by the import pipeline and the
//! catalog endpoints. No durability: contents live for the process
//! lifetime. Import sessions mutate the collection wholesale and are
//! serialized by the callers holding the web layer's import lock.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{ContentType, DraftMediaItem, Episode, MediaItem};

#[derive(Clone, Default)]
pub struct MediaStore {
    media: Arc<RwLock<HashMap<Uuid, MediaItem>>>,
    episodes: Arc<RwLock<HashMap<Uuid, Vec<Episode>>>>,
}

impl MediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_media(&self, draft: DraftMediaItem) -> MediaItem {
        let item = MediaItem {
            id: Uuid::new_v4(),
            title: draft.title,
            thumbnail_url: draft.thumbnail_url,
            content_type: draft.content_type,
            category: draft.category,
            description: draft.description,
            is_featured: draft.is_featured,
            stream_url: draft.stream_url,
            added_at: Utc::now(),
        };
        let mut media = self.media.write().await;
        media.insert(item.id, item.clone());
        item
    }

    pub async fn delete_media(&self, id: Uuid) -> bool {
        let removed = self.media.write().await.remove(&id).is_some();
        if removed {
            self.episodes.write().await.remove(&id);
        }
        removed
    }

    pub async fn get_media(&self, id: Uuid) -> Option<MediaItem> {
        self.media.read().await.get(&id).cloned()
    }

    /// All media, newest first so catalog listings are stable.
    pub async fn get_all_media(&self) -> Vec<MediaItem> {
        let mut items: Vec<MediaItem> = self.media.read().await.values().cloned().collect();
        items.sort_by(|a, b| b.added_at.cmp(&a.added_at).then(a.id.cmp(&b.id)));
        items
    }

    pub async fn get_media_by_type(&self, content_type: ContentType) -> Vec<MediaItem> {
        self.get_all_media()
            .await
            .into_iter()
            .filter(|item| item.content_type == content_type)
            .collect()
    }

    pub async fn get_featured_media(&self) -> Vec<MediaItem> {
        self.get_all_media()
            .await
            .into_iter()
            .filter(|item| item.is_featured)
            .collect()
    }

    pub async fn set_featured(&self, id: Uuid, featured: bool) -> bool {
        let mut media = self.media.write().await;
        match media.get_mut(&id) {
            Some(item) => {
                item.is_featured = featured;
                true
            }
            None => false,
        }
    }

    pub async fn create_episode(&self, episode: Episode) -> Episode {
        let mut episodes = self.episodes.write().await;
        episodes
            .entry(episode.media_id)
            .or_default()
            .push(episode.clone());
        episode
    }

    /// Episodes for a series, in season/episode order.
    pub async fn get_episodes(&self, media_id: Uuid) -> Vec<Episode> {
        let mut list = self
            .episodes
            .read()
            .await
            .get(&media_id)
            .cloned()
            .unwrap_or_default();
        list.sort_by_key(|ep| (ep.season_number, ep.episode_number));
        list
    }

    pub async fn clear(&self) -> usize {
        let mut media = self.media.write().await;
        let removed = media.len();
        media.clear();
        self.episodes.write().await.clear();
        removed
    }

    pub async fn media_count(&self) -> usize {
        self.media.read().await.len()
    }
}

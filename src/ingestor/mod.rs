//! Playlist ingestion pipeline.
//!
//! One shared pipeline handles both playlist sources: load text through a
//! [`PlaylistSource`], tokenize it, apply credential rewriting, then import
//! the drafts into the media store with per-item validation, placeholder
//! episodes for series and featured-content backfill.

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{AppError, IngestError};
use crate::models::{ContentType, DraftMediaItem, Episode, ImportSummary};
use crate::services::CredentialRewriter;
use crate::storage::MediaStore;

pub mod playlist_parser;

pub use playlist_parser::{ParsedPlaylist, PlaylistParser};

/// How many items should carry the featured flag after an import.
const FEATURED_TARGET: usize = 5;

/// Where playlist text comes from. Both implementations feed the same
/// parse/import pipeline.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    fn describe(&self) -> String;
    async fn load(&self) -> Result<String, IngestError>;
}

pub struct RemotePlaylist {
    url: String,
    client: reqwest::Client,
}

impl RemotePlaylist {
    pub fn new(url: String, client: reqwest::Client) -> Self {
        Self { url, client }
    }
}

#[async_trait]
impl PlaylistSource for RemotePlaylist {
    fn describe(&self) -> String {
        format!("remote playlist {}", self.url)
    }

    async fn load(&self) -> Result<String, IngestError> {
        use futures::StreamExt;

        info!("Fetching playlist from: {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| IngestError::fetch(&self.url, e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(IngestError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(IngestError::fetch(
                &self.url,
                format!("HTTP {}", response.status()),
            ));
        }

        // Provider playlists run to tens of megabytes; accumulate the body
        // chunk by chunk instead of waiting on a single read. Raw bytes are
        // buffered and decoded once at the end: chunk boundaries can land in
        // the middle of a multi-byte character.
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| IngestError::InvalidPayload {
                message: e.to_string(),
            })?;
            buffer.extend_from_slice(&chunk);
        }
        debug!("Downloaded {} bytes from playlist source", buffer.len());

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

pub struct LocalPlaylist {
    path: PathBuf,
}

impl LocalPlaylist {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[async_trait]
impl PlaylistSource for LocalPlaylist {
    fn describe(&self) -> String {
        format!("local playlist {}", self.path.display())
    }

    async fn load(&self) -> Result<String, IngestError> {
        info!("Reading local playlist from: {}", self.path.display());
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| IngestError::FileRead {
                path: self.path.display().to_string(),
                source,
            })
    }
}

/// Knobs for a single import session.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Empty the store before importing
    pub clear: bool,
    /// Hard cap on the number of items imported
    pub limit: Option<usize>,
    /// Cap items per content type (local imports; keeps huge provider
    /// playlists from swamping the store)
    pub cap_per_type: Option<usize>,
}

#[derive(Clone)]
pub struct PlaylistIngestor {
    parser: std::sync::Arc<PlaylistParser>,
    rewriter: CredentialRewriter,
    client: reqwest::Client,
    playlist_url: String,
    local_path: PathBuf,
    max_items_per_type: usize,
    episodes_per_series: u32,
}

impl PlaylistIngestor {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(config.proxy.user_agent.clone())
            .build()?;

        Ok(Self {
            parser: std::sync::Arc::new(PlaylistParser::new()),
            rewriter: CredentialRewriter::from_config(&config.provider),
            client,
            playlist_url: config.playlist.url.clone(),
            local_path: config.playlist.local_path.clone(),
            max_items_per_type: config.playlist.max_items_per_type,
            episodes_per_series: config.playlist.episodes_per_series,
        })
    }

    /// The configured remote playlist, with provider credentials injected
    /// into the playlist URL itself.
    pub fn remote_source(&self) -> RemotePlaylist {
        let url = self.rewriter.rewrite(&self.playlist_url);
        RemotePlaylist::new(url, self.client.clone())
    }

    pub fn local_source(&self) -> LocalPlaylist {
        LocalPlaylist::new(self.local_path.clone())
    }

    pub fn default_type_cap(&self) -> usize {
        self.max_items_per_type
    }

    /// Load and tokenize a playlist source, normalizing stream URLs.
    /// I/O failure is total: no partial item list is ever returned.
    pub async fn parse_source(
        &self,
        source: &dyn PlaylistSource,
    ) -> Result<ParsedPlaylist, IngestError> {
        let content = source.load().await?;
        let mut parsed = self.parser.parse(&content);
        for item in &mut parsed.items {
            item.stream_url = self.rewriter.rewrite(&item.stream_url);
        }
        info!(
            "Parsed {} items ({} dropped) from {}",
            parsed.items.len(),
            parsed.dropped,
            source.describe()
        );
        if parsed.dropped > 0 {
            warn!(
                "{}: {} metadata blocks had no URL line and were discarded",
                source.describe(),
                parsed.dropped
            );
        }
        Ok(parsed)
    }

    /// Persist parsed items. Individual invalid items are skipped and
    /// counted; the import itself always completes.
    pub async fn import(
        &self,
        store: &MediaStore,
        parsed: ParsedPlaylist,
        options: ImportOptions,
    ) -> ImportSummary {
        if options.clear {
            let removed = store.clear().await;
            debug!("Cleared {} existing media items before import", removed);
        }

        let mut items = parsed.items;
        if let Some(cap) = options.cap_per_type {
            items = cap_per_type(items, cap);
        }
        if let Some(limit) = options.limit {
            items.truncate(limit);
        }

        let total = items.len();
        let mut imported = 0usize;
        let mut failed = 0usize;

        for item in items {
            if item.title.trim().is_empty() || item.stream_url.trim().is_empty() {
                failed += 1;
                continue;
            }

            let content_type = item.content_type;
            let stream_url = item.stream_url.clone();
            let saved = store.create_media(item).await;
            imported += 1;

            if content_type == ContentType::Series {
                self.create_placeholder_episodes(store, saved.id, &saved.title, &stream_url)
                    .await;
            }
        }

        self.backfill_featured(store).await;

        info!("Import finished: {}/{} items imported, {} failed", imported, total, failed);
        ImportSummary {
            success: true,
            total,
            imported,
            failed,
            dropped_entries: parsed.dropped,
            message: format!("Successfully imported {} media items", imported),
        }
    }

    /// Replace the catalog with the built-in demo dataset. Used directly by
    /// the demo endpoint and as the rate-limit fallback during imports.
    pub async fn import_demo(&self, store: &MediaStore) -> ImportSummary {
        let parsed = ParsedPlaylist {
            items: demo_content(),
            dropped: 0,
        };
        self.import(
            store,
            parsed,
            ImportOptions {
                clear: true,
                ..Default::default()
            },
        )
        .await
    }

    async fn create_placeholder_episodes(
        &self,
        store: &MediaStore,
        media_id: Uuid,
        series_title: &str,
        stream_url: &str,
    ) {
        for number in 1..=self.episodes_per_series {
            store
                .create_episode(Episode {
                    id: Uuid::new_v4(),
                    media_id,
                    title: format!("Episódio {}", number),
                    season_number: 1,
                    episode_number: number,
                    stream_url: stream_url.to_string(),
                    thumbnail_url: Some(format!(
                        "https://picsum.photos/seed/episode{}_{}/300/450",
                        media_id, number
                    )),
                    description: format!("Episódio {} da série {}", number, series_title),
                })
                .await;
        }
    }

    /// Make sure the carousel has something to show: when fewer than the
    /// target are featured, promote a random mix of types.
    async fn backfill_featured(&self, store: &MediaStore) {
        let all_media = store.get_all_media().await;
        if all_media.is_empty() {
            return;
        }
        let featured = all_media.iter().filter(|m| m.is_featured).count();
        if featured >= FEATURED_TARGET {
            return;
        }

        let mut promoted = 0usize;
        for (content_type, want) in [
            (ContentType::Movie, 2usize),
            (ContentType::Series, 2usize),
            (ContentType::Channel, 1usize),
        ] {
            let mut candidates: Vec<Uuid> = all_media
                .iter()
                .filter(|m| m.content_type == content_type && !m.is_featured)
                .map(|m| m.id)
                .collect();
            fastrand::shuffle(&mut candidates);
            for id in candidates.into_iter().take(want) {
                if store.set_featured(id, true).await {
                    promoted += 1;
                }
            }
        }
        if promoted > 0 {
            debug!("Promoted {} items to featured", promoted);
        }
    }
}

/// Keep at most `cap` items of each content type, preserving source order.
fn cap_per_type(items: Vec<DraftMediaItem>, cap: usize) -> Vec<DraftMediaItem> {
    let mut movies = 0usize;
    let mut series = 0usize;
    let mut channels = 0usize;
    items
        .into_iter()
        .filter(|item| {
            let count = match item.content_type {
                ContentType::Movie => &mut movies,
                ContentType::Series => &mut series,
                ContentType::Channel => &mut channels,
            };
            if *count < cap {
                *count += 1;
                true
            } else {
                false
            }
        })
        .collect()
}

/// Known-good demo catalog served when the provider rate limits us.
/// The stream URL plays in HLS.js without authentication.
pub fn demo_content() -> Vec<DraftMediaItem> {
    const DEMO_URL: &str =
        "https://demo.unified-streaming.com/k8s/features/stable/video/tears-of-steel/tears-of-steel.ism/.m3u8";

    let entries: [(&str, ContentType, &str, &str, bool, &str); 10] = [
        (
            "Aventura na Floresta",
            ContentType::Movie,
            "Aventura",
            "Um grupo de amigos se perde na floresta e precisa encontrar o caminho para casa.",
            true,
            "movie1",
        ),
        (
            "Corrida contra o Tempo",
            ContentType::Movie,
            "Ação",
            "Um piloto de corridas precisa vencer a corrida mais importante de sua vida.",
            false,
            "movie2",
        ),
        (
            "O Mistério da Casa Antiga",
            ContentType::Movie,
            "Suspense",
            "Uma família se muda para uma casa misteriosa e descobre segredos sombrios.",
            false,
            "movie3",
        ),
        (
            "Amor em Paris",
            ContentType::Movie,
            "Romance",
            "Dois estranhos se encontram em Paris e vivem uma história de amor inesquecível.",
            true,
            "movie4",
        ),
        (
            "A Vida na Cidade",
            ContentType::Series,
            "Drama",
            "A história de amigos que vivem diversas situações na cidade grande.",
            true,
            "series1",
        ),
        (
            "Investigadores",
            ContentType::Series,
            "Crime",
            "Uma equipe de detetives resolve crimes complexos.",
            false,
            "series2",
        ),
        (
            "Mundos Paralelos",
            ContentType::Series,
            "Ficção",
            "Uma cientista descobre como viajar entre mundos paralelos.",
            false,
            "series3",
        ),
        (
            "Notícias 24h",
            ContentType::Channel,
            "Notícias",
            "Canal de notícias 24 horas por dia.",
            false,
            "channel1",
        ),
        (
            "Esportes ao Vivo",
            ContentType::Channel,
            "Esportes",
            "Os melhores eventos esportivos ao vivo.",
            true,
            "channel2",
        ),
        (
            "Documentários",
            ContentType::Channel,
            "Educativo",
            "Documentários sobre natureza, história e ciência.",
            false,
            "channel3",
        ),
    ];

    entries
        .into_iter()
        .map(
            |(title, content_type, category, description, is_featured, seed)| DraftMediaItem {
                title: title.to_string(),
                thumbnail_url: Some(format!("https://picsum.photos/seed/{}/300/450", seed)),
                content_type,
                category: category.to_string(),
                description: description.to_string(),
                is_featured,
                stream_url: DEMO_URL.to_string(),
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn ingestor() -> PlaylistIngestor {
        PlaylistIngestor::new(&Config::default()).unwrap()
    }

    fn draft(title: &str, content_type: ContentType, url: &str) -> DraftMediaItem {
        DraftMediaItem {
            title: title.to_string(),
            thumbnail_url: None,
            content_type,
            category: "Test".to_string(),
            description: String::new(),
            is_featured: false,
            stream_url: url.to_string(),
        }
    }

    #[tokio::test]
    async fn import_skips_invalid_items_and_continues() {
        let store = MediaStore::new();
        let parsed = ParsedPlaylist {
            items: vec![
                draft("Good", ContentType::Movie, "http://x/1.m3u8"),
                draft("", ContentType::Movie, "http://x/2.m3u8"),
                draft("No URL", ContentType::Movie, ""),
                draft("Also Good", ContentType::Movie, "http://x/3.m3u8"),
            ],
            dropped: 2,
        };

        let summary = ingestor()
            .import(&store, parsed, ImportOptions::default())
            .await;
        assert_eq!(summary.total, 4);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.dropped_entries, 2);
        assert_eq!(store.media_count().await, 2);
    }

    #[tokio::test]
    async fn series_get_placeholder_episodes() {
        let store = MediaStore::new();
        let parsed = ParsedPlaylist {
            items: vec![draft("Show", ContentType::Series, "http://x/s.m3u8")],
            dropped: 0,
        };

        ingestor()
            .import(&store, parsed, ImportOptions::default())
            .await;

        let series = store.get_media_by_type(ContentType::Series).await;
        assert_eq!(series.len(), 1);
        let episodes = store.get_episodes(series[0].id).await;
        assert_eq!(episodes.len(), 5);
        assert_eq!(episodes[0].title, "Episódio 1");
        assert_eq!(episodes[4].episode_number, 5);
    }

    #[tokio::test]
    async fn clear_option_replaces_existing_content() {
        let store = MediaStore::new();
        store
            .create_media(draft("Old", ContentType::Movie, "http://x/old.m3u8"))
            .await;

        let parsed = ParsedPlaylist {
            items: vec![draft("New", ContentType::Movie, "http://x/new.m3u8")],
            dropped: 0,
        };
        ingestor()
            .import(
                &store,
                parsed,
                ImportOptions {
                    clear: true,
                    ..Default::default()
                },
            )
            .await;

        let all = store.get_all_media().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "New");
    }

    #[tokio::test]
    async fn featured_backfill_promotes_items() {
        let store = MediaStore::new();
        let parsed = ParsedPlaylist {
            items: demo_content()
                .into_iter()
                .map(|mut item| {
                    item.is_featured = false;
                    item
                })
                .collect(),
            dropped: 0,
        };

        ingestor()
            .import(&store, parsed, ImportOptions::default())
            .await;
        assert!(!store.get_featured_media().await.is_empty());
    }

    #[test]
    fn cap_per_type_keeps_first_n_of_each() {
        let items = vec![
            draft("M1", ContentType::Movie, "u"),
            draft("M2", ContentType::Movie, "u"),
            draft("S1", ContentType::Series, "u"),
            draft("M3", ContentType::Movie, "u"),
            draft("C1", ContentType::Channel, "u"),
        ];
        let capped = cap_per_type(items, 2);
        let titles: Vec<&str> = capped.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["M1", "M2", "S1", "C1"]);
    }

    #[test]
    fn demo_content_covers_all_types() {
        let demo = demo_content();
        assert_eq!(demo.len(), 10);
        for ct in [ContentType::Movie, ContentType::Series, ContentType::Channel] {
            assert!(demo.iter().any(|i| i.content_type == ct));
        }
        assert!(demo.iter().all(|i| !i.stream_url.is_empty()));
    }

    #[test]
    fn remote_source_carries_injected_credentials() {
        let mut config = Config::default();
        config.playlist.url = "http://main.cdnfs.top:80/get.php?type=m3u&output=hls".to_string();
        config.provider.username = "user123".to_string();
        config.provider.password = "pass456".to_string();
        let source = PlaylistIngestor::new(&config).unwrap().remote_source();
        assert!(source.describe().contains("username=user123"));
        assert!(source.describe().contains("password=pass456"));
    }
}

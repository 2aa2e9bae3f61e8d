//! M3U8 playlist tokenizer/parser.
//!
//! Scans playlist text line by line with an explicit two-state machine. An
//! `#EXTINF:` directive opens a draft item; the next non-comment line closes
//! it with the stream URL. A draft that never sees a URL line is discarded
//! and counted, so operators can spot malformed sources by their drop rate.

use regex::Regex;
use tracing::debug;

use crate::models::DraftMediaItem;
use crate::services::classifier;

/// Parse output: completed items in source order plus the number of
/// metadata blocks discarded for lacking a URL line.
#[derive(Debug, Default)]
pub struct ParsedPlaylist {
    pub items: Vec<DraftMediaItem>,
    pub dropped: usize,
}

enum ParserState {
    AwaitingMetadata,
    AwaitingUrl(DraftMediaItem),
}

pub struct PlaylistParser {
    name_re: Regex,
    logo_re: Regex,
    group_re: Regex,
}

impl Default for PlaylistParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaylistParser {
    pub fn new() -> Self {
        Self {
            name_re: Regex::new(r#"tvg-name="([^"]+)""#).expect("tvg-name pattern is valid"),
            logo_re: Regex::new(r#"tvg-logo="([^"]+)""#).expect("tvg-logo pattern is valid"),
            group_re: Regex::new(r#"group-title="([^"]+)""#).expect("group-title pattern is valid"),
        }
    }

    pub fn parse(&self, content: &str) -> ParsedPlaylist {
        let mut result = ParsedPlaylist::default();
        let mut state = ParserState::AwaitingMetadata;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with("#EXTINF:") {
                // A second EXTINF before any URL line orphans the open draft.
                if matches!(state, ParserState::AwaitingUrl(_)) {
                    result.dropped += 1;
                }
                state = ParserState::AwaitingUrl(self.open_draft(line));
            } else if line.starts_with('#') {
                // Other directives carry nothing we need.
                continue;
            } else {
                state = match std::mem::replace(&mut state, ParserState::AwaitingMetadata) {
                    ParserState::AwaitingUrl(mut draft) => {
                        draft.stream_url = line.to_string();
                        result.items.push(draft);
                        ParserState::AwaitingMetadata
                    }
                    // URL line with no open item: ignored.
                    ParserState::AwaitingMetadata => ParserState::AwaitingMetadata,
                };
            }
        }

        if matches!(state, ParserState::AwaitingUrl(_)) {
            result.dropped += 1;
        }

        debug!(
            "Parsed playlist: {} items, {} dropped metadata blocks",
            result.items.len(),
            result.dropped
        );
        result
    }

    /// Build a draft from an `#EXTINF:` line. Extraction is best effort;
    /// malformed attributes degrade to defaults instead of aborting.
    fn open_draft(&self, line: &str) -> DraftMediaItem {
        let title = self
            .capture(&self.name_re, line)
            .or_else(|| title_after_comma(line))
            .unwrap_or_default();
        let thumbnail_url = self.capture(&self.logo_re, line);
        let category = self
            .capture(&self.group_re, line)
            .unwrap_or_else(|| "Uncategorized".to_string());
        let content_type = classifier::classify(&category);

        DraftMediaItem {
            description: format!("Canal IPTV: {}", title),
            title,
            thumbnail_url,
            content_type,
            category,
            is_featured: false,
            stream_url: String::new(),
        }
    }

    fn capture(&self, re: &Regex, line: &str) -> Option<String> {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Display-name fallback: the text after the first comma of the EXTINF line.
fn title_after_comma(line: &str) -> Option<String> {
    line.split_once(',').and_then(|(_, rest)| {
        let trimmed = rest.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

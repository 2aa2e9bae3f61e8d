//! Content classification from playlist group titles.
//!
//! One canonical rule table serves both the local-file and remote ingestion
//! paths. Matching is a case-insensitive substring check; the first matching
//! rule wins and anything unmatched is a movie.

use crate::models::ContentType;

/// Keywords marking a live channel group.
const CHANNEL_KEYWORDS: &[&str] = &["canal", "channel", "tv"];

/// Keywords marking a series group.
const SERIES_KEYWORDS: &[&str] = &["série", "series", "temporada", "season"];

/// Infer the content type from a playlist category string.
pub fn classify(category: &str) -> ContentType {
    let lowered = category.to_lowercase();

    if CHANNEL_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ContentType::Channel;
    }
    if SERIES_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        return ContentType::Series;
    }
    ContentType::Movie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_keywords_win() {
        assert_eq!(classify("Canal Esportes"), ContentType::Channel);
        assert_eq!(classify("UK | CHANNELS"), ContentType::Channel);
        assert_eq!(classify("TV Aberta"), ContentType::Channel);
    }

    #[test]
    fn series_keywords_match() {
        assert_eq!(classify("2ª Temporada"), ContentType::Series);
        assert_eq!(classify("Séries Brasil"), ContentType::Series);
        assert_eq!(classify("Season Finale"), ContentType::Series);
    }

    #[test]
    fn default_is_movie() {
        assert_eq!(classify("Drama"), ContentType::Movie);
        assert_eq!(classify(""), ContentType::Movie);
    }

    #[test]
    fn classification_is_idempotent() {
        for category in ["Canal Esportes", "Drama", "2ª Temporada"] {
            assert_eq!(classify(category), classify(category));
        }
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(classify("CANAL"), ContentType::Channel);
        assert_eq!(classify("SeRiEs"), ContentType::Series);
    }
}

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{PlaylistEntry, TrackCandidate};

static TRAILING_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+-\s+$").unwrap());
static LEADING_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+-\s+").unwrap());
static DOUBLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+-\s+-\s+").unwrap());
static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

const LRC_EXTENSION: &str = ".lrc";

/// How exported `.lrc` files are named. Patterns use `{Artist}`, `{Title}`
/// and `{Album}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FilenameFormat {
    #[default]
    ArtistTitle,
    Title,
    ArtistAlbumTitle,
    TitleArtist,
    Custom(String),
}

impl FilenameFormat {
    pub const PRESETS: [FilenameFormat; 4] = [
        FilenameFormat::ArtistTitle,
        FilenameFormat::Title,
        FilenameFormat::ArtistAlbumTitle,
        FilenameFormat::TitleArtist,
    ];

    pub fn pattern(&self) -> &str {
        match self {
            FilenameFormat::ArtistTitle => "{Artist} - {Title}",
            FilenameFormat::Title => "{Title}",
            FilenameFormat::ArtistAlbumTitle => "{Artist} - {Album} - {Title}",
            FilenameFormat::TitleArtist => "{Title} - {Artist}",
            FilenameFormat::Custom(pattern) => pattern,
        }
    }

    fn preset_id(&self) -> Option<&'static str> {
        match self {
            FilenameFormat::ArtistTitle => Some("artist-title"),
            FilenameFormat::Title => Some("title"),
            FilenameFormat::ArtistAlbumTitle => Some("artist-album-title"),
            FilenameFormat::TitleArtist => Some("title-artist"),
            FilenameFormat::Custom(_) => None,
        }
    }
}

impl fmt::Display for FilenameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.preset_id().unwrap_or_else(|| self.pattern()))
    }
}

impl FromStr for FilenameFormat {
    type Err = String;

    /// Accepts a preset id or a custom pattern containing at least one placeholder.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(preset) = Self::PRESETS
            .iter()
            .find(|preset| preset.preset_id() == Some(s))
        {
            return Ok(preset.clone());
        }
        if ["{Artist}", "{Title}", "{Album}"]
            .iter()
            .any(|placeholder| s.contains(placeholder))
        {
            return Ok(FilenameFormat::Custom(s.to_string()));
        }
        Err(format!(
            "unknown filename format '{}': use artist-title, title, artist-album-title, title-artist or a pattern with {{Artist}}/{{Title}}/{{Album}}",
            s
        ))
    }
}

impl TryFrom<String> for FilenameFormat {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FilenameFormat> for String {
    fn from(format: FilenameFormat) -> Self {
        format.to_string()
    }
}

/// Replaces characters that are not allowed in file names with `_`.
pub fn sanitize(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name, "_").into_owned()
}

fn ensure_lrc_extension(mut name: String) -> String {
    if !name.to_lowercase().ends_with(LRC_EXTENSION) {
        name.push_str(LRC_EXTENSION);
    }
    name
}

pub fn format_filename(track: &TrackCandidate, format: &FilenameFormat) -> String {
    let name = format
        .pattern()
        .replace("{Title}", &track.track_name)
        .replace("{Artist}", &track.artist_name)
        .replace("{Album}", &track.album_name);

    let name = TRAILING_SEPARATOR.replace_all(&name, "");
    let name = LEADING_SEPARATOR.replace_all(&name, "");
    let name = DOUBLE_SEPARATOR.replace_all(&name, " - ");

    ensure_lrc_extension(sanitize(name.trim()))
}

impl PlaylistEntry {
    /// The entry's own `fileName` if it has one, otherwise the matched track
    /// formatted with `format`. `None` when neither is available.
    pub fn output_file_name(&self, format: &FilenameFormat) -> Option<String> {
        if let Some(name) = self.file_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Some(ensure_lrc_extension(sanitize(name.trim())));
        }
        self.match_data
            .as_ref()
            .map(|found| format_filename(&found.track, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchResult;
    use crate::test_utils::candidate;

    fn track(title: &str, artist: &str, album: &str) -> TrackCandidate {
        let mut track = candidate(1, title, artist, 200.0);
        track.album_name = album.to_string();
        track
    }

    #[test]
    fn test_presets() {
        let t = track("Blinding Lights", "The Weeknd", "After Hours");

        assert_eq!(
            format_filename(&t, &FilenameFormat::ArtistTitle),
            "The Weeknd - Blinding Lights.lrc"
        );
        assert_eq!(format_filename(&t, &FilenameFormat::Title), "Blinding Lights.lrc");
        assert_eq!(
            format_filename(&t, &FilenameFormat::ArtistAlbumTitle),
            "The Weeknd - After Hours - Blinding Lights.lrc"
        );
        assert_eq!(
            format_filename(&t, &FilenameFormat::TitleArtist),
            "Blinding Lights - The Weeknd.lrc"
        );
    }

    #[test]
    fn test_missing_album_collapses_separator() {
        let t = track("Halo", "Beyoncé", "");
        assert_eq!(
            format_filename(&t, &FilenameFormat::ArtistAlbumTitle),
            "Beyoncé - Halo.lrc"
        );

        let custom = FilenameFormat::Custom("{Album} - {Title}".to_string());
        assert_eq!(format_filename(&t, &custom), "Halo.lrc");
    }

    #[test]
    fn test_unsafe_characters_are_replaced() {
        let t = track("What? / Why*", "AC/DC", "");
        assert_eq!(
            format_filename(&t, &FilenameFormat::ArtistTitle),
            "AC_DC - What_ _ Why_.lrc"
        );
    }

    #[test]
    fn test_parse_presets_and_custom_patterns() {
        assert_eq!(
            "artist-album-title".parse::<FilenameFormat>().unwrap(),
            FilenameFormat::ArtistAlbumTitle
        );
        assert_eq!(
            "{Artist} _ {Title}".parse::<FilenameFormat>().unwrap(),
            FilenameFormat::Custom("{Artist} _ {Title}".to_string())
        );
        assert!("artist_title".parse::<FilenameFormat>().is_err());

        assert_eq!(FilenameFormat::TitleArtist.to_string(), "title-artist");
    }

    #[test]
    fn test_output_file_name_prefers_entry_file_name() {
        let mut entry = PlaylistEntry::new("track-0", "Blinding Lights", "The Weeknd");
        assert_eq!(entry.output_file_name(&FilenameFormat::default()), None);

        entry.match_data = Some(MatchResult {
            track: track("Blinding Lights", "The Weeknd", "After Hours"),
            confidence_score: 0.98,
            confidence_reasons: vec![],
        });
        assert_eq!(
            entry.output_file_name(&FilenameFormat::Title).as_deref(),
            Some("Blinding Lights.lrc")
        );

        entry.file_name = Some("01 - Blinding Lights.LRC".to_string());
        assert_eq!(
            entry.output_file_name(&FilenameFormat::Title).as_deref(),
            Some("01 - Blinding Lights.LRC")
        );

        entry.file_name = Some("02: Save Your Tears".to_string());
        assert_eq!(
            entry.output_file_name(&FilenameFormat::Title).as_deref(),
            Some("02_ Save Your Tears.lrc")
        );
    }
}

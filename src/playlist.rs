use std::collections::HashSet;
use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::{Context, bail};
use serde::Deserialize;

use crate::models::{EntryStatus, MatchResult, PlaylistEntry};

/// One playlist item as accepted on input. The shape is fixed: field names are
/// not guessed and unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawEntry {
    #[serde(default)]
    id: Option<String>,
    track_name: String,
    artist_name: String,
    #[serde(default)]
    album_name: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    status: Option<EntryStatus>,
    #[serde(default)]
    match_data: Option<MatchResult>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn parse_playlist(json: &str) -> Result<Vec<PlaylistEntry>> {
    let raw: Vec<RawEntry> =
        serde_json::from_str(json).wrap_err("Playlist must be a JSON array of track objects")?;

    let mut seen_ids = HashSet::new();
    let mut entries = Vec::with_capacity(raw.len());

    for (index, raw) in raw.into_iter().enumerate() {
        if raw.track_name.trim().is_empty() {
            bail!("Playlist entry {} has an empty trackName", index);
        }
        if raw.artist_name.trim().is_empty() {
            bail!("Playlist entry {} has an empty artistName", index);
        }
        if let Some(duration) = raw.duration
            && duration < 0.0
        {
            bail!("Playlist entry {} has a negative duration", index);
        }

        let id = non_blank(raw.id).unwrap_or_else(|| format!("track-{}", index));
        if !seen_ids.insert(id.clone()) {
            bail!("Playlist entry {} reuses id '{}'", index, id);
        }

        let mut entry = PlaylistEntry::new(id, raw.track_name.trim(), raw.artist_name.trim());
        entry.album_name = non_blank(raw.album_name);
        entry.duration = raw.duration;
        entry.status = raw.status.unwrap_or_default();
        entry.match_data = raw.match_data;
        entry.file_name = non_blank(raw.file_name);
        entries.push(entry);
    }

    Ok(entries)
}

pub fn load_playlist(path: &Path) -> Result<Vec<PlaylistEntry>> {
    let contents = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read playlist file: {}", path.display()))?;
    let entries = parse_playlist(&contents)
        .wrap_err_with(|| format!("Invalid playlist file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded playlist");
    Ok(entries)
}

/// Writes the processed entries, match data included, as pretty JSON.
pub fn save_playlist(path: &Path, entries: &[PlaylistEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries).wrap_err("Failed to serialize playlist")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, json)
        .wrap_err_with(|| format!("Failed to write playlist report: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::candidate;

    #[test]
    fn test_parse_minimal_and_full_entries() {
        let json = r#"[
            {"trackName": "Blinding Lights", "artistName": "The Weeknd"},
            {
                "id": "halo",
                "trackName": " Halo ",
                "artistName": "Beyoncé",
                "albumName": "",
                "duration": 261,
                "fileName": "01 - Halo.lrc",
                "status": "not_found"
            }
        ]"#;

        let entries = parse_playlist(json).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "track-0");
        assert_eq!(entries[0].status, EntryStatus::Pending);
        assert_eq!(entries[0].duration, None);
        assert_eq!(entries[0], PlaylistEntry::new("track-0", "Blinding Lights", "The Weeknd"));

        assert_eq!(entries[1].id, "halo");
        assert_eq!(entries[1].track_name, "Halo");
        assert_eq!(entries[1].album_name, None);
        assert_eq!(entries[1].duration, Some(261.0));
        assert_eq!(entries[1].file_name.as_deref(), Some("01 - Halo.lrc"));
        assert_eq!(entries[1].status, EntryStatus::NotFound);
    }

    #[test]
    fn test_rejects_other_shapes() {
        // guessed field names are not accepted
        assert!(parse_playlist(r#"[{"title": "Halo", "artist": "Beyoncé"}]"#).is_err());
        assert!(
            parse_playlist(r#"[{"trackName": "Halo", "artistName": "B", "genre": "pop"}]"#)
                .is_err()
        );
        assert!(parse_playlist(r#"{"tracks": []}"#).is_err());
        assert!(parse_playlist(r#"[{"trackName": "Halo"}]"#).is_err());
        assert!(parse_playlist(r#"[{"trackName": "  ", "artistName": "B"}]"#).is_err());
        assert!(
            parse_playlist(r#"[{"trackName": "A", "artistName": "B", "duration": -3}]"#).is_err()
        );
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let json = r#"[
            {"id": "x", "trackName": "A", "artistName": "B"},
            {"id": "x", "trackName": "C", "artistName": "D"}
        ]"#;
        let err = parse_playlist(json).unwrap_err();
        assert!(err.to_string().contains("reuses id 'x'"));
    }

    #[test]
    fn test_saved_report_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("result.json");

        let mut found = PlaylistEntry::new("a", "Halo", "Beyoncé");
        found.status = EntryStatus::Found;
        found.match_data = Some(MatchResult {
            track: candidate(7, "Halo", "Beyoncé", 261.0),
            confidence_score: 0.97,
            confidence_reasons: vec!["Title is a near-exact match.".to_string()],
        });
        let entries = vec![found, PlaylistEntry::new("b", "Missing", "Nobody")];

        save_playlist(&path, &entries).unwrap();
        let loaded = load_playlist(&path).unwrap();

        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = load_playlist(Path::new("/nonexistent/playlist.json")).unwrap_err();
        assert!(format!("{:?}", err).contains("Failed to read playlist file"));
    }
}

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::Context;
use tracing::instrument;

use crate::filename::FilenameFormat;
use crate::models::{EntryStatus, PlaylistEntry, TrackCandidate};

/// LRC file body for a track: synced lyrics, else plain lyrics.
///
/// A non-zero `offset_secs` is written as an `[offset:<ms>]` tag, but only in
/// front of synced lyrics since plain text has no timestamps to shift.
pub fn lyrics_content(track: &TrackCandidate, offset_secs: f64) -> Option<String> {
    if track.has_synced_lyrics() {
        let synced = track.synced_lyrics.as_deref().unwrap_or_default();
        let offset_ms = (offset_secs * 1000.0).round() as i64;
        if offset_ms != 0 {
            return Some(format!("[offset:{}]\n{}", offset_ms, synced));
        }
        return Some(synced.to_string());
    }
    track.plain_lyrics.clone().filter(|plain| !plain.is_empty())
}

pub fn write_lrc_file(directory: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .wrap_err_with(|| format!("Failed to create output directory {:?}", directory))?;
    let path = directory.join(file_name);
    std::fs::write(&path, content).wrap_err_with(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}

/// Writes one `.lrc` file per found entry and returns the written paths.
#[instrument(skip(entries), fields(entries = entries.len()))]
pub fn write_lrc_files(
    entries: &[PlaylistEntry],
    directory: &Path,
    format: &FilenameFormat,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for entry in entries.iter().filter(|e| e.status == EntryStatus::Found) {
        let Some(found) = &entry.match_data else {
            continue;
        };
        let Some(content) = lyrics_content(&found.track, 0.0) else {
            tracing::warn!(id = %entry.id, track = %entry.track_name, "Match has no lyrics text, skipping");
            continue;
        };
        let Some(file_name) = entry.output_file_name(format) else {
            continue;
        };

        let path = write_lrc_file(directory, &file_name, &content)?;
        tracing::debug!(id = %entry.id, path = ?path, "Wrote lyrics file");
        written.push(path);
    }

    tracing::info!(count = written.len(), "Wrote lyrics files");
    Ok(written)
}

/// `write_lrc_files` restricted to the entries whose id is in `selection`.
/// An empty selection means every entry.
pub fn write_selected_lrc_files(
    entries: &[PlaylistEntry],
    selection: &HashSet<String>,
    directory: &Path,
    format: &FilenameFormat,
) -> Result<Vec<PathBuf>> {
    if selection.is_empty() {
        return write_lrc_files(entries, directory, format);
    }
    let selected: Vec<PlaylistEntry> = entries
        .iter()
        .filter(|e| selection.contains(&e.id))
        .cloned()
        .collect();
    write_lrc_files(&selected, directory, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchResult;
    use crate::test_utils::candidate;

    fn found_entry(id: &str, track: TrackCandidate) -> PlaylistEntry {
        let mut entry = PlaylistEntry::new(id, track.track_name.clone(), track.artist_name.clone());
        entry.status = EntryStatus::Found;
        entry.match_data = Some(MatchResult {
            track,
            confidence_score: 1.0,
            confidence_reasons: vec![],
        });
        entry
    }

    #[test]
    fn test_lyrics_content_prefers_synced() {
        let track = candidate(1, "Halo", "Beyoncé", 261.0);
        assert_eq!(
            lyrics_content(&track, 0.0).as_deref(),
            Some("[00:01.00] Halo lyrics")
        );

        let mut plain_only = track.clone();
        plain_only.synced_lyrics = None;
        assert_eq!(lyrics_content(&plain_only, 0.0).as_deref(), Some("Halo lyrics"));

        plain_only.plain_lyrics = Some(String::new());
        assert_eq!(lyrics_content(&plain_only, 0.0), None);
    }

    #[test]
    fn test_offset_applies_to_synced_lyrics_only() {
        let track = candidate(1, "Halo", "Beyoncé", 261.0);
        assert_eq!(
            lyrics_content(&track, -1.5).as_deref(),
            Some("[offset:-1500]\n[00:01.00] Halo lyrics")
        );

        let mut plain_only = track;
        plain_only.synced_lyrics = None;
        assert_eq!(lyrics_content(&plain_only, 2.0).as_deref(), Some("Halo lyrics"));
    }

    #[test]
    fn test_write_lrc_files_only_writes_found_entries_with_text() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("lyrics");

        let mut no_text = candidate(3, "Intro", "Band", 30.0);
        no_text.synced_lyrics = None;
        no_text.plain_lyrics = None;

        let mut custom = found_entry("b", candidate(2, "Halo", "Beyoncé", 261.0));
        custom.file_name = Some("02 - Halo".to_string());

        let entries = vec![
            found_entry("a", candidate(1, "Blinding Lights", "The Weeknd", 200.0)),
            custom,
            found_entry("c", no_text),
            PlaylistEntry::new("d", "Missing", "Nobody"),
        ];

        let written = write_lrc_files(&entries, &out, &FilenameFormat::ArtistTitle).unwrap();

        assert_eq!(
            written,
            vec![
                out.join("The Weeknd - Blinding Lights.lrc"),
                out.join("02 - Halo.lrc"),
            ]
        );
        assert_eq!(
            std::fs::read_to_string(&written[1]).unwrap(),
            "[00:01.00] Halo lyrics"
        );
    }

    #[test]
    fn test_write_selected_lrc_files_skips_unselected_entries() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            found_entry("a", candidate(1, "Blinding Lights", "The Weeknd", 200.0)),
            found_entry("b", candidate(2, "Halo", "Beyoncé", 261.0)),
            found_entry("c", candidate(3, "Levitating", "Dua Lipa", 203.0)),
        ];
        let format = FilenameFormat::Title;

        let selection: HashSet<String> = ["b".to_string()].into();
        let written =
            write_selected_lrc_files(&entries, &selection, dir.path(), &format).unwrap();
        assert_eq!(written, vec![dir.path().join("Halo.lrc")]);
        assert!(!dir.path().join("Blinding Lights.lrc").exists());

        let written =
            write_selected_lrc_files(&entries, &HashSet::new(), dir.path(), &format).unwrap();
        assert_eq!(written.len(), 3);
    }
}

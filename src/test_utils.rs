use crate::models::{PlaylistEntry, TrackCandidate};

pub fn candidate(id: i64, track_name: &str, artist_name: &str, duration: f64) -> TrackCandidate {
    TrackCandidate {
        id,
        track_name: track_name.to_string(),
        artist_name: artist_name.to_string(),
        album_name: String::new(),
        duration,
        instrumental: false,
        plain_lyrics: Some(format!("{} lyrics", track_name)),
        synced_lyrics: Some(format!("[00:01.00] {} lyrics", track_name)),
    }
}

/// `count` pending entries with ids `track-0`, `track-1`, ...
pub fn pending_entries(count: usize) -> Vec<PlaylistEntry> {
    (0..count)
        .map(|i| {
            let mut entry = PlaylistEntry::new(
                format!("track-{}", i),
                format!("Song {}", i),
                format!("Artist {}", i),
            );
            entry.duration = Some(180.0 + i as f64);
            entry
        })
        .collect()
}

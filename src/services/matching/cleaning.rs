use std::sync::LazyLock;

use regex::Regex;

static PARENTHESES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\([^)]*\)").unwrap());
static BRACKETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static REMASTERED_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-\s*Remastered.*$").unwrap());
static EXPLICIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-\s*Explicit$").unwrap());
static RADIO_EDIT_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)-\s*Radio\s*Edit$").unwrap());
static DANGLING_HYPHEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+-\s*$").unwrap());

/// Strip edition qualifiers from a track name for a second lookup attempt.
///
/// Removes `(...)` and `[...]` groups, then trailing `- Remastered...`,
/// `- Explicit` and `- Radio Edit` suffixes (case-insensitive) and finally a
/// dangling hyphen. Each step trims the result.
///
/// `"Yesterday (Remastered 2009)"` becomes `"Yesterday"`.
pub fn clean_track_name(track_name: &str) -> String {
    let steps: [&Regex; 6] = [
        &PARENTHESES,
        &BRACKETS,
        &REMASTERED_SUFFIX,
        &EXPLICIT_SUFFIX,
        &RADIO_EDIT_SUFFIX,
        &DANGLING_HYPHEN,
    ];

    let mut cleaned = track_name.to_string();
    for pattern in steps {
        cleaned = pattern.replace_all(&cleaned, "").trim().to_string();
    }
    cleaned
}

/// The cleaned name, but only when cleaning changed something worth retrying.
pub fn retry_name(track_name: &str) -> Option<String> {
    let cleaned = clean_track_name(track_name);
    (cleaned != track_name && !cleaned.is_empty()).then_some(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_parenthetical_edition() {
        assert_eq!(clean_track_name("Yesterday (Remastered 2009)"), "Yesterday");
        assert_eq!(clean_track_name("Song [Live at Wembley]"), "Song");
        assert_eq!(
            clean_track_name("Song (feat. Someone) [Deluxe]"),
            "Song"
        );
    }

    #[test]
    fn test_strips_trailing_qualifiers() {
        assert_eq!(
            clean_track_name("Here Comes the Sun - Remastered 2019"),
            "Here Comes the Sun"
        );
        assert_eq!(clean_track_name("HUMBLE. - explicit"), "HUMBLE.");
        assert_eq!(clean_track_name("Levitating - Radio Edit"), "Levitating");
        assert_eq!(clean_track_name("Levitating - RadioEdit"), "Levitating");
    }

    #[test]
    fn test_strips_dangling_hyphen_left_by_groups() {
        assert_eq!(clean_track_name("Hurt - (Acoustic)"), "Hurt");
    }

    #[test]
    fn test_leaves_plain_names_alone() {
        assert_eq!(clean_track_name("Blinding Lights"), "Blinding Lights");
        assert_eq!(clean_track_name("Anti-Hero"), "Anti-Hero");
    }

    #[test]
    fn test_retry_name() {
        assert_eq!(
            retry_name("Yesterday (Remastered 2009)"),
            Some("Yesterday".to_string())
        );
        assert_eq!(retry_name("Yesterday"), None);
        assert_eq!(retry_name("(Intro)"), None);
    }
}

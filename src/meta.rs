//! Scene metadata encoded in file names, e.g. `123 - The_Matrix-5.jpg`.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::aggregate::Level;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneMeta {
    pub title: String,
    pub level: Level,
}

fn is_separator(c: char) -> bool {
    c == '_' || c == '-' || c.is_whitespace()
}

/// Reads `title` and `level` from a scene file name.
///
/// The last digit in the stem is the level and must be 1..=9. The title is
/// everything before that digit with separators tidied up and any leading
/// `NNN -` index removed.
pub fn parse_scene_file_name(file_name: &str) -> Option<SceneMeta> {
    let stem = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };

    let Some((pos, digit)) = stem.char_indices().rev().find(|(_, c)| c.is_ascii_digit()) else {
        warn!("no digit found in file name {file_name:?}");
        return None;
    };
    let level = match Level::new(digit.to_digit(10)? as i64) {
        Ok(level) => level,
        Err(_) => {
            warn!("invalid level {digit} in file name {file_name:?}");
            return None;
        }
    };

    // only a trailing level (plus separators) is cut; anything after it stays
    let tail = &stem[pos + 1..];
    let head = if tail.chars().all(is_separator) {
        stem[..pos].trim_end_matches(is_separator)
    } else {
        stem
    };

    let title = strip_index_prefix(head.trim());
    let title = title
        .split(|c: char| is_separator(c))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() {
        warn!("empty title after parsing {file_name:?}");
        return None;
    }
    Some(SceneMeta { title, level })
}

/// Drops a leading `123 - ` / `123_` index.
fn strip_index_prefix(s: &str) -> &str {
    let digits_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digits_end == 0 {
        return s;
    }
    let rest = s[digits_end..].trim_start();
    match rest.strip_prefix(['-', '_']) {
        Some(rest) => rest.trim_start(),
        None => s,
    }
}

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type EntryId = String;

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// A row of the `diary_entries` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: EntryId,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl DiaryEntry {
    /// Label shown under the entry, computed in the local time zone.
    pub fn age_label(&self, now: &DateTime<Local>) -> String {
        relative_label(&self.created_at.with_timezone(&Local), now)
    }
}

/// Insert body. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewEntry {
    pub user_id: String,
    pub content: String,
}

/// Update body. Only the content of an entry is mutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPatch {
    pub content: String,
}

/// Trims `raw`, returning `None` when nothing is left.
pub fn normalize_content(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// "Just now", "5m ago", "3h ago", "2d ago", then "Mar 5" or "Mar 5, 2023".
///
/// Every count is floored. Timestamps ahead of `now` read as "Just now".
pub fn relative_label<Tz>(created_at: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let elapsed_ms = now.timestamp_millis() - created_at.timestamp_millis();
    let minutes = elapsed_ms.div_euclid(MINUTE_MS);
    let hours = elapsed_ms.div_euclid(HOUR_MS);
    let days = elapsed_ms.div_euclid(DAY_MS);

    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    if hours < 24 {
        return format!("{hours}h ago");
    }
    if days < 7 {
        return format!("{days}d ago");
    }

    if created_at.year() == now.year() {
        created_at.format("%b %-d").to_string()
    } else {
        created_at.format("%b %-d, %Y").to_string()
    }
}

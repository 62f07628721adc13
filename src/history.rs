use crate::error::StoreError;
use crate::model::{AnalysisResult, HistoryEntry, InputData};
use crate::store::{KvStore, load_json, save_json};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::{Rng, thread_rng};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub const HISTORY_STORAGE_KEY: &str = "trinetra_history";
pub const MAX_HISTORY_ENTRIES: usize = 10;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MS_PER_MINUTE: i64 = 60_000;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Newest-first log of past analyses, capped at [`MAX_HISTORY_ENTRIES`].
pub struct HistoryStore<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
}

impl<S: KvStore> HistoryStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn append(
        &self,
        input: InputData,
        result: AnalysisResult,
    ) -> Result<HistoryEntry, StoreError> {
        let now = now_millis();
        let entry = HistoryEntry {
            id: generate_entry_id(now),
            timestamp: now,
            input_data: input,
            result,
        };

        let _guard = self.write_lock.lock();
        let mut entries = Vec::with_capacity(MAX_HISTORY_ENTRIES);
        entries.push(entry.clone());
        entries.extend(self.list());
        entries.truncate(MAX_HISTORY_ENTRIES);
        save_json(self.store.as_ref(), HISTORY_STORAGE_KEY, &entries)?;
        info!(id = %entry.id, verdict = %entry.result.verdict, "saved analysis to history");
        Ok(entry)
    }

    /// Stored entries, newest first. Unreadable history reads as empty.
    pub fn list(&self) -> Vec<HistoryEntry> {
        load_json(self.store.as_ref(), HISTORY_STORAGE_KEY).unwrap_or_default()
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        self.store.remove(HISTORY_STORAGE_KEY)?;
        info!("cleared history");
        Ok(())
    }

    pub fn find_by_id(&self, id: &str) -> Option<HistoryEntry> {
        self.list().into_iter().find(|entry| entry.id == id)
    }

    /// Entries whose content or verdict contains `query`, ignoring case. A
    /// blank query returns everything.
    pub fn search(&self, query: &str) -> Vec<HistoryEntry> {
        filter_entries(self.list(), query)
    }
}

pub fn filter_entries(entries: Vec<HistoryEntry>, query: &str) -> Vec<HistoryEntry> {
    if query.trim().is_empty() {
        return entries;
    }
    let needle = query.to_lowercase();
    entries
        .into_iter()
        .filter(|entry| {
            entry.input_data.content().to_lowercase().contains(&needle)
                || entry.result.verdict.as_str().contains(&needle)
        })
        .collect()
}

pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

fn generate_entry_id(now: i64) -> String {
    let mut rng = thread_rng();
    let suffix: String = (0..9)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("entry_{now}_{suffix}")
}

/// Human-friendly age of `timestamp` relative to `now`, both in epoch
/// milliseconds. Anything a week or older is shown as a UTC calendar date.
pub fn format_relative(timestamp: i64, now: i64) -> String {
    let elapsed = now - timestamp;
    if elapsed < MS_PER_HOUR {
        plural(elapsed.div_euclid(MS_PER_MINUTE), "minute")
    } else if elapsed < MS_PER_DAY {
        plural(elapsed.div_euclid(MS_PER_HOUR), "hour")
    } else if elapsed < 7 * MS_PER_DAY {
        plural(elapsed.div_euclid(MS_PER_DAY), "day")
    } else {
        DateTime::<Utc>::from_timestamp_millis(timestamp)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| timestamp.to_string())
    }
}

fn plural(count: i64, unit: &str) -> String {
    let suffix = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{suffix} ago")
}

/// First `max_chars` characters of `content`, with `...` when cut.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

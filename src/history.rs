use crate::errors::HistoryError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub text: String,
    pub intent: String,
    pub result: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl HistoryRecord {
    pub fn new(text: String, intent: String, result: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            intent,
            result,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Append-only request log, optionally mirrored to a JSON file as one
/// ordered array.
///
/// The file is rewritten whole on a blocking thread after every append.
/// `write_lock` serializes those rewrites so the newest snapshot lands last.
pub struct HistoryStore {
    path: Option<Arc<PathBuf>>,
    limit: Option<usize>,
    records: Mutex<Vec<HistoryRecord>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl HistoryStore {
    pub fn in_memory(limit: Option<usize>) -> Self {
        Self {
            path: None,
            limit,
            records: Mutex::new(Vec::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Load existing records from `path`; a missing file starts empty.
    pub fn open(path: PathBuf, limit: Option<usize>) -> Result<Self, HistoryError> {
        let records = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let store = Self {
            path: Some(Arc::new(path)),
            limit,
            records: Mutex::new(records),
            write_lock: tokio::sync::Mutex::new(()),
        };
        store.enforce_limit(&mut store.records.lock());
        Ok(store)
    }

    fn enforce_limit(&self, records: &mut Vec<HistoryRecord>) {
        if let Some(limit) = self.limit {
            if records.len() > limit {
                let excess = records.len() - limit;
                records.drain(..excess);
            }
        }
    }

    pub async fn append(&self, record: HistoryRecord) -> Result<(), HistoryError> {
        let _write = self.write_lock.lock().await;
        let snapshot = {
            let mut records = self.records.lock();
            records.push(record);
            self.enforce_limit(&mut records);
            self.path.as_ref().map(|path| (path.clone(), records.clone()))
        };
        if let Some((path, records)) = snapshot {
            tokio::task::spawn_blocking(move || persist(&path, &records)).await??;
        }
        Ok(())
    }

    /// Newest `limit` records (all when `None`), oldest first.
    pub fn recent(&self, limit: Option<usize>) -> Vec<HistoryRecord> {
        let records = self.records.lock();
        let skip = limit.map_or(0, |n| records.len().saturating_sub(n));
        records[skip..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }
}

fn persist(path: &Path, records: &[HistoryRecord]) -> Result<(), HistoryError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> HistoryRecord {
        HistoryRecord::new(format!("text {n}"), "Summarize".into(), format!("result {n}"))
    }

    #[tokio::test]
    async fn persists_and_reloads_in_order() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("nested").join("history.json");
        let store = HistoryStore::open(path.clone(), None).unwrap();
        for n in 0..3 {
            store.append(record(n)).await.unwrap();
        }
        let reopened = HistoryStore::open(path, None).unwrap();
        let texts: Vec<_> = reopened.recent(None).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["text 0", "text 1", "text 2"]);
        assert_eq!(reopened.recent(None), store.recent(None));
    }

    #[tokio::test]
    async fn limit_keeps_newest_records() {
        let store = HistoryStore::in_memory(Some(2));
        for n in 0..5 {
            store.append(record(n)).await.unwrap();
        }
        assert_eq!(store.len(), 2);
        let texts: Vec<_> = store.recent(None).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["text 3", "text 4"]);
    }

    #[tokio::test]
    async fn recent_returns_tail_oldest_first() {
        let store = HistoryStore::in_memory(None);
        for n in 0..4 {
            store.append(record(n)).await.unwrap();
        }
        let texts: Vec<_> = store.recent(Some(2)).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["text 2", "text 3"]);
        assert_eq!(store.recent(Some(10)).len(), 4);
    }

    #[test]
    fn missing_or_blank_file_starts_empty_but_garbage_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp");
        let missing = dir.path().join("none.json");
        assert_eq!(HistoryStore::open(missing, None).unwrap().len(), 0);

        let blank = dir.path().join("blank.json");
        std::fs::write(&blank, "\n").unwrap();
        assert_eq!(HistoryStore::open(blank, None).unwrap().len(), 0);

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        assert!(matches!(HistoryStore::open(bad, None), Err(HistoryError::Json(_))));
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let v = serde_json::to_value(record(1)).unwrap();
        let ts = v.get("timestamp").and_then(|t| t.as_str()).unwrap();
        assert!(ts.contains('T'));
        assert!(ts.ends_with('Z'));
    }

    #[tokio::test]
    async fn concurrent_appends_leave_file_at_latest_snapshot() {
        let dir = tempfile::tempdir().expect("tmp");
        let path = dir.path().join("history.json");
        let store = Arc::new(HistoryStore::open(path.clone(), Some(5)).unwrap());
        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..16 {
            let store = store.clone();
            tasks.spawn(async move { store.append(record(n)).await });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap().unwrap();
        }
        assert_eq!(store.len(), 5);
        let on_disk = HistoryStore::open(path, None).unwrap();
        assert_eq!(on_disk.recent(None), store.recent(None));
    }
}

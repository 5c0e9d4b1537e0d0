use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

/// 監視対象プロセスごとの保持状態
/// samples は古い順。len() がウィンドウ容量を超えることはない
#[derive(Debug, Clone)]
pub struct MonitorEntry {
    pub name: String,
    pub samples: VecDeque<u64>,
    pub last_notified_at: Option<DateTime<Utc>>,
}

impl MonitorEntry {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            samples: VecDeque::new(),
            last_notified_at: None,
        }
    }
}

/// プロセスIDをキーにしたサンプルストア
/// 可変状態はここに集約し、ポーリングループだけが触る
pub struct SampleStore {
    entries: HashMap<u32, MonitorEntry>,
    capacity: usize,
}

impl SampleStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    /// 読み値を追記して更新後のウィンドウを返す
    /// 初見のIDはエントリを作成。容量超過時は最古のサンプルを捨てる
    pub fn observe(&mut self, id: u32, name: &str, memory_mb: u64) -> &[u64] {
        let entry = self
            .entries
            .entry(id)
            .or_insert_with(|| MonitorEntry::new(name));

        // プロセス名はPM2側で変わりうるので毎回追従する
        if entry.name != name {
            entry.name = name.to_string();
        }

        entry.samples.push_back(memory_mb);
        while entry.samples.len() > self.capacity {
            entry.samples.pop_front();
        }

        entry.samples.make_contiguous()
    }

    pub fn entry(&self, id: u32) -> Option<&MonitorEntry> {
        self.entries.get(&id)
    }

    pub fn entry_mut(&mut self, id: u32) -> Option<&mut MonitorEntry> {
        self.entries.get_mut(&id)
    }

    /// インベントリに存在しなくなったプロセスのエントリを破棄
    /// 戻り値は破棄した件数
    pub fn retain_present(&mut self, present: &[u32]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| present.contains(id));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_creates_entry_on_first_sight() {
        let mut store = SampleStore::new(5);
        assert!(store.is_empty());

        let samples = store.observe(1, "api", 120);
        assert_eq!(samples, &[120]);
        assert_eq!(store.len(), 1);

        let entry = store.entry(1).unwrap();
        assert_eq!(entry.name, "api");
        assert!(entry.last_notified_at.is_none());
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        // FIFO則: 容量を超えたら最古から捨てる
        let mut store = SampleStore::new(5);

        for i in 0..12u64 {
            store.observe(1, "api", 100 + i);
        }

        let entry = store.entry(1).unwrap();
        assert_eq!(entry.samples.len(), 5);
        assert_eq!(
            entry.samples.iter().copied().collect::<Vec<_>>(),
            vec![107, 108, 109, 110, 111]
        );
    }

    #[test]
    fn test_observe_returns_post_update_window() {
        let mut store = SampleStore::new(3);
        store.observe(1, "api", 100);
        store.observe(1, "api", 110);
        let samples = store.observe(1, "api", 120);
        assert_eq!(samples, &[100, 110, 120]);

        // 容量到達後は先頭が落ちる
        let samples = store.observe(1, "api", 130);
        assert_eq!(samples, &[110, 120, 130]);
    }

    #[test]
    fn test_entries_are_keyed_independently() {
        let mut store = SampleStore::new(5);
        store.observe(1, "api", 100);
        store.observe(2, "worker", 300);

        assert_eq!(
            store.entry(1).unwrap().samples.iter().copied().collect::<Vec<_>>(),
            vec![100]
        );
        assert_eq!(
            store.entry(2).unwrap().samples.iter().copied().collect::<Vec<_>>(),
            vec![300]
        );
    }

    #[test]
    fn test_name_follows_inventory() {
        let mut store = SampleStore::new(5);
        store.observe(1, "api", 100);
        store.observe(1, "api-v2", 100);
        assert_eq!(store.entry(1).unwrap().name, "api-v2");
    }

    #[test]
    fn test_retain_present_evicts_absent_entries() {
        let mut store = SampleStore::new(5);
        store.observe(1, "api", 100);
        store.observe(2, "worker", 200);
        store.observe(3, "cron", 50);

        let evicted = store.retain_present(&[1, 3]);
        assert_eq!(evicted, 1);
        assert_eq!(store.len(), 2);
        assert!(store.entry(2).is_none());

        // 空のインベントリなら全て破棄
        let evicted = store.retain_present(&[]);
        assert_eq!(evicted, 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_cooldown_bookkeeping_survives_observation() {
        let mut store = SampleStore::new(5);
        store.observe(1, "api", 100);

        let now = Utc::now();
        store.entry_mut(1).unwrap().last_notified_at = Some(now);

        store.observe(1, "api", 110);
        assert_eq!(store.entry(1).unwrap().last_notified_at, Some(now));
    }
}

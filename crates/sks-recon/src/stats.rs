//! Load statistics: counts of inserted and updated keys per hour and per day.
//!
//! The on-disk format is a JSON object:
//!
//! ```text
//! {"Total": 12, "Hourly": {"2024-05-01T10:00:00Z": {"Inserted": 3, "Updated": 1}}, "Daily": {...}}
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sks_recon_core::{ChangeKind, KeyChange};
use sks_recon_engine::PrefixTree;
use tracing::{debug, warn};

use crate::config::PeerConfig;
use crate::error::{PeerError, Result};

const HOUR_SECS: i64 = 60 * 60;
const DAY_SECS: i64 = 24 * HOUR_SECS;

/// Counts for one time bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStat {
    #[serde(rename = "Inserted", default)]
    pub inserted: u64,
    #[serde(rename = "Updated", default)]
    pub updated: u64,
}

/// Buckets keyed by their start time.
///
/// Serialized with RFC 3339 timestamps as keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStatMap(BTreeMap<DateTime<Utc>, LoadStat>);

impl LoadStatMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one change in the bucket starting at `bucket`.
    pub fn update(&mut self, bucket: DateTime<Utc>, kind: ChangeKind) {
        let stat = self.0.entry(bucket).or_default();
        match kind {
            ChangeKind::Added => stat.inserted += 1,
            ChangeKind::Replaced => stat.updated += 1,
        }
    }

    pub fn get(&self, bucket: &DateTime<Utc>) -> Option<&LoadStat> {
        self.0.get(bucket)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &LoadStat)> {
        self.0.iter()
    }

    /// Drop buckets that start before `cutoff`.
    fn retain_since(&mut self, cutoff: DateTime<Utc>) {
        self.0 = self.0.split_off(&cutoff);
    }
}

impl Serialize for LoadStatMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|(t, stat)| (t.to_rfc3339_opts(SecondsFormat::Secs, true), stat)),
        )
    }
}

impl<'de> Deserialize<'de> for LoadStatMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, LoadStat>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for (key, stat) in raw {
            let t = DateTime::parse_from_rfc3339(&key)
                .map_err(|e| D::Error::custom(format!("bad bucket time {:?}: {}", key, e)))?;
            map.insert(t.with_timezone(&Utc), stat);
        }
        Ok(Self(map))
    }
}

/// Point-in-time copy of the statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Changes counted since the tree was created.
    #[serde(rename = "Total", default)]
    pub total: u64,
    #[serde(rename = "Hourly", default)]
    pub hourly: LoadStatMap,
    #[serde(rename = "Daily", default)]
    pub daily: LoadStatMap,
}

/// Thread-safe load statistics.
#[derive(Debug)]
pub struct Stats {
    inner: Mutex<StatsSnapshot>,
    hourly_retention: Duration,
    daily_retention: Duration,
}

impl Stats {
    /// Empty statistics with the retention windows of `config`.
    pub fn new(config: &PeerConfig) -> Self {
        Self::from_snapshot(StatsSnapshot::default(), config)
    }

    pub fn from_snapshot(snapshot: StatsSnapshot, config: &PeerConfig) -> Self {
        Self {
            inner: Mutex::new(snapshot),
            hourly_retention: config.hourly_retention,
            daily_retention: config.daily_retention,
        }
    }

    /// Load statistics from `path`.
    ///
    /// A missing or unreadable file yields empty statistics. The total is
    /// always taken from the tree, so it stays accurate even when the file
    /// is stale.
    pub fn load<T: PrefixTree + ?Sized>(path: &Path, tree: &T, config: &PeerConfig) -> Self {
        let mut snapshot = read_snapshot(path);
        match tree.root() {
            Ok(root) => snapshot.total = root.size() as u64,
            Err(e) => warn!(error = %e, "cannot read prefix tree size, keeping stored total"),
        }
        Self::from_snapshot(snapshot, config)
    }

    fn lock(&self) -> MutexGuard<'_, StatsSnapshot> {
        // A panic mid-update leaves at worst one miscounted bucket.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Count `change` in the current hour and day.
    pub fn update(&self, change: &KeyChange) {
        self.update_at(Utc::now(), change.kind);
    }

    pub fn update_at(&self, now: DateTime<Utc>, kind: ChangeKind) {
        let mut stats = self.lock();
        stats.hourly.update(truncate(now, HOUR_SECS), kind);
        stats.daily.update(truncate(now, DAY_SECS), kind);
        stats.total += 1;
    }

    /// Drop buckets older than the retention windows.
    pub fn prune(&self) {
        self.prune_at(Utc::now());
    }

    pub fn prune_at(&self, now: DateTime<Utc>) {
        let hourly_cutoff = cutoff(now, self.hourly_retention);
        let daily_cutoff = cutoff(now, self.daily_retention);

        let mut stats = self.lock();
        stats.hourly.retain_since(hourly_cutoff);
        stats.daily.retain_since(daily_cutoff);
        debug!(
            hourly = stats.hourly.len(),
            daily = stats.daily.len(),
            "pruned load stats"
        );
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.lock().clone()
    }

    pub fn total(&self) -> u64 {
        self.lock().total
    }

    /// Write the statistics to `path`.
    ///
    /// The file is written next to `path` and renamed into place, so readers
    /// never see a partial file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(&self.snapshot())?;

        let tmp = tmp_path(path);
        fs::write(&tmp, &json).map_err(|source| PeerError::StatsIo {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| PeerError::StatsIo {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), bytes = json.len(), "saved load stats");
        Ok(())
    }
}

/// Stats file for the tree at `tree_path`: `<dir>/.<base>.stats`.
pub fn stats_path(tree_path: &Path) -> PathBuf {
    let base = tree_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "ptree".to_string());
    let file = format!(".{}.stats", base);
    match tree_path.parent() {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn read_snapshot(path: &Path) -> StatsSnapshot {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no stats file, starting empty");
            return StatsSnapshot::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read stats file, starting empty");
            return StatsSnapshot::default();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "cannot parse stats file, starting empty");
        StatsSnapshot::default()
    })
}

/// Start of the `period`-second bucket containing `t`.
fn truncate(t: DateTime<Utc>, period: i64) -> DateTime<Utc> {
    let secs = t.timestamp();
    DateTime::from_timestamp(secs - secs.rem_euclid(period), 0).unwrap_or(t)
}

fn cutoff(now: DateTime<Utc>, retention: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(retention)
        .ok()
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sks_recon_core::Zp;
    use sks_recon_engine::MemoryPrefixTree;
    use tempfile::tempdir;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 17).unwrap()
    }

    #[test]
    fn test_update_counts_by_kind() {
        let stats = Stats::new(&PeerConfig::default());
        stats.update_at(at(10, 5), ChangeKind::Added);
        stats.update_at(at(10, 40), ChangeKind::Added);
        stats.update_at(at(10, 59), ChangeKind::Replaced);
        stats.update_at(at(11, 1), ChangeKind::Added);

        let snap = stats.snapshot();
        assert_eq!(snap.total, 4);

        let ten = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let eleven = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();
        assert_eq!(
            snap.hourly.get(&ten),
            Some(&LoadStat { inserted: 2, updated: 1 })
        );
        assert_eq!(
            snap.hourly.get(&eleven),
            Some(&LoadStat { inserted: 1, updated: 0 })
        );

        let day = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(snap.daily.len(), 1);
        assert_eq!(
            snap.daily.get(&day),
            Some(&LoadStat { inserted: 3, updated: 1 })
        );
    }

    #[test]
    fn test_update_uses_change_kind() {
        let stats = Stats::new(&PeerConfig::default());
        stats.update(&KeyChange::added("aa"));
        stats.update(&KeyChange::replaced("aa", "bb"));

        let snap = stats.snapshot();
        assert_eq!(snap.total, 2);
        let (inserted, updated) = snap
            .daily
            .iter()
            .fold((0, 0), |(i, u), (_, s)| (i + s.inserted, u + s.updated));
        assert_eq!((inserted, updated), (1, 1));
    }

    #[test]
    fn test_prune_windows() {
        let stats = Stats::new(&PeerConfig::default());
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 30, 0).unwrap();

        stats.update_at(now - chrono::Duration::hours(25), ChangeKind::Added);
        stats.update_at(now - chrono::Duration::hours(23), ChangeKind::Added);
        stats.update_at(now - chrono::Duration::days(8), ChangeKind::Added);
        stats.update_at(now - chrono::Duration::days(6), ChangeKind::Added);

        stats.prune_at(now);
        let snap = stats.snapshot();

        assert_eq!(snap.hourly.len(), 1);
        assert!(snap
            .hourly
            .iter()
            .all(|(t, _)| *t >= now - chrono::Duration::hours(24)));

        // 25h and 23h ago share a day bucket with each other; 6 days ago
        // survives, 8 days ago does not.
        assert!(snap
            .daily
            .iter()
            .all(|(t, _)| *t >= now - chrono::Duration::days(7)));
        assert_eq!(snap.daily.len(), 2);
        assert_eq!(snap.total, 4);
    }

    #[test]
    fn test_json_format() {
        let stats = Stats::new(&PeerConfig::default());
        stats.update_at(at(10, 5), ChangeKind::Added);

        let json: serde_json::Value = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["Total"], 1);
        assert_eq!(json["Hourly"]["2024-05-01T10:00:00Z"]["Inserted"], 1);
        assert_eq!(json["Hourly"]["2024-05-01T10:00:00Z"]["Updated"], 0);
        assert_eq!(json["Daily"]["2024-05-01T00:00:00Z"]["Inserted"], 1);
    }

    #[test]
    fn test_parse_offset_timestamps() {
        let json = r#"{"Total":3,"Hourly":{"2024-05-01T12:00:00+02:00":{"Inserted":2,"Updated":1}},"Daily":{}}"#;
        let snap: StatsSnapshot = serde_json::from_str(json).unwrap();
        let ten = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(
            snap.hourly.get(&ten),
            Some(&LoadStat { inserted: 2, updated: 1 })
        );
    }

    #[test]
    fn test_save_then_load_takes_total_from_tree() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".ptree.stats");
        let config = PeerConfig::default();

        let stats = Stats::new(&config);
        for _ in 0..5 {
            stats.update_at(at(10, 0), ChangeKind::Added);
        }
        stats.save(&path).unwrap();
        assert!(!tmp_path(&path).exists());

        let tree = MemoryPrefixTree::new(dir.path());
        tree.create().unwrap();
        tree.insert(&Zp::from_u64(1)).unwrap();
        tree.insert(&Zp::from_u64(2)).unwrap();

        let loaded = Stats::load(&path, &tree, &config);
        let snap = loaded.snapshot();
        assert_eq!(snap.total, 2);
        assert_eq!(snap.hourly, stats.snapshot().hourly);
    }

    #[test]
    fn test_load_missing_or_corrupt_file() {
        let dir = tempdir().unwrap();
        let tree = MemoryPrefixTree::new(dir.path());
        tree.create().unwrap();
        let config = PeerConfig::default();

        let missing = Stats::load(&dir.path().join("absent"), &tree, &config);
        assert_eq!(missing.snapshot(), StatsSnapshot::default());

        let corrupt = dir.path().join("corrupt");
        fs::write(&corrupt, b"{not json").unwrap();
        let loaded = Stats::load(&corrupt, &tree, &config);
        assert!(loaded.snapshot().hourly.is_empty());
        assert_eq!(loaded.total(), 0);
    }

    #[test]
    fn test_stats_path() {
        assert_eq!(
            stats_path(Path::new("/var/lib/sks/ptree")),
            PathBuf::from("/var/lib/sks/.ptree.stats")
        );
        assert_eq!(
            stats_path(Path::new("/var/lib/sks/ptree/")),
            PathBuf::from("/var/lib/sks/.ptree.stats")
        );
        assert_eq!(stats_path(Path::new("ptree")), PathBuf::from(".ptree.stats"));
    }

    #[test]
    fn test_truncate() {
        let t = at(10, 42);
        assert_eq!(
            truncate(t, HOUR_SECS),
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(
            truncate(t, DAY_SECS),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
    }
}

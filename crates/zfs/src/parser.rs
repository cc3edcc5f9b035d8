//! Decoding of `zfs list -j`, `zpool status -j` and `zfs version -j`

use crate::error::ZfsError;
use autosnap_core::{
    health::parse_count, HealthStatus, PoolState, ScanFunction, ScanInfo, ScanState, Snapshot,
    VersionInfo, VolumeDescriptor,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Layout of scan times printed by `zpool status -j` without `--json-int`
const SCAN_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

#[derive(Debug, Deserialize)]
struct DatasetList {
    #[serde(default)]
    datasets: BTreeMap<String, DatasetEntry>,
}

#[derive(Debug, Deserialize)]
struct DatasetEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    pool: String,
    #[serde(default)]
    dataset: Option<String>,
    #[serde(default)]
    snapshot_name: Option<String>,
    #[serde(default)]
    properties: BTreeMap<String, Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    #[serde(default)]
    value: Value,
}

impl DatasetEntry {
    fn property(&self, key: &str) -> Option<String> {
        self.properties.get(key).and_then(|p| value_string(&p.value))
    }
}

#[derive(Debug, Deserialize)]
struct PoolStatusList {
    #[serde(default)]
    pools: BTreeMap<String, PoolEntry>,
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    error_count: Value,
    #[serde(default)]
    scan: Option<ScanEntry>,
    #[serde(default)]
    scan_stats: Option<ScanEntry>,
    #[serde(default)]
    vdevs: BTreeMap<String, VdevEntry>,
}

#[derive(Debug, Deserialize)]
struct VdevEntry {
    #[serde(default)]
    alloc_space: Option<String>,
    #[serde(default)]
    total_space: Option<String>,
    #[serde(default)]
    read_errors: Value,
    #[serde(default)]
    write_errors: Value,
    #[serde(default)]
    checksum_errors: Value,
}

#[derive(Debug, Deserialize)]
struct ScanEntry {
    #[serde(default)]
    function: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    start_time: Value,
    #[serde(default)]
    end_time: Value,
}

#[derive(Debug, Deserialize)]
struct VersionOutput {
    zfs_version: VersionInfo,
}

fn value_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => parse_count(s),
        _ => 0,
    }
}

/// Epoch seconds or a `ctime`-style string
fn value_time(value: &Value) -> Option<DateTime<Utc>> {
    let ts = match value {
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(secs) => DateTime::from_timestamp(secs, 0),
            Err(_) => {
                let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
                NaiveDateTime::parse_from_str(&normalized, SCAN_TIME_FORMAT)
                    .ok()
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }
        },
        _ => None,
    };
    ts.filter(|ts| ts.timestamp() > 0)
}

fn decode<'a, T: Deserialize<'a>>(what: &'static str, data: &'a [u8]) -> Result<T, ZfsError> {
    serde_json::from_slice(data).map_err(|source| ZfsError::Parse { what, source })
}

/// Pool roots and filesystems from `zfs list -j`
pub fn parse_volumes(data: &[u8]) -> Result<Vec<VolumeDescriptor>, ZfsError> {
    let list: DatasetList = decode("dataset list", data)?;
    Ok(list
        .datasets
        .values()
        .filter(|entry| entry.kind == "FILESYSTEM")
        .map(|entry| VolumeDescriptor {
            pool: entry.pool.clone(),
            filesystem: (entry.name != entry.pool).then(|| entry.name.clone()),
            used: entry.property("used"),
            available: entry.property("available"),
            mountpoint: entry.property("mountpoint"),
        })
        .collect())
}

/// Snapshots from `zfs list -j -t snapshot`, names interpreted with `prefix`
pub fn parse_snapshots(data: &[u8], prefix: &str) -> Result<Vec<Snapshot>, ZfsError> {
    let list: DatasetList = decode("snapshot list", data)?;
    Ok(list
        .datasets
        .values()
        .filter(|entry| entry.kind == "SNAPSHOT")
        .filter_map(|entry| {
            let (dataset, name) = match (&entry.dataset, &entry.snapshot_name) {
                (Some(dataset), Some(name)) => (dataset.clone(), name.clone()),
                _ => {
                    let (dataset, name) = entry.name.split_once('@')?;
                    (dataset.to_string(), name.to_string())
                }
            };
            Some(Snapshot::from_name(&entry.pool, &dataset, &name, prefix))
        })
        .collect())
}

/// Per-pool health from `zpool status -j`
pub fn parse_pool_status(data: &[u8]) -> Result<HashMap<String, HealthStatus>, ZfsError> {
    let list: PoolStatusList = decode("pool status", data)?;
    let mut statuses = HashMap::new();

    for (pool_name, pool) in list.pools {
        let mut status = HealthStatus::online(pool.name.as_deref().unwrap_or(&pool_name));
        status.state = PoolState::parse(&pool.state);
        status.status = pool.status;
        status.action = pool.action;
        status.error_count = value_count(&pool.error_count);

        if let Some(root) = pool.vdevs.get(&pool_name) {
            status.alloc_space = root.alloc_space.clone();
            status.total_space = root.total_space.clone();
            status.read_errors = value_count(&root.read_errors);
            status.write_errors = value_count(&root.write_errors);
            status.checksum_errors = value_count(&root.checksum_errors);
        }

        status.scan = pool.scan.or(pool.scan_stats).map(|scan| ScanInfo {
            function: ScanFunction::parse(&scan.function),
            state: ScanState::parse(&scan.state),
            last_time: value_time(&scan.end_time).or_else(|| value_time(&scan.start_time)),
        });

        statuses.insert(pool_name, status);
    }

    Ok(statuses)
}

/// Userland and kernel versions from `zfs version -j`
pub fn parse_version(data: &[u8]) -> Result<VersionInfo, ZfsError> {
    let output: VersionOutput = decode("version", data)?;
    Ok(output.zfs_version)
}

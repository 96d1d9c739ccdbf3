//! CSV 持久化
//!
//! - `applications.csv`：每条投递记录一行，只追加
//! - `ledger.csv`：去重账本，`job_url,first_seen`
//!
//! 账本文件不存在时，从投递记录中已提交的行重建

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::models::{ApplicationRecord, ApplicationStatus, ApplyMode};
use crate::services::{LedgerEntry, LedgerStore};

/// 投递记录的持久化出口
pub trait RecordSink: Send {
    fn append(&mut self, record: &ApplicationRecord) -> Result<()>;
}

/// `applications.csv` 的一行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationRow {
    pub timestamp: String,
    pub platform: String,
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub job_url: String,
    pub status: String,
    pub failure_reason: String,
    /// 旧版日志写的是 `True` / `False`
    #[serde(deserialize_with = "flexible_bool")]
    pub easy_apply: bool,
}

impl ApplicationRow {
    /// 是否为已提交的行，旧版日志用 `applied` 表示
    pub fn is_submitted(&self) -> bool {
        let status = self.status.trim();
        status.eq_ignore_ascii_case(ApplicationStatus::Submitted.as_str())
            || status.eq_ignore_ascii_case(LEGACY_SUBMITTED)
    }
}

/// 旧版日志中"已提交"的状态名
const LEGACY_SUBMITTED: &str = "applied";

fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid easy_apply value: {}", other))),
    }
}

impl From<&ApplicationRecord> for ApplicationRow {
    fn from(record: &ApplicationRecord) -> Self {
        let posting = &record.posting;
        Self {
            timestamp: record.timestamp.to_rfc3339(),
            platform: posting.platform.name().to_string(),
            job_title: posting.title.clone(),
            company: posting.company.clone(),
            location: posting.location.clone(),
            job_url: posting.url.clone(),
            status: record.status.as_str().to_string(),
            failure_reason: record.detail.clone().unwrap_or_default(),
            easy_apply: posting.apply_mode != ApplyMode::External,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerRow {
    job_url: String,
    first_seen: String,
}

/// 追加一行，文件为空时先写表头
fn append_row<T: Serialize>(path: &Path, row: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("无法创建目录: {}", parent.display()))?;
        }
    }

    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("无法打开文件: {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_header)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;
    Ok(())
}

fn parse_time(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// 写入 `applications.csv`
#[derive(Debug, Clone)]
pub struct CsvRecordSink {
    path: PathBuf,
}

impl CsvRecordSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取全部记录行
    pub fn read_rows(&self) -> Result<Vec<ApplicationRow>> {
        read_application_rows(&self.path)
    }
}

impl RecordSink for CsvRecordSink {
    fn append(&mut self, record: &ApplicationRecord) -> Result<()> {
        append_row(&self.path, &ApplicationRow::from(record))
    }
}

fn read_application_rows(path: &Path) -> Result<Vec<ApplicationRow>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("无法读取: {}", path.display()))?;

    let mut rows = Vec::new();
    for (line, row) in reader.deserialize::<ApplicationRow>().enumerate() {
        match row {
            Ok(row) => rows.push(row),
            Err(e) => warn!("⚠️ {} 第 {} 行无法解析: {}", path.display(), line + 2, e),
        }
    }
    Ok(rows)
}

/// 账本文件 `ledger.csv`
#[derive(Debug, Clone)]
pub struct CsvLedgerStore {
    path: PathBuf,
    /// 账本缺失时用于重建的投递记录文件
    seed: Option<PathBuf>,
}

impl CsvLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, applications_csv: impl Into<PathBuf>) -> Self {
        self.seed = Some(applications_csv.into());
        self
    }

    fn rebuild_from_seed(&self, seed: &Path) -> Result<Vec<LedgerEntry>> {
        let entries: Vec<LedgerEntry> = read_application_rows(seed)?
            .into_iter()
            .filter(|row| row.is_submitted() && !row.job_url.is_empty())
            .map(|row| LedgerEntry {
                first_seen: parse_time(&row.timestamp).unwrap_or_else(Utc::now),
                url: row.job_url,
            })
            .collect();

        for entry in &entries {
            self.append(entry)?;
        }
        if !entries.is_empty() {
            info!("📒 从 {} 重建去重账本: {} 条", seed.display(), entries.len());
        }
        Ok(entries)
    }

    fn append(&self, entry: &LedgerEntry) -> Result<()> {
        append_row(
            &self.path,
            &LedgerRow {
                job_url: entry.url.clone(),
                first_seen: entry.first_seen.to_rfc3339(),
            },
        )
    }
}

impl LedgerStore for CsvLedgerStore {
    fn load(&mut self) -> Result<Vec<LedgerEntry>> {
        if !self.path.exists() {
            return match self.seed.clone() {
                Some(seed) if seed.exists() => self.rebuild_from_seed(&seed),
                _ => Ok(Vec::new()),
            };
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .with_context(|| format!("无法读取账本: {}", self.path.display()))?;

        let mut entries = Vec::new();
        for row in reader.deserialize::<LedgerRow>() {
            match row {
                Ok(row) if !row.job_url.is_empty() => entries.push(LedgerEntry {
                    first_seen: parse_time(&row.first_seen).unwrap_or_else(Utc::now),
                    url: row.job_url,
                }),
                Ok(_) => {}
                Err(e) => warn!("⚠️ 账本行无法解析，已忽略: {}", e),
            }
        }
        debug!("从 {} 读取 {} 条账本记录", self.path.display(), entries.len());
        Ok(entries)
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        CsvLedgerStore::append(self, entry)
    }
}

/// 内存记录出口（测试 / 单次运行）
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordSink {
    records: Arc<Mutex<Vec<ApplicationRecord>>>,
}

impl MemoryRecordSink {
    pub fn records(&self) -> Vec<ApplicationRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl RecordSink for MemoryRecordSink {
    fn append(&mut self, record: &ApplicationRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("记录锁已损坏"))?
            .push(record.clone());
        Ok(())
    }
}

//! 去重账本 - 业务能力层
//!
//! 对外只有两个操作：`contains(url)` 和 `record(url)`。
//! 投递前必须先查询，提交成功后立即写入（不攒批），
//! 这样进程在一轮中途崩溃后重启也不会重复投递。

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// 账本条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub url: String,
    pub first_seen: DateTime<Utc>,
}

/// 账本的持久化后端
pub trait LedgerStore: Send {
    /// 读取全部已有条目
    fn load(&mut self) -> Result<Vec<LedgerEntry>>;
    /// 追加一条，返回前必须已经落盘
    fn append(&mut self, entry: &LedgerEntry) -> Result<()>;
}

/// 去重账本
pub struct Ledger {
    index: HashMap<String, DateTime<Utc>>,
    store: Box<dyn LedgerStore>,
}

impl Ledger {
    /// 打开账本并加载已有条目
    pub fn open(mut store: Box<dyn LedgerStore>) -> Result<Self> {
        let entries = store.load()?;
        let mut index = HashMap::with_capacity(entries.len());
        for entry in entries {
            // 重复行只保留最早的时间
            index
                .entry(entry.url)
                .and_modify(|seen: &mut DateTime<Utc>| {
                    if entry.first_seen < *seen {
                        *seen = entry.first_seen;
                    }
                })
                .or_insert(entry.first_seen);
        }
        debug!("去重账本已加载 {} 条", index.len());
        Ok(Self { index, store })
    }

    /// 仅内存账本（测试 / 单次运行）
    pub fn in_memory() -> Self {
        Self {
            index: HashMap::new(),
            store: Box::new(MemoryLedgerStore::default()),
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    /// 记录一个已投递的 url，已存在时什么也不做
    ///
    /// 返回是否新写入
    pub fn record(&mut self, url: &str) -> Result<bool> {
        if self.contains(url) {
            return Ok(false);
        }
        let entry = LedgerEntry {
            url: url.to_string(),
            first_seen: Utc::now(),
        };
        self.store.append(&entry)?;
        self.index.insert(entry.url, entry.first_seen);
        Ok(true)
    }

    pub fn first_seen(&self, url: &str) -> Option<DateTime<Utc>> {
        self.index.get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// 内存后端
///
/// 内部条目可以通过 `entries()` 读取，便于断言
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    entries: std::sync::Arc<Mutex<Vec<LedgerEntry>>>,
}

impl MemoryLedgerStore {
    pub fn with_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries: std::sync::Arc::new(Mutex::new(entries)),
        }
    }

    /// 共享同一份条目的句柄
    pub fn handle(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&mut self) -> Result<Vec<LedgerEntry>> {
        Ok(self.entries())
    }

    fn append(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("内存账本锁已损坏"))?
            .push(entry.clone());
        Ok(())
    }
}

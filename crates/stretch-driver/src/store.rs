//! 状态快照存储
//!
//! 保存组合状态的有界历史（环形缓冲）。两个轮询线程都向这里追加快照，
//! 调用方线程读取副本。
//!
//! # 并发约定
//!
//! - 所有追加与"读取最新"都在同一把锁内完成
//! - 锁只覆盖内存拷贝与追加，从不跨越设备 I/O
//! - 已存储的快照是不可变的 `Arc<CompositeStatus>`，对外只给深拷贝
//!
//! id 从 1 开始严格递增，是两个线程之间唯一的全序。

use crate::error::DriverError;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use stretch_status::CompositeStatus;

/// 默认历史容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 25;

/// 一条历史记录
#[derive(Debug, Clone)]
pub struct StatusEntry {
    /// 单调递增 id（0 表示尚无记录时的基线状态）
    pub id: u64,
    pub status: Arc<CompositeStatus>,
}

#[derive(Debug)]
struct StatusHistory {
    entries: VecDeque<StatusEntry>,
    capacity: usize,
    last_id: u64,
    baseline: Arc<CompositeStatus>,
}

impl StatusHistory {
    fn newest(&self) -> &Arc<CompositeStatus> {
        self.entries.back().map(|e| &e.status).unwrap_or(&self.baseline)
    }

    fn push(&mut self, status: Arc<CompositeStatus>) -> StatusEntry {
        self.last_id += 1;
        let entry = StatusEntry {
            id: self.last_id,
            status,
        };
        self.entries.push_back(entry.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        entry
    }
}

/// 状态快照存储
#[derive(Debug)]
pub struct StatusStore {
    inner: Mutex<StatusHistory>,
}

impl StatusStore {
    /// 创建空存储，基线为默认组合状态
    ///
    /// 容量至少为 1。
    pub fn new(capacity: usize) -> Self {
        Self::with_baseline(capacity, CompositeStatus::default())
    }

    /// 以指定基线创建空存储
    pub fn with_baseline(capacity: usize, baseline: CompositeStatus) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(StatusHistory {
                entries: VecDeque::with_capacity(capacity + 1),
                capacity,
                last_id: 0,
                baseline: Arc::new(baseline),
            }),
        }
    }

    /// 追加快照，返回分配的 id
    ///
    /// 超出容量时淘汰最旧的记录。
    pub fn append(&self, snapshot: CompositeStatus) -> u64 {
        self.inner.lock().push(Arc::new(snapshot)).id
    }

    /// 以最新快照为底，应用 `update` 后作为新记录追加
    ///
    /// 读取与追加在同一次加锁内完成，期间不会有其他线程插入记录。
    /// `update` 只应做内存操作。
    pub fn merge_latest_entry(&self, update: impl FnOnce(&mut CompositeStatus)) -> StatusEntry {
        let mut history = self.inner.lock();
        let mut next = CompositeStatus::clone(history.newest());
        update(&mut next);
        history.push(Arc::new(next))
    }

    /// 同 [`merge_latest_entry`](Self::merge_latest_entry)，只返回 id
    pub fn merge_latest(&self, update: impl FnOnce(&mut CompositeStatus)) -> u64 {
        self.merge_latest_entry(update).id
    }

    /// 最新快照的深拷贝
    ///
    /// 尚无记录时返回基线状态。
    pub fn latest(&self) -> CompositeStatus {
        let newest = Arc::clone(self.inner.lock().newest());
        CompositeStatus::clone(&newest)
    }

    /// 最新记录（共享引用）
    ///
    /// 尚无记录时返回 id 为 0 的基线。
    pub fn latest_entry(&self) -> StatusEntry {
        let history = self.inner.lock();
        match history.entries.back() {
            Some(entry) => entry.clone(),
            None => StatusEntry {
                id: 0,
                status: Arc::clone(&history.baseline),
            },
        }
    }

    /// 按 id 查找仍保留的快照
    ///
    /// # 错误
    ///
    /// id 已被淘汰或尚未产生时返回 `DriverError::StatusNotFound`。
    pub fn by_id(&self, id: u64) -> Result<CompositeStatus, DriverError> {
        let found = {
            let history = self.inner.lock();
            let oldest = history.entries.front().map(|e| e.id);
            let newest = history.entries.back().map(|e| e.id);
            match (oldest, newest) {
                (Some(lo), Some(hi)) if (lo..=hi).contains(&id) => {
                    // id 连续，可直接定位
                    let index = (id - lo) as usize;
                    Ok(Arc::clone(&history.entries[index].status))
                },
                _ => Err(DriverError::StatusNotFound { id, oldest, newest }),
            }
        };
        found.map(|status| CompositeStatus::clone(&status))
    }

    /// 当前保留的记录数
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    /// 当前保留的 id（从旧到新）
    pub fn ids(&self) -> Vec<u64> {
        self.inner.lock().entries.iter().map(|e| e.id).collect()
    }

    /// 最新 id
    pub fn newest_id(&self) -> Option<u64> {
        self.inner.lock().entries.back().map(|e| e.id)
    }
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

//! 长期记忆：压缩事实与摘要，跨会话存储、按线程检索
//!
//! 支持 remember / retrieve / decay；近似重复条目合并提升（importance/recency 加权），
//! 低分条目归档而非删除。当前实现为 InMemoryStore（词重叠相关度），
//! 后续可接真实向量库。

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::config::MemorySection;

/// 长期记忆条目：内容、重要度、时间戳；检索键（词集合）在存储侧重建
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemoryItem {
    pub content: String,
    pub importance: f32,
    /// Unix 秒
    pub created_at: i64,
    pub last_access: i64,
    #[serde(default)]
    pub archived: bool,
}

impl MemoryItem {
    pub fn new(content: impl Into<String>, importance: f32) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            content: content.into(),
            importance,
            created_at: now,
            last_access: now,
            archived: false,
        }
    }
}

/// 长期存储 trait：跨会话共享（Arc），同一 thread_id 的变更由实现内部串行化
pub trait LongTermStore: Send + Sync {
    /// 写入一条；与既有条目近似重复时合并提升而非新增
    fn remember(&self, thread_id: &str, item: MemoryItem);

    /// 按相关度/新近度/重要度加权检索 top-k；同一存储状态下结果确定
    fn retrieve(&self, thread_id: &str, query: &str, k: usize) -> Vec<MemoryItem>;

    /// 衰减一轮重要度；低于下限的条目归档（仍保留，检索不再返回）
    fn decay(&self, thread_id: &str);

    /// 导出该线程全部条目（含归档），用于 checkpoint
    fn export(&self, thread_id: &str) -> Vec<MemoryItem>;

    /// 恢复快照时整体导入
    fn import(&self, thread_id: &str, items: Vec<MemoryItem>);
}

/// 将文本切分为小写词集合，用于重叠相关度与重复判定
fn tokenize_lower(s: &str) -> HashSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 1)
        .collect()
}

struct Entry {
    item: MemoryItem,
    tokens: HashSet<String>,
    /// 插入序号，检索同分时的确定性决胜
    seq: u64,
}

/// 内存实现：词重叠相关度 + 可配置加权；每线程独立条目表，线程间互不阻塞
pub struct InMemoryStore {
    threads: RwLock<HashMap<String, Vec<Entry>>>,
    cfg: MemorySection,
    next_seq: std::sync::atomic::AtomicU64,
}

/// 重要度衰减系数与归档下限
const DECAY_FACTOR: f32 = 0.9;
const ARCHIVE_FLOOR: f32 = 0.1;
/// 合并提升幅度与上限
const MERGE_BOOST: f32 = 0.5;
const IMPORTANCE_CAP: f32 = 5.0;

impl InMemoryStore {
    pub fn new(cfg: MemorySection) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            cfg,
            next_seq: std::sync::atomic::AtomicU64::new(0),
        }
    }

    fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        let inter = a.intersection(b).count() as f32;
        let union = a.union(b).count() as f32;
        if union == 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    fn score(&self, query: &HashSet<String>, entry: &Entry, now: i64) -> f32 {
        let overlap = query.intersection(&entry.tokens).count() as f32;
        let relevance = if query.is_empty() {
            0.0
        } else {
            overlap / query.len() as f32
        };
        // 新近度：一小时内 1.0，按小时数倒数衰减
        let age_hours = ((now - entry.item.last_access).max(0) as f32) / 3600.0;
        let recency = 1.0 / (1.0 + age_hours);
        self.cfg.relevance_weight * relevance
            + self.cfg.recency_weight * recency
            + self.cfg.importance_weight * entry.item.importance
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(MemorySection::default())
    }
}

impl LongTermStore for InMemoryStore {
    fn remember(&self, thread_id: &str, item: MemoryItem) {
        let content = item.content.trim();
        if content.is_empty() {
            return;
        }
        let tokens = tokenize_lower(content);
        let mut threads = self.threads.write().unwrap();
        let entries = threads.entry(thread_id.to_string()).or_default();

        // 近似重复：提升既有条目，不新增
        if let Some(existing) = entries
            .iter_mut()
            .find(|e| Self::jaccard(&e.tokens, &tokens) >= self.cfg.merge_threshold)
        {
            existing.item.importance =
                (existing.item.importance + MERGE_BOOST).min(IMPORTANCE_CAP);
            existing.item.last_access = chrono::Utc::now().timestamp();
            existing.item.archived = false;
            return;
        }

        entries.push(Entry {
            item,
            tokens,
            seq: self
                .next_seq
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        });

        // 容量兜底：归档最旧的活跃条目，不删除
        let capacity = self.cfg.long_term_capacity;
        let active = entries.iter().filter(|e| !e.item.archived).count();
        if active > capacity {
            let overflow = active - capacity;
            for e in entries.iter_mut().filter(|e| !e.item.archived).take(overflow) {
                e.item.archived = true;
            }
        }
    }

    fn retrieve(&self, thread_id: &str, query: &str, k: usize) -> Vec<MemoryItem> {
        let query_tokens = tokenize_lower(query);
        let threads = self.threads.read().unwrap();
        let Some(entries) = threads.get(thread_id) else {
            return Vec::new();
        };
        let now = chrono::Utc::now().timestamp();
        // 零重叠条目不参与排序，加权只决定先后
        let mut scored: Vec<(f32, u64, &Entry)> = entries
            .iter()
            .filter(|e| !e.item.archived)
            .filter(|e| query_tokens.intersection(&e.tokens).count() > 0)
            .map(|e| (self.score(&query_tokens, e, now), e.seq, e))
            .collect();
        // 分数降序，同分按插入序升序，保证确定性
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.into_iter().take(k).map(|(_, _, e)| e.item.clone()).collect()
    }

    fn decay(&self, thread_id: &str) {
        let mut threads = self.threads.write().unwrap();
        if let Some(entries) = threads.get_mut(thread_id) {
            for e in entries.iter_mut() {
                e.item.importance *= DECAY_FACTOR;
                if e.item.importance < ARCHIVE_FLOOR {
                    e.item.archived = true;
                }
            }
        }
    }

    fn export(&self, thread_id: &str) -> Vec<MemoryItem> {
        let threads = self.threads.read().unwrap();
        threads
            .get(thread_id)
            .map(|entries| entries.iter().map(|e| e.item.clone()).collect())
            .unwrap_or_default()
    }

    fn import(&self, thread_id: &str, items: Vec<MemoryItem>) {
        let mut threads = self.threads.write().unwrap();
        let entries = items
            .into_iter()
            .map(|item| {
                let tokens = tokenize_lower(&item.content);
                Entry {
                    item,
                    tokens,
                    seq: self
                        .next_seq
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed),
                }
            })
            .collect();
        threads.insert(thread_id.to_string(), entries);
    }
}

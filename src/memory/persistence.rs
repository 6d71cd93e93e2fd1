//! 会话持久化
//!
//! 快照 = 短期窗口全部轮次 + 该线程的长期条目，足以原样恢复一次会话。
//! 参考实现为单文件 JSON（每 thread_id 一个文件）；格式对核心不透明，
//! SQL / 对象存储等后端可实现同一 trait。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::CoreError;
use crate::memory::long_term::MemoryItem;
use crate::memory::thread::Turn;

/// 线程快照：save/load 的往返单位
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub thread_id: String,
    pub saved_at: String,
    pub turns: Vec<Turn>,
    pub items: Vec<MemoryItem>,
}

/// 持久化协作方：save(thread_id 隐含于快照) / load(thread_id)
pub trait ThreadStore: Send + Sync {
    fn save(&self, snapshot: &ThreadSnapshot) -> Result<(), CoreError>;

    /// 未知 thread_id 返回 ThreadNotFound，调用方不得启动会话
    fn load(&self, thread_id: &str) -> Result<ThreadSnapshot, CoreError>;
}

/// 文件存储：目录下每线程一个 `<id>.json`
#[derive(Debug)]
pub struct FileThreadStore {
    dir: PathBuf,
}

impl FileThreadStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        // 文件名只保留安全字符，避免路径逃逸
        let safe: String = thread_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl ThreadStore for FileThreadStore {
    fn save(&self, snapshot: &ThreadSnapshot) -> Result<(), CoreError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| CoreError::Persistence(e.to_string()))?;
        let data = serde_json::to_string_pretty(snapshot)
            .map_err(|e| CoreError::Persistence(e.to_string()))?;
        std::fs::write(self.path_for(&snapshot.thread_id), data)
            .map_err(|e| CoreError::Persistence(e.to_string()))?;
        Ok(())
    }

    fn load(&self, thread_id: &str) -> Result<ThreadSnapshot, CoreError> {
        let path = self.path_for(thread_id);
        if !path.exists() {
            return Err(CoreError::ThreadNotFound(thread_id.to_string()));
        }
        let data = std::fs::read_to_string(&path)
            .map_err(|e| CoreError::Persistence(e.to_string()))?;
        serde_json::from_str(&data).map_err(|e| CoreError::Persistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::thread::Turn;

    fn snapshot(id: &str) -> ThreadSnapshot {
        ThreadSnapshot {
            thread_id: id.to_string(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            turns: vec![
                Turn::user("book a flight"),
                Turn::observation("flight_search", "AB123 240 EUR"),
            ],
            items: vec![MemoryItem::new("flight AB123 costs 240 EUR", 1.0)],
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileThreadStore::new(dir.path());
        let snap = snapshot("session-1");
        store.save(&snap).unwrap();

        let loaded = store.load("session-1").unwrap();
        assert_eq!(loaded.thread_id, snap.thread_id);
        assert_eq!(loaded.turns.len(), snap.turns.len());
        assert_eq!(loaded.turns[1].source.as_deref(), Some("flight_search"));
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.items[0].content, snap.items[0].content);
    }

    #[test]
    fn test_load_unknown_thread_fails_typed() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileThreadStore::new(dir.path());
        match store.load("nope") {
            Err(CoreError::ThreadNotFound(id)) => assert_eq!(id, "nope"),
            other => panic!("expected ThreadNotFound, got {:?}", other.map(|_| ())),
        }
    }
}

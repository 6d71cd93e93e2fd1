//! 记忆层：短期窗口、长期存储、压缩与持久化

pub mod compaction;
pub mod long_term;
pub mod manager;
pub mod persistence;
pub mod thread;

pub use compaction::{ExtractiveSummarizer, Summarizer};
pub use long_term::{InMemoryStore, LongTermStore, MemoryItem};
pub use manager::MemoryManager;
pub use persistence::{FileThreadStore, ThreadSnapshot, ThreadStore};
pub use thread::{ConversationThread, Role, Turn};

//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `WAGGLE__*` 覆盖（双下划线表示嵌套，如 `WAGGLE__SESSION__ITERATION_CEILING=10`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub tools: ToolsSection,
    #[serde(default)]
    pub supervisor: SupervisorSection,
    #[serde(default)]
    pub memory: MemorySection,
}

/// [session] 段：短期窗口、循环上限、解析重试、检索条数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// 短期窗口保留的最近消息条数
    pub short_term_window: usize,
    /// 单会话硬性迭代上限（Supervisor 阈值之外的最终兜底）
    pub iteration_ceiling: u64,
    /// 决策解析失败的有界重试次数
    pub max_malformed_retries: u32,
    /// 长期记忆检索 top-k
    pub retrieval_top_k: usize,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            short_term_window: 16,
            iteration_ceiling: 25,
            max_malformed_retries: 2,
            retrieval_top_k: 5,
        }
    }
}

/// [tools] 段：单次调用超时与并发上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub call_timeout_secs: u64,
    /// 同一决策内并发执行的工具调用上限
    pub max_concurrent_calls: usize,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            call_timeout_secs: 10,
            max_concurrent_calls: 3,
        }
    }
}

/// [supervisor] 段：连续失败阈值、软警告阈值、墙钟空闲超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SupervisorSection {
    /// 连续不生产迭代达到该值即停机
    pub failure_threshold: u32,
    /// 达到该值进入 Warning（仅提示，不停机）
    pub warning_threshold: u32,
    /// 距上次生产事件的墙钟空闲上限（秒）
    pub idle_timeout_secs: u64,
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            warning_threshold: 3,
            idle_timeout_secs: 300,
        }
    }
}

impl SupervisorSection {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// [memory] 段：长期存储容量、去重合并阈值与检索打分权重
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    /// 单线程长期条目上限（超出归档最旧低分项）
    pub long_term_capacity: usize,
    /// 近似重复合并的词重叠阈值（0.0-1.0）
    pub merge_threshold: f32,
    pub relevance_weight: f32,
    pub recency_weight: f32,
    pub importance_weight: f32,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            long_term_capacity: 1000,
            merge_threshold: 0.8,
            relevance_weight: 1.0,
            recency_weight: 0.3,
            importance_weight: 0.5,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionSection::default(),
            tools: ToolsSection::default(),
            supervisor: SupervisorSection::default(),
            memory: MemorySection::default(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 WAGGLE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 WAGGLE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("WAGGLE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.session.short_term_window, 16);
        assert_eq!(cfg.session.iteration_ceiling, 25);
        assert_eq!(cfg.session.max_malformed_retries, 2);
        assert_eq!(cfg.session.retrieval_top_k, 5);
        assert_eq!(cfg.tools.call_timeout_secs, 10);
        assert_eq!(cfg.supervisor.failure_threshold, 5);
        assert_eq!(cfg.supervisor.idle_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let cfg = load_config(None).expect("config should build from defaults");
        assert_eq!(cfg.memory.long_term_capacity, 1000);
        assert!(cfg.memory.merge_threshold > 0.0);
    }
}

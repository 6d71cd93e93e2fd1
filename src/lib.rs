//! Waggle - 智能体编排核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排协调器、空闲监管、生命周期钩子、会话记录与错误分类
//! - **memory**: 短期对话窗口 / 长期存储 / 压缩 / 持久化
//! - **reason**: 决策解析、可选评审策略、推理引擎适配
//! - **reasoner**: 不透明推理能力客户端抽象与实现（Mock / Scripted）
//! - **tools**: 工具注册表、参数校验与带超时的分发器
//! - **observability**: tracing 日志初始化

pub mod config;
pub mod core;
pub mod memory;
pub mod observability;
pub mod reason;
pub mod reasoner;
pub mod tools;

//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / purpose / parameters / execute），由 ToolRegistry
//! 按名注册与查找；启动后只读，可跨会话共享。重名注册是配置错误，立即失败。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::error::CoreError;
use crate::tools::schema::ParamSpec;

/// 工具 trait：名称、用途说明（供推理端理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（决策 JSON 中的 "tool" 字段）
    fn name(&self) -> &str;

    /// 用途说明
    fn purpose(&self) -> &str;

    /// 参数 schema；默认无参数
    fn parameters(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// 执行工具；Err 为执行失败的人类可读原因
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// 工具注册表：按名称存储 Arc<dyn Tool>；register / get / names / catalog_json
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；同名已存在返回 DuplicateTool
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), CoreError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(CoreError::DuplicateTool(name));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// 排序后的名称列表（目录与日志输出保持确定）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 生成工具目录 JSON（名称、用途、参数 schema），供推理上下文使用；仅含当前已注册工具
    pub fn catalog_json(&self) -> String {
        let catalog: Vec<Value> = self
            .names()
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                let params: Vec<Value> = tool
                    .parameters()
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "name": p.name,
                            "type": p.kind.label(),
                            "required": p.required,
                            "description": p.description,
                        })
                    })
                    .collect();
                serde_json::json!({
                    "name": tool.name(),
                    "purpose": tool.purpose(),
                    "parameters": params,
                })
            })
            .collect();
        serde_json::to_string_pretty(&catalog).unwrap_or_else(|_| "[]".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::echo::EchoTool;

    #[test]
    fn test_register_then_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        assert!(registry.get("echo").is_some());
        assert_eq!(registry.names(), vec!["echo".to_string()]);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        match registry.register(EchoTool) {
            Err(CoreError::DuplicateTool(name)) => assert_eq!(name, "echo"),
            other => panic!("expected DuplicateTool, got {:?}", other),
        }
    }

    #[test]
    fn test_catalog_lists_registered_tools_only() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool).unwrap();
        let catalog = registry.catalog_json();
        assert!(catalog.contains("\"echo\""));
        assert!(!catalog.contains("flight_search"));
    }
}

//! 工具参数 schema 与决策线格式
//!
//! 参数按名称/类型/必填校验；决策 JSON 结构经 schemars 自动生成，
//! 注入推理上下文以减少输出格式错误。

use std::collections::HashMap;

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 参数类型（对应 JSON 值类型）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl ParamKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::Object => value.is_object(),
            ParamKind::Array => value.is_array(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
            ParamKind::Array => "array",
        }
    }
}

/// 单个参数描述：名称、类型、必填与说明
#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: description.into(),
        }
    }
}

/// 校验参数映射：缺少必填或类型不符返回原因；未知多余键放行
pub fn validate_args(params: &[ParamSpec], args: &Value) -> Result<(), String> {
    let map = match args {
        Value::Object(map) => map,
        Value::Null if params.iter().all(|p| !p.required) => return Ok(()),
        _ => return Err("arguments must be a JSON object".to_string()),
    };
    for spec in params {
        match map.get(&spec.name) {
            Some(value) => {
                if !spec.kind.matches(value) {
                    return Err(format!(
                        "argument '{}' must be a {}",
                        spec.name,
                        spec.kind.label()
                    ));
                }
            }
            None if spec.required => {
                return Err(format!("missing required argument '{}'", spec.name));
            }
            None => {}
        }
    }
    Ok(())
}

/// 决策请求格式：与解析端 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ActionFormat {
    /// 工具名，必须是目录中列出的名称
    pub tool: String,
    /// 工具参数映射，键与工具参数 schema 对应
    pub args: HashMap<String, Value>,
}

/// 决策整体格式：单动作 / 多动作 / 最终回答三选一（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct DecisionFormat {
    /// 可选的思考说明
    pub thought: Option<String>,
    /// 单个工具调用
    pub tool: Option<String>,
    pub args: Option<HashMap<String, Value>>,
    /// 并发的多个工具调用
    pub actions: Option<Vec<ActionFormat>>,
    /// 最终回答文本
    pub answer: Option<String>,
}

/// 返回决策 JSON Schema 字符串，可拼入推理上下文
pub fn decision_schema_json() -> String {
    let schema = schema_for!(DecisionFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("origin", ParamKind::String, "departure city"),
            ParamSpec::optional("max_price", ParamKind::Number, "price cap"),
        ]
    }

    #[test]
    fn test_missing_required_is_rejected() {
        let err = validate_args(&params(), &json!({"max_price": 100})).unwrap_err();
        assert!(err.contains("origin"));
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let err = validate_args(&params(), &json!({"origin": 42})).unwrap_err();
        assert!(err.contains("string"));
    }

    #[test]
    fn test_valid_args_pass_with_extras() {
        validate_args(&params(), &json!({"origin": "Oslo", "note": "extra"})).unwrap();
    }

    #[test]
    fn test_null_args_ok_when_nothing_required() {
        let optional_only = vec![ParamSpec::optional("q", ParamKind::String, "query")];
        validate_args(&optional_only, &Value::Null).unwrap();
    }

    #[test]
    fn test_decision_schema_mentions_fields() {
        let schema = decision_schema_json();
        assert!(schema.contains("actions"));
        assert!(schema.contains("answer"));
    }
}

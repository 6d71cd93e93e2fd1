//! 决策解析
//!
//! 从推理原始输出中提取 JSON（```json 围栏或首尾花括号）并解析为
//! 单动作 / 多动作 / 最终回答；无 JSON 的纯文本按最终回答处理，
//! JSON 损坏或形状不认识则报 MalformedDecision。

use serde::Deserialize;
use serde_json::Value;

use crate::core::error::CoreError;

/// 一次动作请求：工具名 + 参数映射
#[derive(Clone, Debug, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub args: Value,
}

/// 解析成功的决策（Malformed 在引擎层补上）
#[derive(Clone, Debug)]
pub enum ParsedDecision {
    /// 一个或多个并发动作
    Act {
        thought: Option<String>,
        requests: Vec<ToolRequest>,
    },
    /// 最终回答
    Final {
        thought: Option<String>,
        text: String,
    },
}

#[derive(Deserialize)]
struct RawDecision {
    thought: Option<String>,
    tool: Option<String>,
    #[serde(default)]
    args: Value,
    actions: Option<Vec<ToolRequest>>,
    answer: Option<String>,
}

/// 提取候选 JSON 文本：```json 围栏优先，其次首 '{' 到末 '}'
fn extract_json(trimmed: &str) -> Option<&str> {
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return Some(
            rest.find("```")
                .map(|end| rest[..end].trim())
                .unwrap_or(rest.trim()),
        );
    }
    let start = trimmed.find('{')?;
    match trimmed.rfind('}') {
        Some(end) if end > start => Some(&trimmed[start..=end]),
        // 有 '{' 但没有闭合：按 JSON 尝试，让解析器报出格式错误
        _ => Some(trimmed),
    }
}

/// 解析推理输出；Err 即 MalformedDecision
pub fn parse_decision(output: &str) -> Result<ParsedDecision, CoreError> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Err(CoreError::MalformedDecision("empty output".to_string()));
    }

    let Some(json_str) = extract_json(trimmed) else {
        // 纯文本即最终回答
        return Ok(ParsedDecision::Final {
            thought: None,
            text: trimmed.to_string(),
        });
    };

    let raw: RawDecision = serde_json::from_str(json_str)
        .map_err(|e| CoreError::MalformedDecision(format!("{}: {}", e, json_str)))?;

    if let Some(actions) = raw.actions {
        if actions.is_empty() {
            return Err(CoreError::MalformedDecision(
                "\"actions\" must not be empty".to_string(),
            ));
        }
        if let Some(bad) = actions.iter().find(|a| a.tool.trim().is_empty()) {
            return Err(CoreError::MalformedDecision(format!(
                "action with empty tool name: {:?}",
                bad.args
            )));
        }
        return Ok(ParsedDecision::Act {
            thought: raw.thought,
            requests: actions,
        });
    }

    if let Some(tool) = raw.tool {
        if !tool.trim().is_empty() {
            return Ok(ParsedDecision::Act {
                thought: raw.thought,
                requests: vec![ToolRequest {
                    tool,
                    args: raw.args,
                }],
            });
        }
    }

    if let Some(answer) = raw.answer {
        return Ok(ParsedDecision::Final {
            thought: raw.thought,
            text: answer,
        });
    }

    Err(CoreError::MalformedDecision(format!(
        "JSON has neither tool, actions nor answer: {}",
        json_str
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tool_call() {
        let out = r#"{"thought": "need data", "tool": "flight_search", "args": {"to": "Oslo"}}"#;
        match parse_decision(out).unwrap() {
            ParsedDecision::Act { thought, requests } => {
                assert_eq!(thought.as_deref(), Some("need data"));
                assert_eq!(requests.len(), 1);
                assert_eq!(requests[0].tool, "flight_search");
            }
            other => panic!("expected Act, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_actions() {
        let out = r#"{"actions": [{"tool": "a", "args": {}}, {"tool": "b", "args": {}}]}"#;
        match parse_decision(out).unwrap() {
            ParsedDecision::Act { requests, .. } => {
                let names: Vec<_> = requests.iter().map(|r| r.tool.clone()).collect();
                assert_eq!(names, vec!["a", "b"]);
            }
            other => panic!("expected Act, got {other:?}"),
        }
    }

    #[test]
    fn test_answer_object() {
        let out = r#"{"answer": "42 is the answer"}"#;
        match parse_decision(out).unwrap() {
            ParsedDecision::Final { text, .. } => assert_eq!(text, "42 is the answer"),
            other => panic!("expected Final, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_prose_is_final() {
        match parse_decision("The cheapest flight is AB123.").unwrap() {
            ParsedDecision::Final { text, .. } => assert!(text.contains("AB123")),
            other => panic!("expected Final, got {other:?}"),
        }
    }

    #[test]
    fn test_fenced_json_block() {
        let out = "Here you go:\n```json\n{\"tool\": \"echo\", \"args\": {\"text\": \"hi\"}}\n```";
        assert!(matches!(
            parse_decision(out).unwrap(),
            ParsedDecision::Act { .. }
        ));
    }

    #[test]
    fn test_broken_json_is_malformed() {
        let out = r#"{"tool": "echo", "args": {"#;
        assert!(matches!(
            parse_decision(out),
            Err(CoreError::MalformedDecision(_))
        ));
    }

    #[test]
    fn test_empty_actions_is_malformed() {
        assert!(matches!(
            parse_decision(r#"{"actions": []}"#),
            Err(CoreError::MalformedDecision(_))
        ));
    }

    #[test]
    fn test_unrecognized_shape_is_malformed() {
        assert!(matches!(
            parse_decision(r#"{"verb": "fly"}"#),
            Err(CoreError::MalformedDecision(_))
        ));
    }
}

//! 工具参数读取：必填键须存在且为字符串，可选键出现时做类型检查，多余键忽略

use std::collections::HashMap;

use serde_json::Value;

use crate::core::ToolError;

pub fn required_str<'a>(args: &'a HashMap<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::MissingParameter(key.to_string())),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ToolError::InvalidParameter(key.to_string())),
    }
}

pub fn optional_str<'a>(
    args: &'a HashMap<String, Value>,
    key: &str,
) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolError::InvalidParameter(key.to_string())),
    }
}

/// 参数 schema 中的字符串属性
pub(crate) fn string_property(description: &str) -> Value {
    serde_json::json!({ "type": "string", "description": description })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> HashMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_required_str() {
        let a = args(json!({"text": "hello", "count": 3, "none": null}));
        assert_eq!(required_str(&a, "text"), Ok("hello"));
        assert_eq!(
            required_str(&a, "missing"),
            Err(ToolError::MissingParameter("missing".into()))
        );
        assert_eq!(required_str(&a, "none"), Err(ToolError::MissingParameter("none".into())));
        assert_eq!(required_str(&a, "count"), Err(ToolError::InvalidParameter("count".into())));
    }

    #[test]
    fn test_optional_str() {
        let a = args(json!({"reason": "typo", "flag": true}));
        assert_eq!(optional_str(&a, "reason"), Ok(Some("typo")));
        assert_eq!(optional_str(&a, "other"), Ok(None));
        assert!(optional_str(&a, "flag").is_err());
    }
}

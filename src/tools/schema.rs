//! 规划输出 JSON Schema（schemars 自动生成）
//!
//! 拼入规划提示词，约束模型输出 Plan 的结构，减少解析失败。

use schemars::schema_for;

use crate::copilot::Plan;

/// 返回 Plan 的 JSON Schema 字符串
pub fn plan_schema_json() -> String {
    let schema = schema_for!(Plan);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_schema_uses_wire_keys() {
        let schema = plan_schema_json();
        for key in ["strategy", "reasoning", "tools", "response_msg", "respond_only", "use_tools"] {
            assert!(schema.contains(key), "missing {key}");
        }
    }
}

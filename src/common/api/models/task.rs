use serde::{Deserialize, Serialize};

/// `POST /download` 的响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SubmitResponse {
    pub fn task_id(&self) -> Option<&str> {
        non_empty(&self.task_id)
    }

    pub fn error(&self) -> Option<&str> {
        non_empty(&self.error)
    }

    pub fn message(&self) -> Option<&str> {
        non_empty(&self.message)
    }
}

/// `GET /progress` 的响应，所有字段都可能缺失。
/// 类型不符的字段不会让整个响应解析失败，按真值规则折算
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ProgressResponse {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub starting: Option<bool>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub current: Option<u64>,
    #[serde(default, deserialize_with = "lenient::count")]
    pub total: Option<u64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub finished: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub zip_ready: Option<bool>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub error: Option<String>,
}

impl ProgressResponse {
    pub fn error(&self) -> Option<&str> {
        non_empty(&self.error)
    }

    pub fn is_starting(&self) -> bool {
        self.starting.unwrap_or(false)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.unwrap_or(false)
    }

    pub fn is_zip_ready(&self) -> bool {
        self.zip_ready.unwrap_or(false)
    }

    /// 只有 `current` 和 `total` 同时存在才算有效计数
    pub fn counters(&self) -> Option<(u64, u64)> {
        self.current.zip(self.total)
    }
}

// null 和空字符串都按缺失处理
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    // null 视为缺失；0、空字符串、false 为假，其余为真
    fn truthy(value: &Value) -> Option<bool> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(n.as_f64().is_some_and(|f| f != 0.0)),
            Value::String(s) => Some(!s.is_empty()),
            Value::Array(_) | Value::Object(_) => Some(true),
        }
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(truthy(&Value::deserialize(deserializer)?))
    }

    /// 非负整数，或者能解析成非负整数的字符串
    pub fn count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    /// 字符串原样保留，其他为真的值转成文本
    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            other if truthy(&other) == Some(true) => Some(other.to_string()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_initial_state() {
        let body = r#"{"starting":true,"current":0,"total":0,"finished":false,"error":null,"zip_ready":false}"#;
        let resp: ProgressResponse = serde_json::from_str(body).unwrap();
        assert!(resp.is_starting());
        assert!(!resp.is_finished());
        assert_eq!(resp.error(), None);
        assert_eq!(resp.counters(), Some((0, 0)));
    }

    #[test]
    fn test_progress_partial_counters() {
        let resp: ProgressResponse = serde_json::from_str(r#"{"current":3}"#).unwrap();
        assert_eq!(resp.counters(), None);
        assert!(!resp.is_zip_ready());
    }

    #[test]
    fn test_progress_off_type_fields_do_not_fail() {
        let resp: ProgressResponse =
            serde_json::from_str(r#"{"starting":true,"current":"0","total":[],"finished":0}"#)
                .unwrap();
        assert!(resp.is_starting());
        assert!(!resp.is_finished());
        assert_eq!(resp.current, Some(0));
        assert_eq!(resp.counters(), None);

        let resp: ProgressResponse =
            serde_json::from_str(r#"{"finished":"yes","zip_ready":1,"error":false}"#).unwrap();
        assert!(resp.is_finished());
        assert!(resp.is_zip_ready());
        assert_eq!(resp.error(), None);

        let resp: ProgressResponse = serde_json::from_str(r#"{"error":500}"#).unwrap();
        assert_eq!(resp.error(), Some("500"));
    }

    #[test]
    fn test_submit_empty_strings_are_absent() {
        let resp: SubmitResponse =
            serde_json::from_str(r#"{"task_id":"","error":"","message":"oops"}"#).unwrap();
        assert_eq!(resp.task_id(), None);
        assert_eq!(resp.error(), None);
        assert_eq!(resp.message(), Some("oops"));
    }
}

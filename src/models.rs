use serde::{Deserialize, Serialize};

/// POST /config 的响应体。status 为 "ok" 表示保存成功，
/// 其余字段通过 flatten 原样保留，非 ok 响应可整体回显给操作者。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveResponse {
    pub status: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SaveResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

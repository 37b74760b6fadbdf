use serde_json::Value;

use crate::error::{Result, SyncError};
use crate::models::SaveResponse;

/// 配置端点传输层。TUI 只依赖该 trait，测试用内存 Mock 替换。
pub trait ConfigTransport {
    /// 带 token 拉取配置文档
    fn load(&self, token: &str) -> Result<Value>;

    /// 带 token 提交配置文档
    fn save(&self, token: &str, document: &Value) -> Result<SaveResponse>;
}

/// 基于 reqwest 的生产实现，访问 {base_url}/config。
/// 不重试、不退避：失败直接归类上报。
pub struct HttpConfigClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl HttpConfigClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/config", self.base_url.trim_end_matches('/'))
    }

    /// 空 token 不发请求
    fn check_token(token: &str) -> Result<&str> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(SyncError::EmptyToken);
        }
        Ok(trimmed)
    }

    /// 按状态码归类失败。401/415 有专门变体，其余带响应体原文
    fn classify(status: reqwest::StatusCode, body: String) -> SyncError {
        match status {
            reqwest::StatusCode::UNAUTHORIZED => SyncError::Unauthorized,
            reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE => SyncError::UnsupportedMediaType,
            _ => SyncError::ServerError {
                status: status.as_u16(),
                message: body,
            },
        }
    }
}

impl ConfigTransport for HttpConfigClient {
    fn load(&self, token: &str) -> Result<Value> {
        let token = Self::check_token(token)?;
        let resp = self
            .http
            .get(self.endpoint())
            .header("Authorization", format!("Bearer {}", token))
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            tracing::warn!("拉取配置失败: {} {}", status, body);
            return Err(Self::classify(status, body));
        }
        let text = resp.text()?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, token: &str, document: &Value) -> Result<SaveResponse> {
        let token = Self::check_token(token)?;
        let resp = self
            .http
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", token))
            .json(document)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            tracing::warn!("提交配置失败: {} {}", status, body);
            return Err(Self::classify(status, body));
        }
        let text = resp.text()?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener as StdTcpListener;
    use std::sync::{Arc, RwLock};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Json, Response};
    use axum::routing::{get, post};
    use axum::Router;

    const TEST_TOKEN: &str = "admin";

    type SharedDoc = Arc<RwLock<Value>>;

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t == TEST_TOKEN)
            .unwrap_or(false)
    }

    fn unauthorized_response() -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"error": "unauthorized"})),
        )
            .into_response()
    }

    async fn get_config(State(doc): State<SharedDoc>, headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return unauthorized_response();
        }
        Json(doc.read().unwrap().clone()).into_response()
    }

    async fn post_config(
        State(doc): State<SharedDoc>,
        headers: HeaderMap,
        body: Json<Value>,
    ) -> Response {
        if !authorized(&headers) {
            return unauthorized_response();
        }
        *doc.write().unwrap() = body.0;
        Json(serde_json::json!({"status": "ok"})).into_response()
    }

    /// 模拟 /config 端点，返回 (base_url, 共享文档)
    fn spawn_config_server(initial: Value) -> (String, SharedDoc) {
        let doc: SharedDoc = Arc::new(RwLock::new(initial));
        let router = Router::new()
            .route("/config", get(get_config).post(post_config))
            .with_state(doc.clone());
        (spawn_server(router), doc)
    }

    /// 在独立线程 + 独立 runtime 中起服务器，返回 base_url
    fn spawn_server(router: Router) -> String {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        listener.set_nonblocking(true).unwrap();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).unwrap();
                axum::serve(listener, router).await.unwrap();
            });
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_load_returns_document() {
        let (base, _doc) = spawn_config_server(serde_json::json!({"mqtt_port": 1883}));
        let client = HttpConfigClient::new(base);
        let doc = client.load(TEST_TOKEN).unwrap();
        assert_eq!(doc, serde_json::json!({"mqtt_port": 1883}));
    }

    #[test]
    fn test_load_wrong_token_unauthorized() {
        let (base, _doc) = spawn_config_server(serde_json::json!({}));
        let client = HttpConfigClient::new(base);
        assert!(matches!(
            client.load("wrong"),
            Err(SyncError::Unauthorized)
        ));
    }

    #[test]
    fn test_load_token_is_trimmed() {
        let (base, _doc) = spawn_config_server(serde_json::json!({"a": 1}));
        let client = HttpConfigClient::new(base);
        let doc = client.load("  admin  ").unwrap();
        assert_eq!(doc, serde_json::json!({"a": 1}));
    }

    #[test]
    fn test_empty_token_sends_nothing() {
        // 不可路由的地址：若发出请求会得到连接错误而非 EmptyToken
        let client = HttpConfigClient::new("http://127.0.0.1:1");
        assert!(matches!(client.load(""), Err(SyncError::EmptyToken)));
        assert!(matches!(
            client.save("   ", &serde_json::json!({})),
            Err(SyncError::EmptyToken)
        ));
    }

    #[test]
    fn test_save_updates_server_state() {
        let (base, doc) = spawn_config_server(serde_json::json!({}));
        let client = HttpConfigClient::new(base);
        let new_doc = serde_json::json!({"number_of_sensor": 2});
        let resp = client.save(TEST_TOKEN, &new_doc).unwrap();
        assert!(resp.is_ok());
        assert_eq!(*doc.read().unwrap(), new_doc);
    }

    #[test]
    fn test_save_wrong_token_unauthorized() {
        let (base, doc) = spawn_config_server(serde_json::json!({"keep": true}));
        let client = HttpConfigClient::new(base);
        assert!(matches!(
            client.save("wrong", &serde_json::json!({})),
            Err(SyncError::Unauthorized)
        ));
        // 未授权的提交不得改动服务端状态
        assert_eq!(*doc.read().unwrap(), serde_json::json!({"keep": true}));
    }

    #[test]
    fn test_save_unsupported_media_type() {
        async fn reject() -> Response {
            (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(serde_json::json!({"error": "Content-Type must be application/json"})),
            )
                .into_response()
        }
        let base = spawn_server(Router::new().route("/config", post(reject)));
        let client = HttpConfigClient::new(base);
        assert!(matches!(
            client.save(TEST_TOKEN, &serde_json::json!({})),
            Err(SyncError::UnsupportedMediaType)
        ));
    }

    #[test]
    fn test_save_non_ok_status_is_returned_whole() {
        async fn complain() -> Response {
            Json(serde_json::json!({"status": "error", "detail": "disk full"})).into_response()
        }
        let base = spawn_server(Router::new().route("/config", post(complain)));
        let client = HttpConfigClient::new(base);
        let resp = client.save(TEST_TOKEN, &serde_json::json!({})).unwrap();
        assert!(!resp.is_ok());
        assert_eq!(resp.status, "error");
        assert_eq!(
            resp.extra.get("detail"),
            Some(&serde_json::json!("disk full"))
        );
    }

    #[test]
    fn test_server_error_carries_body_verbatim() {
        async fn boom() -> Response {
            (StatusCode::INTERNAL_SERVER_ERROR, "backend exploded").into_response()
        }
        let base = spawn_server(Router::new().route("/config", get(boom)));
        let client = HttpConfigClient::new(base);
        match client.load(TEST_TOKEN) {
            Err(SyncError::ServerError { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "backend exploded");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_transport_failure_is_request_error() {
        let client = HttpConfigClient::new("http://127.0.0.1:1");
        assert!(matches!(
            client.load(TEST_TOKEN),
            Err(SyncError::Request(_))
        ));
    }

    #[test]
    fn test_load_garbage_body_is_invalid_json() {
        async fn garbage() -> Response {
            "not json at all".into_response()
        }
        let base = spawn_server(Router::new().route("/config", get(garbage)));
        let client = HttpConfigClient::new(base);
        assert!(matches!(
            client.load(TEST_TOKEN),
            Err(SyncError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpConfigClient::new("http://example.invalid:9/");
        assert_eq!(client.endpoint(), "http://example.invalid:9/config");
    }
}

use anyhow::{Context, Result};
use reqwest::{StatusCode, Url, header::ACCEPT};
use serde_json::{Value, json};
use std::time::{Duration, Instant};

use crate::{
    domain::{
        error::ToolError,
        port::PlatformApi,
        request::{ApiRequest, ApiResponse, HttpMethod},
    },
    infra::metrics,
};

const USER_AGENT: &str = concat!("retool-mcp/", env!("CARGO_PKG_VERSION"));
const API_PREFIX: &str = "/api/v2";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Option<Url>,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

/// Talks to the Retool management API over HTTPS with a bearer token.
pub struct HttpPlatformApi {
    http: reqwest::Client,
    root: Option<Url>,
    token: Option<String>,
    timeout: Duration,
}

impl HttpPlatformApi {
    pub fn new(settings: ApiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            root: settings.base_url.map(api_root),
            token: settings.api_token,
            timeout: settings.timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.root.is_some() && self.token.is_some()
    }

    fn credentials(&self) -> Result<(&Url, &str), ToolError> {
        match (&self.root, self.token.as_deref()) {
            (Some(root), Some(token)) => Ok((root, token)),
            (None, _) => Err(ToolError::NotConfigured(
                "RETOOL_BASE_URL is not set; point it at your Retool instance".into(),
            )),
            (_, None) => Err(ToolError::NotConfigured(
                "RETOOL_API_TOKEN is not set; create an API token in Retool settings".into(),
            )),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout(self.timeout.as_millis() as u64)
        } else if err.is_connect() {
            ToolError::Unavailable(format!("connection failed: {err}"))
        } else {
            ToolError::Unavailable(err.to_string())
        }
    }
}

impl PlatformApi for HttpPlatformApi {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ToolError> {
        let (root, token) = self.credentials()?;
        let url = endpoint_url(root, &request)?;
        let method = request.method.as_str();

        let mut builder = self
            .http
            .request(reqwest_method(request.method), url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let path = request.path();
        let started = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                metrics::record_upstream(method, None);
                tracing::warn!(
                    method,
                    %path,
                    latency_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "upstream request failed"
                );
                return Err(self.transport_error(err));
            }
        };
        let status = response.status();
        metrics::record_upstream(method, Some(status.as_u16()));
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        tracing::debug!(
            method,
            %path,
            status = status.as_u16(),
            bytes = bytes.len(),
            latency_ms = started.elapsed().as_millis() as u64,
            "upstream response"
        );
        decode_response(status, &bytes)
    }
}

fn reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Normalizes an instance origin to the API root. Accepts both
/// `https://acme.retool.com` and `https://acme.retool.com/api/v2/`.
pub fn api_root(mut base: Url) -> Url {
    base.set_query(None);
    base.set_fragment(None);
    let path = base.path().trim_end_matches('/').to_string();
    if path.ends_with(API_PREFIX) {
        base.set_path(&path);
    } else {
        base.set_path(&format!("{path}{API_PREFIX}"));
    }
    base
}

/// Joins request segments onto the API root. Each segment is percent-encoded
/// as a single path component, so ids cannot escape into sibling routes.
pub fn endpoint_url(root: &Url, request: &ApiRequest) -> Result<Url, ToolError> {
    if let Some(bad) = request
        .segments
        .iter()
        .find(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(ToolError::invalid(format!(
            "path segment '{bad}' is not allowed"
        )));
    }
    let mut url = root.clone();
    url.path_segments_mut()
        .map_err(|_| ToolError::NotConfigured("RETOOL_BASE_URL cannot be used as a base".into()))?
        .pop_if_empty()
        .extend(&request.segments);
    if !request.query.is_empty() {
        url.query_pairs_mut().extend_pairs(&request.query);
    }
    Ok(url)
}

fn decode_response(status: StatusCode, bytes: &[u8]) -> Result<ApiResponse, ToolError> {
    let body = if bytes.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Some(value),
            Err(err) if status.is_success() => return Err(ToolError::Decode(err.to_string())),
            Err(_) => Some(json!({ "raw": String::from_utf8_lossy(bytes) })),
        }
    };

    if status.is_success() {
        return Ok(ApiResponse {
            status: status.as_u16(),
            body,
        });
    }
    Err(ToolError::Upstream {
        status: status.as_u16(),
        message: upstream_message(status, body.as_ref()),
        body,
    })
}

fn upstream_message(status: StatusCode, body: Option<&Value>) -> String {
    body.and_then(|b| {
        ["message", "error"]
            .iter()
            .find_map(|key| b.get(*key).and_then(Value::as_str))
    })
    .map(str::to_string)
    .or_else(|| status.canonical_reason().map(str::to_string))
    .unwrap_or_else(|| "request failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::net::SocketAddr;

    const TOKEN: &str = "retool_test_token";

    fn root(raw: &str) -> Url {
        api_root(Url::parse(raw).unwrap())
    }

    #[rstest]
    #[case("https://acme.retool.com", "https://acme.retool.com/api/v2")]
    #[case("https://acme.retool.com/", "https://acme.retool.com/api/v2")]
    #[case("https://acme.retool.com/api/v2/", "https://acme.retool.com/api/v2")]
    #[case("https://acme.retool.com/api/v2?x=1#frag", "https://acme.retool.com/api/v2")]
    #[case("http://10.0.0.5:3000/retool", "http://10.0.0.5:3000/retool/api/v2")]
    fn api_root_is_appended_once(#[case] base: &str, #[case] expected: &str) {
        assert_eq!(root(base).as_str(), expected);
    }

    #[test]
    fn endpoint_url_encodes_segments_and_query() {
        let request = ApiRequest::get(["users", "a/b?c#d"])
            .query("email", "ops+1@acme.io")
            .query("limit", 5);
        let url = endpoint_url(&root("https://acme.retool.com"), &request).unwrap();
        assert_eq!(url.path(), "/api/v2/users/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), Some("email=ops%2B1%40acme.io&limit=5"));
    }

    #[rstest]
    #[case(".")]
    #[case("..")]
    #[case("")]
    fn endpoint_url_rejects_dot_segments(#[case] segment: &str) {
        let request = ApiRequest::get(["apps", segment]);
        let err = endpoint_url(&root("https://acme.retool.com"), &request).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGUMENTS");
    }

    proptest! {
        #[test]
        fn segment_count_is_preserved(
            segments in proptest::collection::vec("[^\\x00-\\x1f]{1,16}", 1..5)
        ) {
            prop_assume!(segments.iter().all(|s| s != "." && s != ".."));
            let request = ApiRequest::get(segments.clone());
            let url = endpoint_url(&root("https://acme.retool.com"), &request).unwrap();
            let produced: Vec<&str> = url.path_segments().unwrap().collect();
            prop_assert_eq!(produced.len(), segments.len() + 2);
            prop_assert_eq!(&produced[..2], &["api", "v2"]);
        }
    }

    #[test]
    fn decode_handles_empty_and_error_bodies() {
        let ok = decode_response(StatusCode::NO_CONTENT, b"").unwrap();
        assert_eq!(ok, ApiResponse { status: 204, body: None });

        let err = decode_response(StatusCode::OK, b"<html>").unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_DECODE");

        let err =
            decode_response(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>").unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_SERVER_ERROR");
        assert_eq!(err.details(), Some(&json!({"raw": "<html>bad gateway</html>"})));
        assert_eq!(err.to_string(), "upstream returned 502: Bad Gateway");

        let err = decode_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            br#"{"success":false,"message":"email is taken"}"#,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "upstream returned 422: email is taken");
    }

    #[rstest]
    #[case(json!({"message": "first", "error": "second"}), "first")]
    #[case(json!({"success": false, "error": "group not found"}), "group not found")]
    #[case(json!({"error": {"nested": true}}), "Conflict")]
    #[case(json!({"success": false}), "Conflict")]
    fn upstream_message_prefers_message_then_error(#[case] body: Value, #[case] expected: &str) {
        assert_eq!(upstream_message(StatusCode::CONFLICT, Some(&body)), expected);
    }

    #[test]
    fn upstream_error_key_reaches_the_tool_error() {
        let err = decode_response(StatusCode::NOT_FOUND, br#"{"error":"no such workflow"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "upstream returned 404: no such workflow");
        assert_eq!(err.details(), Some(&json!({"error": "no such workflow"})));
    }

    fn client_for(base: Option<&str>, token: Option<&str>, timeout: Duration) -> HttpPlatformApi {
        HttpPlatformApi::new(ApiSettings {
            base_url: base.map(|b| Url::parse(b).unwrap()),
            api_token: token.map(str::to_string),
            timeout,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn missing_settings_are_not_configured() {
        let api = client_for(None, Some(TOKEN), Duration::from_secs(1));
        assert!(!api.is_configured());
        let err = api.execute(ApiRequest::get(["apps"])).await.unwrap_err();
        assert_eq!(err.code(), "NOT_CONFIGURED");
        assert!(err.to_string().contains("RETOOL_BASE_URL"));

        let api = client_for(Some("https://acme.retool.com"), None, Duration::from_secs(1));
        let err = api.execute(ApiRequest::get(["apps"])).await.unwrap_err();
        assert!(err.to_string().contains("RETOOL_API_TOKEN"));
    }

    async fn mock() -> mock_retool_api::MockHandle {
        mock_retool_api::spawn("127.0.0.1:0".parse().unwrap(), TOKEN)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn lists_and_reads_from_mock_api() {
        let handle = mock().await;
        let base_url = handle.base_url();
        let api = client_for(Some(base_url.as_str()), Some(TOKEN), Duration::from_secs(5));

        let listed = api
            .execute(ApiRequest::get(["users"]).query("limit", 1))
            .await
            .unwrap();
        assert_eq!(listed.status, 200);
        let body = listed.body.unwrap();
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["has_more"], true);

        let missing = api
            .execute(ApiRequest::get(["users", "a/b"]))
            .await
            .unwrap_err();
        assert_eq!(missing.status(), Some(404));
        assert!(missing.to_string().contains("a/b"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn wrong_token_is_a_client_error() {
        let handle = mock().await;
        let base_url = handle.base_url();
        let api = client_for(Some(base_url.as_str()), Some("wrong"), Duration::from_secs(5));
        let err = api.execute(ApiRequest::get(["apps"])).await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_CLIENT_ERROR");
        assert_eq!(err.status(), Some(401));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn delete_returns_empty_body() {
        let handle = mock().await;
        let base_url = handle.base_url();
        let api = client_for(Some(base_url.as_str()), Some(TOKEN), Duration::from_secs(5));
        let request =
            ApiRequest::post(["folders"]).body(json!({"name": "Scratch", "folder_type": "app"}));
        let created = api.execute(request).await.unwrap();
        assert_eq!(created.status, 201);
        let id = created.body.unwrap()["data"]["id"]
            .as_str()
            .unwrap()
            .to_string();

        let deleted = api
            .execute(ApiRequest::delete(["folders", id.as_str()]))
            .await
            .unwrap();
        assert_eq!(deleted, ApiResponse { status: 204, body: None });
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let api = client_for(
            Some(format!("http://{addr}").as_str()),
            Some(TOKEN),
            Duration::from_millis(200),
        );
        let err = api.execute(ApiRequest::get(["apps"])).await.unwrap_err();
        assert_eq!(err, ToolError::Timeout(200));
        drop(listener);
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let addr: SocketAddr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let base_url = format!("http://{addr}");
        let api = client_for(Some(base_url.as_str()), Some(TOKEN), Duration::from_secs(2));
        let err = api.execute(ApiRequest::get(["apps"])).await.unwrap_err();
        assert_eq!(err.code(), "UPSTREAM_UNAVAILABLE");
    }
}

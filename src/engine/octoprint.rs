use crate::engine::ControlTransport;
use crate::error::ControlError;
use crate::model::{Command, CommandRequest, CommandResponse, ControlConfig, PluginSettings};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};

const JSON_UTF8: &str = "application/json; charset=UTF-8";
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// HTTP client for the plugin's SimpleApi endpoint on an OctoPrint host.
#[derive(Clone)]
pub struct PluginClient {
    http: reqwest::Client,
    command_url: String,
    settings_url: String,
    plugin_id: String,
}

impl PluginClient {
    pub fn new(cfg: &ControlConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = cfg.api_key.as_deref() {
            let mut v = HeaderValue::from_str(key)
                .map_err(|_| anyhow::anyhow!("API key contains characters not allowed in a header"))?;
            v.set_sensitive(true);
            headers.insert(API_KEY_HEADER, v);
        }

        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .timeout(cfg.request_timeout)
            .build()?;

        Ok(Self {
            http,
            command_url: cfg.command_url(),
            settings_url: cfg.settings_url(),
            plugin_id: cfg.plugin_id.clone(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, ControlError> {
        let resp = self.http.get(url).send().await?;
        read_json(resp).await
    }
}

/// Reject non-2xx answers, then parse whatever JSON the body holds.
async fn read_json(resp: reqwest::Response) -> Result<serde_json::Value, ControlError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ControlError::Status(status));
    }
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ControlError::Decode(e.to_string()))
}

#[async_trait]
impl ControlTransport for PluginClient {
    async fn send(&self, command: Command) -> Result<CommandResponse, ControlError> {
        let body = serde_json::to_vec(&CommandRequest { command })
            .map_err(|e| ControlError::Request(e.to_string()))?;

        tracing::debug!(url = %self.command_url, %command, "sending plugin command");
        let resp = self
            .http
            .post(&self.command_url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .body(body)
            .send()
            .await?;

        let doc = read_json(resp).await?;
        Ok(CommandResponse::from_value(&doc))
    }

    async fn fetch_settings(&self) -> Result<PluginSettings, ControlError> {
        let doc = self.get_json(&self.settings_url).await?;
        match PluginSettings::from_host_settings(&doc, &self.plugin_id)
            .map_err(|e| ControlError::Decode(format!("plugin settings: {e}")))?
        {
            Some(s) => Ok(s),
            None => {
                // Plugin section absent: the host has never saved non-default settings.
                tracing::debug!(plugin = %self.plugin_id, "no plugin settings on host; using defaults");
                Ok(PluginSettings::default())
            }
        }
    }

    fn endpoint(&self) -> String {
        self.command_url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{config, serve_once};
    use std::time::Duration;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn posts_command_as_json() {
        let (base, req) = serve_once("HTTP/1.1 200 OK", r#"{"success":true}"#, Duration::ZERO).await;
        let client = PluginClient::new(&config(base)).unwrap();

        let resp = client.send(Command::Start).await.unwrap();
        assert!(resp.success);

        let raw = req.await.unwrap();
        let lower = raw.to_ascii_lowercase();
        assert!(raw.starts_with("POST /api/plugin/mtcadapter HTTP/1.1"));
        assert!(lower.contains("content-type: application/json; charset=utf-8"));
        assert!(lower.contains("x-api-key: secret"));
        assert!(raw.ends_with(r#"{"command":"start"}"#));
    }

    #[tokio::test]
    async fn odd_shaped_body_reads_as_failure() {
        let (base, _req) = serve_once("HTTP/1.1 200 OK", r#"{"result":"ok"}"#, Duration::ZERO).await;
        let client = PluginClient::new(&config(base)).unwrap();
        let resp = client.send(Command::Stop).await.unwrap();
        assert!(!resp.success);
    }

    #[tokio::test]
    async fn non_2xx_is_a_transport_error() {
        let (base, _req) = serve_once(
            "HTTP/1.1 403 FORBIDDEN",
            r#"{"error":"forbidden"}"#,
            Duration::ZERO,
        )
        .await;
        let client = PluginClient::new(&config(base)).unwrap();
        let err = client.send(Command::Start).await.unwrap_err();
        assert!(matches!(err, ControlError::Status(s) if s.as_u16() == 403));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let (base, _req) = serve_once("HTTP/1.1 200 OK", "<html></html>", Duration::ZERO).await;
        let client = PluginClient::new(&config(base)).unwrap();
        let err = client.send(Command::Start).await.unwrap_err();
        assert!(matches!(err, ControlError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let (base, _req) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"success":true}"#,
            Duration::from_secs(2),
        )
        .await;
        let client = PluginClient::new(&config(base)).unwrap();
        let err = client.send(Command::Start).await.unwrap_err();
        assert!(matches!(err, ControlError::Timeout));
    }

    #[tokio::test]
    async fn reads_plugin_settings_from_host() {
        let (base, req) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"plugins":{"mtcadapter":{"ip":"0.0.0.0","port":7272,"comm_delay":0.5,"update_delay":2}}}"#,
            Duration::ZERO,
        )
        .await;
        let client = PluginClient::new(&config(base)).unwrap();
        let s = client.fetch_settings().await.unwrap();
        assert_eq!(s.ip, "0.0.0.0");
        assert_eq!(s.port, 7272);
        assert_eq!(s.comm_delay, 0.5);
        assert_eq!(s.update_delay, 2.0);
        assert!(req.await.unwrap().starts_with("GET /api/settings HTTP/1.1"));
    }

    #[tokio::test]
    async fn plugin_settings_saved_as_strings_still_load() {
        let (base, _req) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"plugins":{"mtcadapter":{"ip":"10.0.0.5","port":"7878","comm_delay":"0.5","update_delay":1}}}"#,
            Duration::ZERO,
        )
        .await;
        let client = PluginClient::new(&config(base)).unwrap();
        let s = client.fetch_settings().await.unwrap();
        assert_eq!(s.ip, "10.0.0.5");
        assert_eq!(s.port, 7878);
        assert_eq!(s.comm_delay, 0.5);
        assert_eq!(s.update_delay, 1.0);
    }

    #[tokio::test]
    async fn missing_plugin_section_means_defaults() {
        let (base, _req) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"plugins":{"other":{"port":1}}}"#,
            Duration::ZERO,
        )
        .await;
        let client = PluginClient::new(&config(base)).unwrap();
        assert_eq!(client.fetch_settings().await.unwrap(), PluginSettings::default());
    }

    #[tokio::test]
    async fn unreadable_plugin_section_is_a_decode_error() {
        let (base, _req) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"plugins":{"mtcadapter":{"ip":"10.0.0.5","port":"not-a-port"}}}"#,
            Duration::ZERO,
        )
        .await;
        let client = PluginClient::new(&config(base)).unwrap();
        let err = client.fetch_settings().await.unwrap_err();
        assert!(matches!(err, ControlError::Decode(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_request_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = PluginClient::new(&config(format!("http://{addr}/api"))).unwrap();
        let err = client.send(Command::Start).await.unwrap_err();
        assert!(matches!(err, ControlError::Request(_)));
    }
}

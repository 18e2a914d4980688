//! Throwaway HTTP endpoint for client tests.

use crate::model::{ControlConfig, NoticeTiming, DEFAULT_PLUGIN_ID};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve a single canned HTTP response and hand back the raw request.
pub(crate) async fn serve_once(
    status_line: &'static str,
    body: &'static str,
    delay: Duration,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = sock.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if request_complete(&buf) {
                break;
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());

        tokio::time::sleep(delay).await;
        let resp = format!(
            "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = sock.write_all(resp.as_bytes()).await;
        let _ = sock.shutdown().await;
    });

    (format!("http://{addr}/api"), rx)
}

fn request_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some(head_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..head_end]
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("content-length")
                .then(|| v.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    buf.len() >= head_end + 4 + content_length
}

pub(crate) fn config(base_url: String) -> ControlConfig {
    ControlConfig {
        base_url,
        plugin_id: DEFAULT_PLUGIN_ID.into(),
        api_key: Some("secret".into()),
        request_timeout: Duration::from_millis(300),
        user_agent: "mtcadapter-ctl/test".into(),
        notice_timing: NoticeTiming::default(),
    }
}

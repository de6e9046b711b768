use crate::request::{Body, HttpRequest};
use anyhow::{Context, anyhow};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

// Important: without an explicit timeout a broken endpoint hangs the
// conversation indefinitely, and the operator here is a child who cannot
// diagnose a spinner. Every request must settle.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

fn build_reqwest(req: &HttpRequest) -> anyhow::Result<reqwest::RequestBuilder> {
    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("build http client")?;

    let mut headers = HeaderMap::new();
    for (k, v) in &req.headers {
        let name = HeaderName::from_bytes(k.as_bytes())
            .with_context(|| format!("invalid header name: {k}"))?;
        let value =
            HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
        headers.insert(name, value);
    }

    let builder = match req.method.as_str() {
        "GET" => client.get(&req.url),
        "POST" => client.post(&req.url),
        "PATCH" => client.patch(&req.url),
        "PUT" => client.put(&req.url),
        "DELETE" => client.delete(&req.url),
        other => return Err(anyhow!("unsupported method: {other}")),
    }
    .headers(headers);

    let builder = match &req.body {
        Body::Empty => builder,
        Body::Json(s) => builder.body(s.clone()),
        Body::MultipartFormData { bytes, .. } => builder.body(bytes.clone()),
    };

    Ok(builder)
}

pub async fn execute(req: &HttpRequest) -> anyhow::Result<HttpResponse> {
    let resp = build_reqwest(req)?.send().await.context("http request failed")?;
    let status = resp.status().as_u16();
    let body = resp
        .bytes()
        .await
        .context("failed reading response body")?
        .to_vec();

    Ok(HttpResponse { status, body })
}

/// Plain byte download (audio clips referenced by URL in server responses).
pub async fn fetch_bytes(url: &str) -> anyhow::Result<Vec<u8>> {
    let req = HttpRequest {
        method: "GET".into(),
        url: url.into(),
        headers: vec![],
        body: Body::Empty,
    };
    let resp = execute(&req).await?;
    if !(200..=299).contains(&resp.status) {
        return Err(anyhow!("fetch {url} failed: status {}", resp.status));
    }
    Ok(resp.body)
}

/// Fire-and-forget delivery for requests that must outlive their caller
/// (exit-time progress saves, abandonment notifications).
///
/// The request is fully built before this call, so nothing is read from the
/// caller after dispatch; the send runs detached on the ambient runtime and
/// the outcome is logged only.
pub fn dispatch_best_effort(req: HttpRequest) {
    let handle = match tokio::runtime::Handle::try_current() {
        Ok(h) => h,
        Err(_) => {
            log::warn!("best-effort dispatch dropped (no runtime): {} {}", req.method, req.url);
            return;
        }
    };

    handle.spawn(async move {
        match execute(&req).await {
            Ok(resp) if (200..=299).contains(&resp.status) => {}
            Ok(resp) => {
                log::warn!(
                    "best-effort request rejected: {} {} -> {}",
                    req.method,
                    req.url,
                    resp.status
                );
            }
            Err(e) => {
                log::warn!("best-effort request failed: {} {}: {e}", req.method, req.url);
            }
        }
    });
}

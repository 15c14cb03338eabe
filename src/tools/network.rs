//! Network tools (`spec.md` §4.B "Network" row).
//!
//! Grounded on the teacher's `tools/web.rs` `WebFetchTool`/`WebRequestTool`
//! (`reqwest::Client` with a bounded response size, limited redirects,
//! explicit scheme validation), stripped of the teacher's inline policy
//! check and narrowed to the spec's three network tools.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Url, redirect::Policy};
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

const MAX_RESPONSE_SIZE: usize = 1024 * 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 120;

fn validate_url(url: &str) -> Result<Url, String> {
    let parsed = Url::parse(url).map_err(|e| format!("invalid URL: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(format!("unsupported URL scheme: {scheme}. Only http and https are allowed.")),
    }
}

fn client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .redirect(Policy::limited(5))
        .user_agent("agentcore/1.0")
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

// ─── fetch_url ───────────────────────────────────────────────────────────────

pub struct FetchUrlTool;

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetch the text content of a URL via HTTP GET."
    }

    fn category(&self) -> &str {
        "network"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to fetch (http or https)." },
                "timeout_seconds": { "type": "integer", "minimum": 1, "maximum": 120 }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let url = match args.get("url").and_then(Value::as_str) {
            Some(u) => u,
            None => return Ok(ToolResult::err("missing required argument 'url'")),
        };
        let parsed = match validate_url(url) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::err(e)),
        };
        let timeout_secs = args
            .get("timeout_seconds")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .min(MAX_TIMEOUT_SECS);

        let response = match client(timeout_secs).get(parsed).send().await {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::err(format!("request failed: {e}"))),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return Ok(ToolResult::err(format!("failed to read response body: {e}"))),
        };

        let (text, truncated) = if body.len() > MAX_RESPONSE_SIZE {
            (body[..MAX_RESPONSE_SIZE].to_string(), true)
        } else {
            (body, false)
        };

        let meta = json!({ "status_code": status.as_u16(), "truncated": truncated });
        if status.is_success() {
            Ok(ToolResult::ok(text).with_metadata(meta))
        } else {
            Ok(ToolResult::err(format!("HTTP {status}\n\n{text}")).with_metadata(meta))
        }
    }
}

// ─── web_search ──────────────────────────────────────────────────────────────

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for a query and return a list of result titles and URLs."
    }

    fn category(&self) -> &str {
        "network"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string", "description": "Search query." } },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let query = match args.get("query").and_then(Value::as_str) {
            Some(q) => q,
            None => return Ok(ToolResult::err("missing required argument 'query'")),
        };

        let url = format!("https://html.duckduckgo.com/html/?q={}", urlencode(query));
        let response = match client(DEFAULT_TIMEOUT_SECS).get(&url).send().await {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::err(format!("search request failed: {e}"))),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return Ok(ToolResult::err(format!("failed to read search results: {e}"))),
        };

        if !status.is_success() {
            return Ok(ToolResult::err(format!("search provider returned HTTP {status}")));
        }

        Ok(ToolResult::ok(extract_result_links(&body)))
    }
}

fn urlencode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Pull `href="..."` targets out of the raw search results HTML.
/// A full HTML parser is unnecessary for a flat list of result links.
fn extract_result_links(html: &str) -> String {
    let mut links = Vec::new();
    for part in html.split("href=\"").skip(1) {
        if let Some(end) = part.find('"') {
            let link = &part[..end];
            if link.starts_with("http") && !links.contains(&link.to_string()) {
                links.push(link.to_string());
            }
        }
        if links.len() >= 10 {
            break;
        }
    }
    if links.is_empty() {
        "no results found".to_string()
    } else {
        links.join("\n")
    }
}

// ─── http_request ────────────────────────────────────────────────────────────

pub struct HttpRequestTool;

#[async_trait]
impl Tool for HttpRequestTool {
    fn name(&self) -> &str {
        "http_request"
    }

    fn description(&self) -> &str {
        "Make an HTTP request with full control over method, headers, and body. \
         Supports GET, POST, PUT, PATCH, DELETE, HEAD, OPTIONS."
    }

    fn category(&self) -> &str {
        "network"
    }

    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "URL to request (http or https)." },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"]
                },
                "headers": { "type": "object", "additionalProperties": { "type": "string" } },
                "body": { "type": "string" },
                "timeout_seconds": { "type": "integer", "minimum": 1, "maximum": 120 }
            },
            "required": ["url"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let url = match args.get("url").and_then(Value::as_str) {
            Some(u) => u,
            None => return Ok(ToolResult::err("missing required argument 'url'")),
        };
        if let Err(e) = validate_url(url) {
            return Ok(ToolResult::err(e));
        }

        let method_str = args.get("method").and_then(Value::as_str).unwrap_or("GET").to_uppercase();
        let method = match method_str.as_str() {
            "GET" => reqwest::Method::GET,
            "POST" => reqwest::Method::POST,
            "PUT" => reqwest::Method::PUT,
            "PATCH" => reqwest::Method::PATCH,
            "DELETE" => reqwest::Method::DELETE,
            "HEAD" => reqwest::Method::HEAD,
            "OPTIONS" => reqwest::Method::OPTIONS,
            other => return Ok(ToolResult::err(format!("unsupported HTTP method: {other}"))),
        };

        let timeout_secs = args
            .get("timeout_seconds")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TIMEOUT_SECS)
            .min(MAX_TIMEOUT_SECS);

        let mut builder = client(timeout_secs).request(method, url);
        if let Some(headers) = args.get("headers").and_then(Value::as_object) {
            for (key, value) in headers {
                if let Some(v) = value.as_str() {
                    builder = builder.header(key, v);
                }
            }
        }
        if let Some(body) = args.get("body").and_then(Value::as_str) {
            builder = builder.body(body.to_string());
        }

        let response = match builder.send().await {
            Ok(r) => r,
            Err(e) => return Ok(ToolResult::err(format!("request failed: {e}"))),
        };
        let status = response.status();
        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return Ok(ToolResult::err(format!("failed to read response body: {e}"))),
        };

        let meta = json!({ "status_code": status.as_u16() });
        if status.is_success() {
            Ok(ToolResult::ok(format!("HTTP {status}\n\n{body}")).with_metadata(meta))
        } else {
            Ok(ToolResult::err(format!("HTTP {status}\n\n{body}")).with_metadata(meta))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_rejects_non_http_schemes() {
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("https://example.com").is_ok());
    }

    #[tokio::test]
    async fn fetch_url_missing_arg_is_tool_error() {
        let r = FetchUrlTool.execute(json!({})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn fetch_url_rejects_bad_scheme() {
        let r = FetchUrlTool.execute(json!({"url": "ftp://example.com"})).await.unwrap();
        assert!(!r.success);
    }

    #[tokio::test]
    async fn http_request_rejects_bad_method() {
        let r = HttpRequestTool
            .execute(json!({"url": "https://example.com", "method": "TRACE"}))
            .await
            .unwrap();
        assert!(!r.success);
    }

    #[test]
    fn extract_result_links_finds_http_hrefs() {
        let html = r#"<a href="https://a.example/">A</a><a href="/internal">I</a><a href="https://b.example/">B</a>"#;
        let out = extract_result_links(html);
        assert!(out.contains("https://a.example/"));
        assert!(out.contains("https://b.example/"));
        assert!(!out.contains("/internal"));
    }

    #[test]
    fn risk_levels_match_spec_table() {
        assert_eq!(FetchUrlTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(WebSearchTool.intrinsic_risk(), RiskLevel::Low);
        assert_eq!(HttpRequestTool.intrinsic_risk(), RiskLevel::Medium);
    }
}

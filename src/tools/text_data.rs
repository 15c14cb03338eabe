//! Text and data tools (`spec.md` §4.B "Text/data" row).
//!
//! Grounded on the teacher's `tools/file_ops.rs` read/write patterns for the
//! file-scoped search and replace operations, plus `base64`/`serde_json`
//! already in the dependency table for the pure-data operations.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Value, json};

use crate::policy::RiskLevel;

use super::traits::{Tool, ToolResult};

// ─── search_in_file ──────────────────────────────────────────────────────────

pub struct SearchInFileTool;

#[async_trait]
impl Tool for SearchInFileTool {
    fn name(&self) -> &str {
        "search_in_file"
    }
    fn description(&self) -> &str {
        "Search a file for lines containing a substring and return matching line numbers."
    }
    fn category(&self) -> &str {
        "text_data"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "query": { "type": "string" }
            },
            "required": ["path", "query"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match args.get("path").and_then(Value::as_str) {
            Some(p) => p.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'path'")),
        };
        let query = match args.get("query").and_then(Value::as_str) {
            Some(q) => q.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'query'")),
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return Ok(ToolResult::err(format!("failed to read '{path}': {e}"))),
        };

        let matches: Vec<String> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains(&query))
            .map(|(i, line)| format!("{}: {}", i + 1, line))
            .collect();

        if matches.is_empty() {
            Ok(ToolResult::ok("no matches found"))
        } else {
            let count = matches.len();
            Ok(ToolResult::ok(matches.join("\n")).with_metadata(json!({ "match_count": count })))
        }
    }
}

// ─── replace_in_file ─────────────────────────────────────────────────────────

pub struct ReplaceInFileTool;

#[async_trait]
impl Tool for ReplaceInFileTool {
    fn name(&self) -> &str {
        "replace_in_file"
    }
    fn description(&self) -> &str {
        "Replace all occurrences of a substring in a file with another string."
    }
    fn category(&self) -> &str {
        "text_data"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": { "type": "string" },
                "find": { "type": "string" },
                "replace": { "type": "string" }
            },
            "required": ["path", "find", "replace"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let path = match args.get("path").and_then(Value::as_str) {
            Some(p) => p.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'path'")),
        };
        let find = match args.get("find").and_then(Value::as_str) {
            Some(f) => f.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'find'")),
        };
        let replace = match args.get("replace").and_then(Value::as_str) {
            Some(r) => r.to_string(),
            None => return Ok(ToolResult::err("missing required argument 'replace'")),
        };

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => return Ok(ToolResult::err(format!("failed to read '{path}': {e}"))),
        };

        let occurrences = content.matches(&find).count();
        let updated = content.replace(&find, &replace);

        match tokio::fs::write(&path, &updated).await {
            Ok(()) => Ok(ToolResult::ok(format!("replaced {occurrences} occurrence(s) in '{path}'"))
                .with_metadata(json!({ "occurrences": occurrences }))),
            Err(e) => Ok(ToolResult::err(format!("failed to write '{path}': {e}"))),
        }
    }
}

// ─── calculate ───────────────────────────────────────────────────────────────

pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }
    fn description(&self) -> &str {
        "Evaluate a basic arithmetic expression (+, -, *, /, parentheses)."
    }
    fn category(&self) -> &str {
        "text_data"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "expression": { "type": "string" } },
            "required": ["expression"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let expr = match args.get("expression").and_then(Value::as_str) {
            Some(e) => e,
            None => return Ok(ToolResult::err("missing required argument 'expression'")),
        };
        match eval_arithmetic(expr) {
            Ok(value) => Ok(ToolResult::ok(value.to_string())),
            Err(e) => Ok(ToolResult::err(format!("failed to evaluate expression: {e}"))),
        }
    }
}

fn eval_arithmetic(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut pos = 0;
    let value = parse_expr(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err("unexpected trailing input".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let num_str: String = chars[start..i].iter().collect();
                let num = num_str.parse::<f64>().map_err(|_| format!("invalid number: {num_str}"))?;
                tokens.push(Token::Number(num));
            }
            other => return Err(format!("unexpected character: {other}")),
        }
    }
    Ok(tokens)
}

fn parse_expr(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let mut value = parse_term(tokens, pos)?;
    while let Some(tok) = tokens.get(*pos) {
        match tok {
            Token::Plus => {
                *pos += 1;
                value += parse_term(tokens, pos)?;
            }
            Token::Minus => {
                *pos += 1;
                value -= parse_term(tokens, pos)?;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn parse_term(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    let mut value = parse_factor(tokens, pos)?;
    while let Some(tok) = tokens.get(*pos) {
        match tok {
            Token::Star => {
                *pos += 1;
                value *= parse_factor(tokens, pos)?;
            }
            Token::Slash => {
                *pos += 1;
                let divisor = parse_factor(tokens, pos)?;
                if divisor == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= divisor;
            }
            _ => break,
        }
    }
    Ok(value)
}

fn parse_factor(tokens: &[Token], pos: &mut usize) -> Result<f64, String> {
    match tokens.get(*pos) {
        Some(Token::Number(n)) => {
            *pos += 1;
            Ok(*n)
        }
        Some(Token::Minus) => {
            *pos += 1;
            Ok(-parse_factor(tokens, pos)?)
        }
        Some(Token::LParen) => {
            *pos += 1;
            let value = parse_expr(tokens, pos)?;
            match tokens.get(*pos) {
                Some(Token::RParen) => {
                    *pos += 1;
                    Ok(value)
                }
                _ => Err("expected closing parenthesis".to_string()),
            }
        }
        _ => Err("expected a number or '('".to_string()),
    }
}

// ─── parse_json ──────────────────────────────────────────────────────────────

pub struct ParseJsonTool;

#[async_trait]
impl Tool for ParseJsonTool {
    fn name(&self) -> &str {
        "parse_json"
    }
    fn description(&self) -> &str {
        "Parse a JSON string and optionally extract a value at a dot-separated path."
    }
    fn category(&self) -> &str {
        "text_data"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "json": { "type": "string" },
                "path": { "type": "string", "description": "Optional dot-separated key path, e.g. 'a.b.c'." }
            },
            "required": ["json"]
        })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let raw = match args.get("json").and_then(Value::as_str) {
            Some(j) => j,
            None => return Ok(ToolResult::err("missing required argument 'json'")),
        };
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => return Ok(ToolResult::err(format!("invalid JSON: {e}"))),
        };

        let result = match args.get("path").and_then(Value::as_str) {
            Some(path) => {
                let mut current = &parsed;
                let mut found = true;
                for key in path.split('.') {
                    match current.get(key) {
                        Some(next) => current = next,
                        None => {
                            found = false;
                            break;
                        }
                    }
                }
                if !found {
                    return Ok(ToolResult::err(format!("path '{path}' not found in JSON")));
                }
                current.clone()
            }
            None => parsed,
        };

        match serde_json::to_string_pretty(&result) {
            Ok(s) => Ok(ToolResult::ok(s)),
            Err(e) => Ok(ToolResult::err(format!("failed to serialize result: {e}"))),
        }
    }
}

// ─── encode_base64 / decode_base64 ─────────────────────────────────────────

pub struct EncodeBase64Tool;

#[async_trait]
impl Tool for EncodeBase64Tool {
    fn name(&self) -> &str {
        "encode_base64"
    }
    fn description(&self) -> &str {
        "Encode a UTF-8 string as base64."
    }
    fn category(&self) -> &str {
        "text_data"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "text": { "type": "string" } }, "required": ["text"] })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let text = match args.get("text").and_then(Value::as_str) {
            Some(t) => t,
            None => return Ok(ToolResult::err("missing required argument 'text'")),
        };
        Ok(ToolResult::ok(BASE64.encode(text.as_bytes())))
    }
}

pub struct DecodeBase64Tool;

#[async_trait]
impl Tool for DecodeBase64Tool {
    fn name(&self) -> &str {
        "decode_base64"
    }
    fn description(&self) -> &str {
        "Decode a base64 string into UTF-8 text."
    }
    fn category(&self) -> &str {
        "text_data"
    }
    fn intrinsic_risk(&self) -> RiskLevel {
        RiskLevel::Low
    }
    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": { "data": { "type": "string" } }, "required": ["data"] })
    }
    async fn execute(&self, args: Value) -> Result<ToolResult, String> {
        let data = match args.get("data").and_then(Value::as_str) {
            Some(d) => d,
            None => return Ok(ToolResult::err("missing required argument 'data'")),
        };
        let bytes = match BASE64.decode(data) {
            Ok(b) => b,
            Err(e) => return Ok(ToolResult::err(format!("invalid base64: {e}"))),
        };
        match String::from_utf8(bytes) {
            Ok(s) => Ok(ToolResult::ok(s)),
            Err(e) => Ok(ToolResult::err(format!("decoded bytes are not valid UTF-8: {e}"))),
        }
    }
}

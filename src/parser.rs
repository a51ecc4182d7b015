// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求报文解析器
//!
//! 解析分为两步：
//! 1. [`read_head`]：从套接字读取请求行与标头块（直到第一个空行），
//!    标头行按第一个冒号拆分为原始的名称/值对。
//! 2. [`parse`]：校验请求行、规范化标头、按 `Content-Length` 读取请求体，
//!    最后构造不可变的 [`Request`]。
//!
//! 请求体的读取受方法限制：POST/PUT/PATCH 必须声明 `Content-Length`，
//! 没有声明即视为报文边界不明确，直接拒绝。

use crate::{
    exception::Exception,
    param::{HeaderMap, HeaderName, Verb},
    request::Request,
};
use bytes::Bytes;
use log::{debug, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};

/// 请求头部：原始请求行与按出现顺序排列的原始标头对
pub type RawHead = (String, Vec<(String, String)>);

/// 读取请求行与标头块。
///
/// 客户端在发送任何字节之前关闭连接时返回 `Ok(None)`。
/// 标头块在空行处结束；若在空行之前遇到 EOF，则视为标头块已结束。
pub async fn read_head<R>(reader: &mut R, id: u128) -> Result<Option<RawHead>, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = match read_line(reader).await? {
        Some(bytes) => String::from_utf8(bytes).map_err(|_| {
            warn!("[ID{}]请求行不是合法的UTF-8", id);
            Exception::MalformedRequestLine
        })?,
        None => return Ok(None),
    };

    let mut raw_headers = Vec::new();
    while let Some(bytes) = read_line(reader).await? {
        if bytes.is_empty() {
            break;
        }
        let line = String::from_utf8(bytes).map_err(|_| {
            warn!("[ID{}]标头行不是合法的UTF-8", id);
            Exception::MalformedRequest
        })?;
        match line.split_once(':') {
            Some((name, value)) => raw_headers.push((name.to_string(), value.to_string())),
            None => warn!("[ID{}]忽略缺少冒号的标头行：{}", id, line),
        }
    }
    debug!("[ID{}]读取到{}行原始标头", id, raw_headers.len());
    Ok(Some((request_line, raw_headers)))
}

/// 读取一行并去掉行尾的 `\r\n` 或 `\n`，EOF 时返回 `None`
async fn read_line<R>(reader: &mut R) -> Result<Option<Vec<u8>>, Exception>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line).await? == 0 {
        return Ok(None);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(Some(line))
}

/// 从请求行、原始标头与位于请求体起点的字节流构造 [`Request`]。
///
/// # 错误处理
/// - 请求行不是恰好三个记号：[`Exception::MalformedRequestLine`]
/// - 未知方法：[`Exception::UnsupportedMethod`]
/// - POST/PUT/PATCH 缺少 `Content-Length`：[`Exception::MissingContentLength`]
/// - `Content-Length` 非法：[`Exception::InvalidContentLength`]
/// - 请求体字节数不足：[`Exception::BodySizeMismatch`]
/// - 构造期不变量被违反：[`Exception::MalformedRequest`]
pub async fn parse<R>(
    request_line: &str,
    raw_headers: &[(String, String)],
    body: &mut R,
    id: u128,
) -> Result<Request, Exception>
where
    R: AsyncRead + Unpin,
{
    // 1. 请求行，例如 "GET /index.html HTTP/1.1"
    let tokens: Vec<&str> = request_line.split(' ').collect();
    if tokens.len() != 3 {
        warn!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
        return Err(Exception::MalformedRequestLine);
    }
    let verb = match Verb::from_token(tokens[0]) {
        Some(verb) => verb,
        None => {
            warn!("[ID{}]不支持的HTTP请求方法：{}", id, tokens[0]);
            return Err(Exception::UnsupportedMethod);
        }
    };
    let (path, version) = (tokens[1], tokens[2]);

    // 2. 规范化标头：未识别的丢弃，重复的覆盖
    let headers = canonicalize_headers(raw_headers, id);

    // 3. 请求体
    let content_length = match headers.get(HeaderName::ContentLength) {
        Some(raw) => Some(parse_content_length(raw, id)?),
        None => None,
    };
    let body = match content_length {
        None if verb.requires_body() => {
            warn!("[ID{}]{}请求缺少Content-Length", id, verb);
            return Err(Exception::MissingContentLength);
        }
        Some(length) if length > 0 && !verb.permits_body() => {
            warn!("[ID{}]{}请求不允许携带请求体", id, verb);
            return Err(Exception::MalformedRequest);
        }
        Some(length) if length > 0 => Some(read_body(body, length, id).await?),
        _ => None,
    };

    // 4. 构造并重新校验不变量
    Request::new(verb, path, version, headers, body).map_err(|e| {
        warn!("[ID{}]请求未通过校验：{} {} {}", id, verb, path, version);
        e
    })
}

fn canonicalize_headers(raw_headers: &[(String, String)], id: u128) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in raw_headers {
        match HeaderName::lookup(name) {
            Some(header) => headers.insert(header, value.trim()),
            None => warn!("[ID{}]忽略未知标头：{}", id, name.trim()),
        }
    }
    headers
}

/// 只接受纯十进制数字，`+2`、`-1`、空值都视为非法
fn parse_content_length(raw: &str, id: u128) -> Result<usize, Exception> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        warn!("[ID{}]非法的Content-Length：{}", id, raw);
        return Err(Exception::InvalidContentLength);
    }
    digits.parse::<usize>().map_err(|_| {
        warn!("[ID{}]Content-Length超出范围：{}", id, raw);
        Exception::InvalidContentLength
    })
}

/// 读取恰好 `length` 字节。短读会被重试，直到字节数满足或流结束。
async fn read_body<R>(stream: &mut R, length: usize, id: u128) -> Result<Bytes, Exception>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(length.min(64 * 1024));
    let read = (&mut *stream)
        .take(length as u64)
        .read_to_end(&mut buffer)
        .await?;
    if read < length {
        warn!("[ID{}]请求体长度不匹配：声明{}字节，实际{}字节", id, length, read);
        return Err(Exception::BodySizeMismatch);
    }
    debug!("[ID{}]请求体读取完毕，共{}字节", id, read);
    Ok(Bytes::from(buffer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn parse_str(line: &str, pairs: &[(&str, &str)], body: &[u8]) -> Result<Request, Exception> {
        let mut stream = body;
        parse(line, &headers(pairs), &mut stream, 0).await
    }

    #[tokio::test]
    async fn test_parse_get_request() {
        let request = parse_str("GET /users/7 HTTP/1.1", &[("Host", " example.com ")], b"")
            .await
            .unwrap();
        assert_eq!(request.verb(), Verb::Get);
        assert_eq!(request.path(), "/users/7");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.header(HeaderName::Host), Some("example.com"));
        assert!(request.body().is_none());
    }

    #[tokio::test]
    async fn test_request_line_needs_exactly_three_tokens() {
        for line in ["GET /", "GET / HTTP/1.1 extra", "GET  / HTTP/1.1", "", "GET /a b HTTP/1.1"] {
            let result = parse_str(line, &[], b"").await;
            assert_eq!(result.unwrap_err(), Exception::MalformedRequestLine, "{:?}", line);
        }
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let result = parse_str("TRACE / HTTP/1.1", &[], b"").await;
        assert_eq!(result.unwrap_err(), Exception::UnsupportedMethod);
    }

    /// 方法记号会先转为大写
    #[tokio::test]
    async fn test_lowercase_method() {
        let request = parse_str("get / HTTP/1.1", &[], b"").await.unwrap();
        assert_eq!(request.verb(), Verb::Get);
    }

    #[tokio::test]
    async fn test_unknown_headers_dropped_and_duplicates_overwrite() {
        let request = parse_str(
            "GET / HTTP/1.1",
            &[("X-Custom", "1"), ("host", "a"), ("HOST", "b")],
            b"",
        )
        .await
        .unwrap();
        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header(HeaderName::Host), Some("b"));
    }

    #[tokio::test]
    async fn test_post_body_read_exactly() {
        let request = parse_str(
            "POST /upload HTTP/1.1",
            &[("Content-Length", "2"), ("Content-Type", "application/json")],
            b"{}trailing",
        )
        .await
        .unwrap();
        assert_eq!(request.body().unwrap().as_ref(), b"{}");
    }

    #[tokio::test]
    async fn test_post_without_content_length() {
        for verb in ["POST", "PUT", "PATCH"] {
            let line = format!("{} /x HTTP/1.1", verb);
            let result = parse_str(&line, &[], b"{}").await;
            assert_eq!(result.unwrap_err(), Exception::MissingContentLength);
        }
    }

    #[tokio::test]
    async fn test_invalid_content_length() {
        for value in ["abc", "-1", "1.5", "", "+2", "0x2", "2 2"] {
            let result = parse_str("POST /x HTTP/1.1", &[("Content-Length", value)], b"{}").await;
            assert_eq!(result.unwrap_err(), Exception::InvalidContentLength, "{:?}", value);
        }
    }

    #[tokio::test]
    async fn test_content_length_surrounding_whitespace_trimmed() {
        let request = parse_str("POST /x HTTP/1.1", &[("Content-Length", " 2 ")], b"{}")
            .await
            .unwrap();
        assert_eq!(request.body().unwrap().as_ref(), b"{}");
    }

    #[tokio::test]
    async fn test_short_body_is_size_mismatch() {
        let result = parse_str("PUT /x HTTP/1.1", &[("Content-Length", "10")], b"abc").await;
        assert_eq!(result.unwrap_err(), Exception::BodySizeMismatch);
    }

    #[tokio::test]
    async fn test_zero_length_post_is_malformed() {
        let result = parse_str("POST /x HTTP/1.1", &[("Content-Length", "0")], b"").await;
        assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
    }

    #[tokio::test]
    async fn test_get_with_body_is_malformed() {
        for verb in ["GET", "HEAD", "OPTIONS"] {
            let line = format!("{} / HTTP/1.1", verb);
            let result = parse_str(&line, &[("Content-Length", "3")], b"abc").await;
            assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
        }
    }

    #[tokio::test]
    async fn test_get_with_zero_content_length_is_fine() {
        let request = parse_str("GET / HTTP/1.1", &[("Content-Length", "0")], b"").await.unwrap();
        assert!(request.body().is_none());
    }

    #[tokio::test]
    async fn test_delete_body_tolerated() {
        let request = parse_str("DELETE /r/1 HTTP/1.1", &[("Content-Length", "4")], b"gone")
            .await
            .unwrap();
        assert_eq!(request.body().unwrap().as_ref(), b"gone");

        let request = parse_str("DELETE /r/1 HTTP/1.1", &[], b"").await.unwrap();
        assert!(request.body().is_none());
    }

    #[tokio::test]
    async fn test_relative_target_is_malformed() {
        let result = parse_str("OPTIONS * HTTP/1.1", &[], b"").await;
        assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
    }

    #[tokio::test]
    async fn test_read_head_splits_headers_on_first_colon() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nBroken line\r\nAccept: */*\r\n\r\nBODY";
        let mut reader = BufReader::new(&raw[..]);
        let (line, headers) = read_head(&mut reader, 0).await.unwrap().unwrap();
        assert_eq!(line, "GET / HTTP/1.1");
        assert_eq!(
            headers,
            vec![
                ("Host".to_string(), " localhost:8080".to_string()),
                ("Accept".to_string(), " */*".to_string()),
            ]
        );

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"BODY");
    }

    #[tokio::test]
    async fn test_read_head_on_closed_connection() {
        let mut reader = BufReader::new(&b""[..]);
        assert!(read_head(&mut reader, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_head_accepts_bare_newlines() {
        let raw = b"GET /a HTTP/1.1\nHost: x\n\n";
        let mut reader = BufReader::new(&raw[..]);
        let (line, headers) = read_head(&mut reader, 0).await.unwrap().unwrap();
        assert_eq!(line, "GET /a HTTP/1.1");
        assert_eq!(headers.len(), 1);
    }

    #[tokio::test]
    async fn test_read_head_rejects_non_utf8_request_line() {
        let raw = b"\xff\xfe / HTTP/1.1\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);
        let result = read_head(&mut reader, 0).await;
        assert_eq!(result.unwrap_err(), Exception::MalformedRequestLine);
    }
}

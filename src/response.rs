// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 响应构建与序列化
//!
//! 响应分两个阶段：
//! - [`ResponseBuilder`] 累积状态码、标头与响应体；
//! - [`ResponseBuilder::build`] 冻结为不可变的 [`Response`]，并在此时一次性注入
//!   `Date`、`Server`、`Content-Length`、`Content-Type`、`Connection`。
//!
//! `Content-Length` 总是由响应体长度计算得出；其余默认值只在调用方未设置时注入。

use crate::{
    exception::Exception,
    param::{HeaderMap, HeaderName, HttpStatus, CRLF, DEFAULT_CONTENT_TYPE, DEFAULT_VERSION, SERVER_NAME},
    request::Request,
    util::format_http_date,
};
use bytes::Bytes;
use chrono::Utc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: HttpStatus,
    version: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl ResponseBuilder {
    pub fn new(status: HttpStatus) -> Self {
        Self {
            status,
            version: DEFAULT_VERSION.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// 冻结响应并注入必需的标头
    pub fn build(mut self) -> Response {
        let length = self.body.as_ref().map_or(0, |b| b.len());
        self.headers
            .insert_if_absent(HeaderName::Date, format_http_date(&Utc::now()));
        self.headers.insert_if_absent(HeaderName::Server, SERVER_NAME);
        self.headers.insert(HeaderName::ContentLength, length.to_string());
        self.headers
            .insert_if_absent(HeaderName::ContentType, DEFAULT_CONTENT_TYPE);
        self.headers.insert_if_absent(HeaderName::Connection, "close");

        Response {
            status: self.status,
            version: self.version,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// 冻结后的 HTTP 响应，没有任何修改器。
#[derive(Debug, Clone)]
pub struct Response {
    status: HttpStatus,
    version: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Response {
    pub fn builder(status: HttpStatus) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// 创建回显请求协议版本的构建器
    pub fn reply(request: &Request, status: HttpStatus) -> ResponseBuilder {
        ResponseBuilder::new(status).version(request.version())
    }

    /// 形如 `404 Not Found` 的纯文本响应，用于服务器自身合成的错误
    pub fn status_page(status: HttpStatus, version: &str) -> Response {
        ResponseBuilder::new(status)
            .version(version)
            .body(format!("{} {}", status.code(), status.reason()))
            .build()
    }

    /// 将响应头部（状态行、标头与空行）序列化为字节
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}{}",
            self.version,
            self.status.code(),
            self.status.reason(),
            CRLF
        );
        for (name, value) in self.headers.iter() {
            head.push_str(name.as_str());
            head.push_str(": ");
            head.push_str(value);
            head.push_str(CRLF);
        }
        head.push_str(CRLF);
        head.into_bytes()
    }

    /// 完整的响应报文字节
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut bytes = self.head_bytes();
        if let Some(body) = &self.body {
            bytes.extend_from_slice(body);
        }
        bytes
    }

    /// 将响应写入连接。头部与响应体分两次写入并各自刷新；
    /// 任一次写入失败即中止，返回 [`Exception::IoFailure`]。
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<(), Exception>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_all(&self.head_bytes()).await?;
        writer.flush().await?;
        if let Some(body) = &self.body {
            if !body.is_empty() {
                writer.write_all(body).await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }
}

// --- Getter 访问器实现 ---

impl Response {
    pub fn status(&self) -> HttpStatus {
        self.status
    }

    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    pub fn information(&self) -> &str {
        self.status.reason()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: HeaderName) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

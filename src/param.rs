// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议词汇表与常量模块
//!
//! 该模块定义了服务器核心使用的 HTTP 协议词汇，包括：
//! - 请求方法 [`Verb`]（封闭集合，未知方法即解析错误）。
//! - 可识别的标头名称 [`HeaderName`]，支持大小写不敏感查找。
//! - 状态码 [`HttpStatus`] 及其原因短语（Reason Phrase）。
//! - 静态文件处理器使用的 MIME 类型映射表。

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "httpcore/0.1";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 响应默认使用的协议版本
pub const DEFAULT_VERSION: &str = "HTTP/1.1";

/// 未设置 `Content-Type` 时注入的默认值
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// 监听套接字的 backlog 长度
pub const DEFAULT_BACKLOG: u32 = 50;

/// 标准 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Head,
}

impl Verb {
    /// 将请求行中的方法记号解析为 `Verb`。
    ///
    /// 记号先转为大写再精确匹配，因此 `get` 与 `GET` 等价；
    /// 不在集合内的记号返回 `None`，绝不会被强制转换。
    pub fn from_token(token: &str) -> Option<Self> {
        match token.to_uppercase().as_str() {
            "GET" => Some(Verb::Get),
            "POST" => Some(Verb::Post),
            "PUT" => Some(Verb::Put),
            "PATCH" => Some(Verb::Patch),
            "DELETE" => Some(Verb::Delete),
            "OPTIONS" => Some(Verb::Options),
            "HEAD" => Some(Verb::Head),
            _ => None,
        }
    }

    /// 该方法是否必须携带请求体（POST/PUT/PATCH）
    pub fn requires_body(&self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Patch)
    }

    /// 该方法是否允许携带请求体。DELETE 可选地携带请求体。
    pub fn permits_body(&self) -> bool {
        self.requires_body() || *self == Verb::Delete
    }

    pub fn as_str(&self) -> &'static str {
        match *self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Options => "OPTIONS",
            Verb::Head => "HEAD",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 服务器可识别的标头名称。
///
/// 解析请求时，不在此集合内的标头会被记录警告后丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderName {
    // 请求标头
    Host,
    UserAgent,
    Accept,
    AcceptLanguage,
    AcceptEncoding,
    ContentEncoding,
    Authorization,
    // 响应标头
    Server,
    Date,
    ContentType,
    ContentLength,
    Location,
    ContentDisposition,
    KeepAlive,
    ETag,
    LastModified,
    CacheControl,
    // 通用标头
    Connection,
}

const ALL_HEADERS: [HeaderName; 18] = [
    HeaderName::Host,
    HeaderName::UserAgent,
    HeaderName::Accept,
    HeaderName::AcceptLanguage,
    HeaderName::AcceptEncoding,
    HeaderName::ContentEncoding,
    HeaderName::Authorization,
    HeaderName::Server,
    HeaderName::Date,
    HeaderName::ContentType,
    HeaderName::ContentLength,
    HeaderName::Location,
    HeaderName::ContentDisposition,
    HeaderName::KeepAlive,
    HeaderName::ETag,
    HeaderName::LastModified,
    HeaderName::CacheControl,
    HeaderName::Connection,
];

lazy_static! {
    /// 小写标头名到 [`HeaderName`] 的查找表，只在首次使用时构建一次。
    static ref HEADER_LOOKUP: HashMap<String, HeaderName> = {
        let mut map = HashMap::new();
        for header in ALL_HEADERS {
            map.insert(header.as_str().to_ascii_lowercase(), header);
        }
        map
    };
}

impl HeaderName {
    /// 大小写不敏感地查找标头名，未识别时返回 `None`
    pub fn lookup(name: &str) -> Option<Self> {
        HEADER_LOOKUP.get(&name.trim().to_ascii_lowercase()).copied()
    }

    /// 标头的规范写法（用于序列化）
    pub fn as_str(&self) -> &'static str {
        match *self {
            HeaderName::Host => "Host",
            HeaderName::UserAgent => "User-Agent",
            HeaderName::Accept => "Accept",
            HeaderName::AcceptLanguage => "Accept-Language",
            HeaderName::AcceptEncoding => "Accept-Encoding",
            HeaderName::ContentEncoding => "Content-Encoding",
            HeaderName::Authorization => "Authorization",
            HeaderName::Server => "Server",
            HeaderName::Date => "Date",
            HeaderName::ContentType => "Content-Type",
            HeaderName::ContentLength => "Content-Length",
            HeaderName::Location => "Location",
            HeaderName::ContentDisposition => "Content-Disposition",
            HeaderName::KeepAlive => "Keep-Alive",
            HeaderName::ETag => "ETag",
            HeaderName::LastModified => "Last-Modified",
            HeaderName::CacheControl => "Cache-Control",
            HeaderName::Connection => "Connection",
        }
    }
}

impl fmt::Display for HeaderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 保持插入顺序的标头映射。
///
/// 键唯一：重复插入同名标头会原地覆盖旧值（后写者胜），
/// 因此序列化时标头顺序等于各键首次插入的顺序。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<(HeaderName, String)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: HeaderName, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// 仅在键不存在时插入，返回是否发生了插入
    pub fn insert_if_absent(&mut self, name: HeaderName, value: impl Into<String>) -> bool {
        if self.contains(name) {
            return false;
        }
        self.entries.push((name, value.into()));
        true
    }

    pub fn get(&self, name: HeaderName) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: HeaderName) -> bool {
        self.entries.iter().any(|(key, _)| *key == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (HeaderName, &str)> {
        self.entries.iter().map(|(key, value)| (*key, value.as_str()))
    }
}

/// 服务器会产生的 HTTP 状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok,
    Created,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    UnsupportedMediaType,
    InternalServerError,
}

impl HttpStatus {
    pub fn code(&self) -> u16 {
        match *self {
            HttpStatus::Ok => 200,
            HttpStatus::Created => 201,
            HttpStatus::BadRequest => 400,
            HttpStatus::Forbidden => 403,
            HttpStatus::NotFound => 404,
            HttpStatus::MethodNotAllowed => 405,
            HttpStatus::UnsupportedMediaType => 415,
            HttpStatus::InternalServerError => 500,
        }
    }

    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub fn reason(&self) -> &'static str {
        match *self {
            HttpStatus::Ok => "OK",
            HttpStatus::Created => "Created",
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::Forbidden => "Forbidden",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::MethodNotAllowed => "Method Not Allowed",
            HttpStatus::UnsupportedMediaType => "Unsupported Media Type",
            HttpStatus::InternalServerError => "Internal Server Error",
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.reason())
    }
}

lazy_static! {
    /// 文件后缀名到 MIME 类型（Media Type）的映射表。
    ///
    /// 静态文件处理器只服务此表中存在的后缀，其余返回 415。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        map.insert("html", "text/html; charset=utf-8");
        map.insert("htm", "text/html; charset=utf-8");
        map.insert("txt", "text/plain; charset=utf-8");
        map.insert("css", "text/css; charset=utf-8");
        map.insert("js", "application/javascript");
        map.insert("mjs", "application/javascript");
        map.insert("json", "application/json");
        map.insert("xml", "text/xml");
        map.insert("csv", "text/csv");
        map.insert("png", "image/png");
        map.insert("jpg", "image/jpeg");
        map.insert("jpeg", "image/jpeg");
        map.insert("gif", "image/gif");
        map.insert("svg", "image/svg+xml");
        map.insert("ico", "image/x-icon");
        map.insert("webp", "image/webp");
        map.insert("pdf", "application/pdf");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        // 无法在浏览器内展示的二进制流，以附件形式下载
        map.insert("bin", "application/octet-stream");
        map.insert("zip", "application/zip");
        map
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_from_token() {
        assert_eq!(Verb::from_token("GET"), Some(Verb::Get));
        assert_eq!(Verb::from_token("patch"), Some(Verb::Patch));
        assert_eq!(Verb::from_token("Delete"), Some(Verb::Delete));
        assert_eq!(Verb::from_token("TRACE"), None);
        assert_eq!(Verb::from_token(""), None);
    }

    #[test]
    fn test_verb_body_rules() {
        assert!(Verb::Post.requires_body());
        assert!(Verb::Put.requires_body());
        assert!(Verb::Patch.requires_body());
        assert!(!Verb::Delete.requires_body());
        assert!(Verb::Delete.permits_body());
        assert!(!Verb::Get.permits_body());
        assert!(!Verb::Head.permits_body());
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        assert_eq!(HeaderName::lookup("content-length"), Some(HeaderName::ContentLength));
        assert_eq!(HeaderName::lookup("CONTENT-TYPE"), Some(HeaderName::ContentType));
        assert_eq!(HeaderName::lookup("etag"), Some(HeaderName::ETag));
        assert_eq!(HeaderName::lookup("X-Forwarded-For"), None);
    }

    #[test]
    fn test_every_header_round_trips_through_lookup() {
        for header in ALL_HEADERS {
            assert_eq!(HeaderName::lookup(header.as_str()), Some(header));
        }
    }

    #[test]
    fn test_header_map_last_write_wins_keeps_position() {
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::Host, "a");
        headers.insert(HeaderName::Accept, "*/*");
        headers.insert(HeaderName::Host, "b");

        let collected: Vec<_> = headers.iter().collect();
        assert_eq!(collected, vec![(HeaderName::Host, "b"), (HeaderName::Accept, "*/*")]);
    }

    #[test]
    fn test_header_map_insert_if_absent() {
        let mut headers = HeaderMap::new();
        assert!(headers.insert_if_absent(HeaderName::Connection, "keep-alive"));
        assert!(!headers.insert_if_absent(HeaderName::Connection, "close"));
        assert_eq!(headers.get(HeaderName::Connection), Some("keep-alive"));
    }

    #[test]
    fn test_status_codes_and_reasons() {
        for (status, code, reason) in [
            (HttpStatus::Ok, 200, "OK"),
            (HttpStatus::Created, 201, "Created"),
            (HttpStatus::BadRequest, 400, "Bad Request"),
            (HttpStatus::Forbidden, 403, "Forbidden"),
            (HttpStatus::NotFound, 404, "Not Found"),
            (HttpStatus::MethodNotAllowed, 405, "Method Not Allowed"),
            (HttpStatus::UnsupportedMediaType, 415, "Unsupported Media Type"),
            (HttpStatus::InternalServerError, 500, "Internal Server Error"),
        ] {
            assert_eq!(status.code(), code);
            assert_eq!(status.reason(), reason);
        }
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(MIME_TYPES.get("html"), Some(&"text/html; charset=utf-8"));
        assert_eq!(MIME_TYPES.get("png"), Some(&"image/png"));
        assert_eq!(MIME_TYPES.get("exe"), None);
    }
}

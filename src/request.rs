// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求模型
//!
//! [`Request`] 是单个连接上解析出的不可变请求对象。所有字段在构造时一次性填充，
//! 构造函数负责校验以下不变量，任何一项不满足都返回 [`Exception::MalformedRequest`]：
//! 1. 路径必须以 `/` 开头。
//! 2. 协议版本记号不能为空（但不与固定集合比较）。
//! 3. POST/PUT/PATCH 必须携带非空请求体；DELETE 可以携带；其余方法不得携带。

use crate::{
    exception::Exception,
    param::{HeaderMap, HeaderName, Verb},
};
use bytes::Bytes;
use std::collections::HashMap;

/// 表示一个完整解析后的 HTTP 请求。
#[derive(Debug, Clone)]
pub struct Request {
    verb: Verb,
    /// 请求目标（含查询字符串）
    path: String,
    version: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    query_params: HashMap<String, String>,
}

impl Request {
    pub fn new(
        verb: Verb,
        path: impl Into<String>,
        version: impl Into<String>,
        headers: HeaderMap,
        body: Option<Bytes>,
    ) -> Result<Self, Exception> {
        let path = path.into();
        let version = version.into();

        if !path.starts_with('/') {
            return Err(Exception::MalformedRequest);
        }
        if version.trim().is_empty() {
            return Err(Exception::MalformedRequest);
        }

        let body = body.filter(|b| !b.is_empty());
        match (&body, verb.requires_body(), verb.permits_body()) {
            (None, true, _) => return Err(Exception::MalformedRequest),
            // 只有空白字符的请求体等同于缺失
            (Some(b), true, _) if b.iter().all(u8::is_ascii_whitespace) => {
                return Err(Exception::MalformedRequest)
            }
            (Some(_), _, false) => return Err(Exception::MalformedRequest),
            _ => {}
        }

        let query_params = parse_query(&path);
        Ok(Self {
            verb,
            path,
            version,
            headers,
            body,
            query_params,
        })
    }
}

/// 将 `?` 之后的查询串按 `&` 与首个 `=` 拆分，缺少 `=` 的片段被静默丢弃
fn parse_query(path: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let query = match path.split_once('?') {
        Some((_, q)) => q,
        None => return params,
    };
    for pair in query.split('&') {
        if let Some((key, value)) = pair.split_once('=') {
            params.insert(key.to_string(), value.to_string());
        }
    }
    params
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 去掉查询串后的路径，用于路由匹配与文件解析
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((p, _)) => p,
            None => &self.path,
        }
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

    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query_params
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params.get(key).map(String::as_str)
    }

    /// 获取用户代理字符串，缺失时为空串（仅用于日志）
    pub fn user_agent(&self) -> &str {
        self.header(HeaderName::UserAgent).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(path: &str) -> Result<Request, Exception> {
        Request::new(Verb::Get, path, "HTTP/1.1", HeaderMap::new(), None)
    }

    #[test]
    fn test_path_must_start_with_slash() {
        assert!(get("/index.html").is_ok());
        assert_eq!(get("index.html").unwrap_err(), Exception::MalformedRequest);
        assert_eq!(get("*").unwrap_err(), Exception::MalformedRequest);
    }

    #[test]
    fn test_version_must_not_be_empty() {
        let result = Request::new(Verb::Get, "/", " ", HeaderMap::new(), None);
        assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
    }

    /// 版本记号只做回显，不与固定集合比较
    #[test]
    fn test_version_is_not_validated() {
        let request = Request::new(Verb::Get, "/", "HTTP/9.9", HeaderMap::new(), None).unwrap();
        assert_eq!(request.version(), "HTTP/9.9");
    }

    #[test]
    fn test_body_required_for_post_put_patch() {
        for verb in [Verb::Post, Verb::Put, Verb::Patch] {
            let missing = Request::new(verb, "/x", "HTTP/1.1", HeaderMap::new(), None);
            assert_eq!(missing.unwrap_err(), Exception::MalformedRequest);

            let empty = Request::new(verb, "/x", "HTTP/1.1", HeaderMap::new(), Some(Bytes::new()));
            assert_eq!(empty.unwrap_err(), Exception::MalformedRequest);

            let blank = Request::new(verb, "/x", "HTTP/1.1", HeaderMap::new(), Some(Bytes::from(" \r\n\t")));
            assert_eq!(blank.unwrap_err(), Exception::MalformedRequest);

            let ok = Request::new(verb, "/x", "HTTP/1.1", HeaderMap::new(), Some(Bytes::from("{}")));
            assert_eq!(ok.unwrap().body().unwrap().as_ref(), b"{}");
        }
    }

    #[test]
    fn test_body_rejected_for_bodiless_verbs() {
        for verb in [Verb::Get, Verb::Head, Verb::Options] {
            let result = Request::new(verb, "/", "HTTP/1.1", HeaderMap::new(), Some(Bytes::from("x")));
            assert_eq!(result.unwrap_err(), Exception::MalformedRequest);
        }
    }

    #[test]
    fn test_delete_body_is_optional() {
        let without = Request::new(Verb::Delete, "/r/1", "HTTP/1.1", HeaderMap::new(), None).unwrap();
        assert!(without.body().is_none());
        let with =
            Request::new(Verb::Delete, "/r/1", "HTTP/1.1", HeaderMap::new(), Some(Bytes::from("x"))).unwrap();
        assert!(with.body().is_some());
    }

    #[test]
    fn test_query_params() {
        let request = get("/page?id=123&name=test&flag&empty=").unwrap();
        assert_eq!(request.query_param("id"), Some("123"));
        assert_eq!(request.query_param("name"), Some("test"));
        assert_eq!(request.query_param("flag"), None);
        assert_eq!(request.query_param("empty"), Some(""));
        assert_eq!(request.query_params().len(), 3);
        assert_eq!(request.route_path(), "/page");
        assert_eq!(request.path(), "/page?id=123&name=test&flag&empty=");
    }

    #[test]
    fn test_query_value_keeps_later_equals_signs() {
        let request = get("/q?expr=a=b&x=1&x=2").unwrap();
        assert_eq!(request.query_param("expr"), Some("a=b"));
        assert_eq!(request.query_param("x"), Some("2"));
    }

    #[test]
    fn test_no_query() {
        let request = get("/plain").unwrap();
        assert!(request.query_params().is_empty());
        assert_eq!(request.route_path(), "/plain");
    }
}

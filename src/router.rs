// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由引擎
//!
//! 将 `(方法, 路径模式)` 映射到处理器。路由表在服务器开始接收连接之前构建，
//! 之后只读，因此多个工作线程并发调用 [`Router::resolve`] 无需加锁。
//!
//! ## 匹配顺序
//! 1. 精确匹配：以 `"METHOD /path"` 为键的哈希查找。
//! 2. 模式匹配：按注册顺序扫描含 `:name` 或 `*` 的模式，第一个命中者胜出。
//!    `:name` 匹配恰好一个不含 `/` 的非空路径段，`*` 匹配任意剩余后缀（可为空）。
//! 3. 回退：GET 请求且注册了默认 GET 处理器时使用之。
//! 4. 未命中：GET 得到 404，其他方法得到 405。
//!
//! 模式之间没有“更具体者优先”的规则，重叠的模式完全由注册顺序决定。

use crate::{
    exception::Exception,
    param::{HttpStatus, Verb},
    request::Request,
    response::Response,
};
use log::{debug, error, info, warn};
use regex::Regex;
use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
};

/// 应用处理器：从请求到响应的纯函数，不能接触底层连接。
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Response + Send + Sync,
{
    fn handle(&self, request: &Request) -> Response {
        self(request)
    }
}

/// 一次路由解析的结果。未命中不是异常，而是普通的解析结果。
pub enum Resolution<'a> {
    Matched(&'a dyn Handler),
    Fallback(&'a dyn Handler),
    NotFound,
    MethodNotAllowed,
}

impl Resolution<'_> {
    /// 未命中时对应的异常分类
    pub fn miss(&self) -> Option<Exception> {
        match self {
            Resolution::NotFound => Some(Exception::RouteNotFound),
            Resolution::MethodNotAllowed => Some(Exception::MethodNotAllowed),
            _ => None,
        }
    }
}

struct PatternRoute {
    verb: Verb,
    pattern: String,
    matcher: Regex,
    handler: Box<dyn Handler>,
}

#[derive(Default)]
pub struct Router {
    exact: HashMap<String, Box<dyn Handler>>,
    patterns: Vec<PatternRoute>,
    fallback: Option<Box<dyn Handler>>,
}

fn route_key(verb: Verb, path: &str) -> String {
    format!("{} {}", verb, path)
}

fn is_pattern(pattern: &str) -> bool {
    pattern.contains(':') || pattern.contains('*')
}

/// 将路由模式编译为锚定的正则表达式。
///
/// 每个路径段中第一个 `:` 之后直到段尾的部分是参数名，编译为 `[^/]+`；
/// `*` 编译为 `.*`；其余字符按字面量转义。
fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::from("^");
    for (index, segment) in pattern.split('/').enumerate() {
        if index > 0 {
            expr.push('/');
        }
        let (literal, has_param) = match segment.find(':') {
            Some(i) if i + 1 < segment.len() => (&segment[..i], true),
            _ => (segment, false),
        };
        let parts: Vec<String> = literal.split('*').map(regex::escape).collect();
        expr.push_str(&parts.join(".*"));
        if has_param {
            expr.push_str("[^/]+");
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册路由。同一 `(方法, 模式)` 的后一次注册覆盖前一次，并保留原注册位置。
    pub fn register<H>(&mut self, verb: Verb, pattern: &str, handler: H) -> Result<(), Exception>
    where
        H: Handler + 'static,
    {
        if !is_pattern(pattern) {
            if self
                .exact
                .insert(route_key(verb, pattern), Box::new(handler))
                .is_some()
            {
                warn!("路由{} {}被重复注册，旧处理器已被替换", verb, pattern);
            }
            debug!("注册精确路由：{} {}", verb, pattern);
            return Ok(());
        }

        if let Some(route) = self
            .patterns
            .iter_mut()
            .find(|r| r.verb == verb && r.pattern == pattern)
        {
            warn!("路由{} {}被重复注册，旧处理器已被替换", verb, pattern);
            route.handler = Box::new(handler);
            return Ok(());
        }

        let matcher = compile_pattern(pattern).map_err(|e| {
            error!("无法编译路由模式{}：{}", pattern, e);
            Exception::InvalidConfiguration
        })?;
        debug!("注册模式路由：{} {} => {}", verb, pattern, matcher.as_str());
        self.patterns.push(PatternRoute {
            verb,
            pattern: pattern.to_string(),
            matcher,
            handler: Box::new(handler),
        });
        Ok(())
    }

    /// 设置只用于未命中 GET 请求的默认处理器
    pub fn set_default_get<H>(&mut self, handler: H)
    where
        H: Handler + 'static,
    {
        self.fallback = Some(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 解析处理器。路径中的查询串应当已被去除。
    pub fn resolve(&self, verb: Verb, path: &str) -> Resolution<'_> {
        if let Some(handler) = self.exact.get(&route_key(verb, path)) {
            return Resolution::Matched(handler.as_ref());
        }

        if let Some(route) = self
            .patterns
            .iter()
            .find(|r| r.verb == verb && r.matcher.is_match(path))
        {
            return Resolution::Matched(route.handler.as_ref());
        }

        match (&self.fallback, verb) {
            (Some(handler), Verb::Get) => Resolution::Fallback(handler.as_ref()),
            (None, Verb::Get) => Resolution::NotFound,
            _ => Resolution::MethodNotAllowed,
        }
    }

    /// 解析并调用处理器。
    ///
    /// 未命中映射为 404/405；处理器 panic 被捕获并转换为 500，工作线程继续运行。
    pub fn dispatch(&self, request: &Request, id: u128) -> Response {
        let resolution = self.resolve(request.verb(), request.route_path());
        let handler = match resolution {
            Resolution::Matched(handler) => handler,
            Resolution::Fallback(handler) => {
                debug!("[ID{}]使用默认GET处理器", id);
                handler
            }
            ref miss => {
                let exception = miss.miss().unwrap_or(Exception::RouteNotFound);
                info!(
                    "[ID{}]{} {}未匹配任何路由：{}",
                    id,
                    request.verb(),
                    request.route_path(),
                    exception
                );
                return Response::status_page(exception.status(), request.version());
            }
        };

        match catch_unwind(AssertUnwindSafe(|| handler.handle(request))) {
            Ok(response) => response,
            Err(_) => {
                error!("[ID{}]处理器在处理{}时发生panic", id, request.path());
                Response::status_page(HttpStatus::InternalServerError, request.version())
            }
        }
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了服务器在启动与请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖请求解析错误、路由结果、静态文件安全错误、I/O 错误以及启动期错误。
//! - **语义映射**：[`Exception::status`] 将每个变体映射为写回客户端的 HTTP 状态码。
//! - **传播边界**：解析类错误只在连接边界被转换为 400 响应，从不终止工作线程。

use crate::param::HttpStatus;
use std::{fmt, io};

/// 服务器处理请求过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求行不是恰好由单个空格分隔的三个记号，或不是合法的 UTF-8。
    MalformedRequestLine,
    /// 请求对象的构造期不变量被违反（路径不以 `/` 开头、请求体与方法不匹配等）。
    MalformedRequest,
    /// 请求方法不在 [`crate::param::Verb`] 集合内。
    UnsupportedMethod,
    /// POST/PUT/PATCH 请求缺少 `Content-Length`。
    MissingContentLength,
    /// `Content-Length` 不是非负整数。
    InvalidContentLength,
    /// 客户端发送的请求体字节数少于声明的 `Content-Length`。
    BodySizeMismatch,
    /// GET 请求没有匹配的路由且未注册默认处理器。对应 `404 Not Found`。
    RouteNotFound,
    /// 非 GET 请求没有匹配的路由。对应 `405 Method Not Allowed`。
    MethodNotAllowed,
    /// 请求路径试图逃逸静态资源根目录。对应 `403 Forbidden`。
    PathTraversal,
    /// 文件后缀或请求体类型不受支持。对应 `415 Unsupported Media Type`。
    UnsupportedMediaType,
    /// 套接字或文件系统的 I/O 失败。
    IoFailure(io::ErrorKind),
    /// 启动时无法解析监听地址，进程在绑定端口之前退出。
    StartupHostResolutionFailure,
    /// 配置文件或命令行参数非法，进程在绑定端口之前退出。
    InvalidConfiguration,
}

use Exception::*;

impl Exception {
    /// 是否属于请求解析阶段的错误（在连接边界转换为 400）
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            MalformedRequestLine
                | MalformedRequest
                | UnsupportedMethod
                | MissingContentLength
                | InvalidContentLength
                | BodySizeMismatch
        )
    }

    /// 写回客户端时使用的状态码
    pub fn status(&self) -> HttpStatus {
        match self {
            MalformedRequestLine
            | MalformedRequest
            | UnsupportedMethod
            | MissingContentLength
            | InvalidContentLength
            | BodySizeMismatch => HttpStatus::BadRequest,
            RouteNotFound => HttpStatus::NotFound,
            MethodNotAllowed => HttpStatus::MethodNotAllowed,
            PathTraversal => HttpStatus::Forbidden,
            UnsupportedMediaType => HttpStatus::UnsupportedMediaType,
            IoFailure(_) | StartupHostResolutionFailure | InvalidConfiguration => {
                HttpStatus::InternalServerError
            }
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedRequestLine => write!(f, "Malformed request line"),
            MalformedRequest => write!(f, "Malformed request"),
            UnsupportedMethod => write!(f, "Unsupported request method"),
            MissingContentLength => write!(f, "Missing Content-Length header"),
            InvalidContentLength => write!(f, "Invalid Content-Length header"),
            BodySizeMismatch => write!(f, "Body is shorter than the declared Content-Length"),
            RouteNotFound => write!(f, "Route not found (404)"),
            MethodNotAllowed => write!(f, "Method not allowed (405)"),
            PathTraversal => write!(f, "Path escapes the static root (403)"),
            UnsupportedMediaType => write!(f, "Unsupported media type (415)"),
            IoFailure(kind) => write!(f, "I/O failure: {}", kind),
            StartupHostResolutionFailure => write!(f, "Couldn't resolve the listen host"),
            InvalidConfiguration => write!(f, "Invalid server configuration"),
        }
    }
}

impl std::error::Error for Exception {}

impl From<io::Error> for Exception {
    fn from(e: io::Error) -> Self {
        IoFailure(e.kind())
    }
}

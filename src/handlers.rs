// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 应用处理器
//!
//! 插入路由表的普通处理器，只通过 [`Request`]/[`Response`] 与核心交互：
//! - [`StaticFiles`]：把请求路径映射到资源根目录下的文件，作为默认 GET 处理器；
//! - [`Uploads`]：接收 JSON 请求体并保存到上传目录；
//! - [`configure_router`]：组装应用的路由表。

use crate::{
    config::Config,
    exception::Exception,
    param::{HeaderName, HttpStatus, Verb, MIME_TYPES},
    request::Request,
    response::Response,
    router::{Handler, Router},
    util::{normalize_relative, percent_decode},
};
use chrono::Local;
use log::{debug, error, info, warn};
use serde_json::json;
use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// 首页横幅
const BANNER: &str = "Server is running! Use POST /upload to upload JSON files.";

/// 上传文件对外暴露的路径前缀
const UPLOADS_PREFIX: &str = "/uploads";

/// 静态文件处理器
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 将请求路径解析为根目录下的文件路径。
    ///
    /// 路径先做百分号解码，再做词法规范化；任何越过根目录的尝试
    /// （`..`、编码后的 `%2e%2e`、NUL 字节、指向根外的符号链接）都返回
    /// [`Exception::PathTraversal`]。
    pub fn resolve(&self, request_path: &str) -> Result<PathBuf, Exception> {
        let decoded = percent_decode(request_path).ok_or(Exception::PathTraversal)?;
        let relative = match decoded.trim_start_matches('/') {
            "" => "index.html",
            rest => rest,
        };
        let normalized = normalize_relative(relative)?;
        let candidate = self.root.join(normalized);

        // 对已存在的路径再做一次规范化，防止符号链接逃逸
        if candidate.exists() {
            let root = self.root.canonicalize()?;
            let real = candidate.canonicalize()?;
            if !real.starts_with(&root) {
                return Err(Exception::PathTraversal);
            }
        }
        Ok(candidate)
    }

    fn serve(&self, request: &Request, path: &Path) -> Response {
        if !path.is_file() {
            return text_reply(request, HttpStatus::NotFound);
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let mime = match extension.as_deref().and_then(|e| MIME_TYPES.get(e)) {
            Some(mime) => *mime,
            None => {
                warn!("无法确定文件{}的MIME类型", path.display());
                return text_reply(request, HttpStatus::UnsupportedMediaType);
            }
        };

        let contents = match fs::read(path) {
            Ok(contents) => contents,
            Err(e) => {
                error!("无法读取文件{}：{}", path.display(), e);
                return text_reply(request, HttpStatus::InternalServerError);
            }
        };

        let mut builder = Response::reply(request, HttpStatus::Ok).header(HeaderName::ContentType, mime);
        if mime == "application/octet-stream" {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            builder = builder.header(
                HeaderName::ContentDisposition,
                format!("attachment; filename=\"{}\"", name),
            );
        }
        debug!("发送文件：{}（{}字节）", path.display(), contents.len());
        builder.body(contents).build()
    }
}

impl Handler for StaticFiles {
    fn handle(&self, request: &Request) -> Response {
        match self.resolve(request.route_path()) {
            Ok(path) => self.serve(request, &path),
            Err(Exception::PathTraversal) => {
                warn!("拦截路径遍历尝试：{}", request.path());
                text_reply(request, HttpStatus::Forbidden)
            }
            Err(e) => {
                error!("解析静态文件路径{}失败：{}", request.path(), e);
                text_reply(request, HttpStatus::InternalServerError)
            }
        }
    }
}

fn text_reply(request: &Request, status: HttpStatus) -> Response {
    Response::status_page(status, request.version())
}

/// JSON 上传处理器
#[derive(Debug, Clone)]
pub struct Uploads {
    dir: PathBuf,
}

impl Uploads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn validate<'a>(&self, request: &'a Request) -> Result<&'a str, (Exception, &'static str)> {
        let content_type = request.header(HeaderName::ContentType).unwrap_or("");
        let media_type = content_type.split(';').next().unwrap_or("").trim();
        if !media_type.eq_ignore_ascii_case("application/json") {
            return Err((
                Exception::UnsupportedMediaType,
                "Content-Type must be application/json",
            ));
        }

        let body = request
            .body()
            .and_then(|b| std::str::from_utf8(b).ok())
            .map(str::trim)
            .unwrap_or("");
        if body.is_empty() {
            return Err((Exception::MalformedRequest, "JSON body is missing or empty"));
        }
        if !body.starts_with('{') || !body.ends_with('}') {
            return Err((Exception::MalformedRequest, "Invalid JSON format"));
        }
        Ok(body)
    }

    /// 以 `upload_<时间戳>_<随机后缀>.json` 为名创建新文件，返回对外路径
    fn save(&self, json_body: &str) -> io::Result<String> {
        fs::create_dir_all(&self.dir)?;
        let file_name = format!(
            "upload_{}_{:04x}.json",
            Local::now().format("%Y%m%d_%H%M%S"),
            fastrand::u16(..)
        );
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.dir.join(&file_name))?;
        file.write_all(json_body.as_bytes())?;
        Ok(format!("{}/{}", UPLOADS_PREFIX, file_name))
    }
}

impl Handler for Uploads {
    fn handle(&self, request: &Request) -> Response {
        let json_body = match self.validate(request) {
            Ok(body) => body,
            Err((exception, message)) => {
                warn!("拒绝上传请求：{}", message);
                return json_error(request, exception.status(), message);
            }
        };

        match self.save(json_body) {
            Ok(filepath) => {
                info!("文件上传成功：{}", filepath);
                let envelope = json!({
                    "status": "success",
                    "message": "File created successfully",
                    "filepath": filepath,
                });
                Response::reply(request, HttpStatus::Created)
                    .header(HeaderName::ContentType, "application/json")
                    .body(envelope.to_string())
                    .build()
            }
            Err(e) => {
                error!("无法保存上传文件：{}", e);
                json_error(request, HttpStatus::InternalServerError, "Could not save file")
            }
        }
    }
}

fn json_error(request: &Request, status: HttpStatus, message: &str) -> Response {
    let envelope = json!({ "status": "error", "message": message });
    Response::reply(request, status)
        .header(HeaderName::ContentType, "application/json")
        .body(envelope.to_string())
        .build()
}

/// 组装应用路由：首页横幅、JSON 上传，以及作为默认 GET 处理器的静态文件服务
pub fn configure_router(config: &Config) -> Result<Router, Exception> {
    let mut router = Router::new();
    router.set_default_get(StaticFiles::new(config.www_root()));
    router.register(Verb::Get, "/", |request: &Request| {
        Response::reply(request, HttpStatus::Ok).body(BANNER).build()
    })?;
    router.register(Verb::Post, "/upload", Uploads::new(config.uploads_dir()))?;
    Ok(router)
}

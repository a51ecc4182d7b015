// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};

use crate::exception::Exception;

/// RFC 7231 IMF-fixdate，例如 `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// 百分号解码。非法的转义序列原样保留；结果不是合法 UTF-8 时返回 `None`。
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(high << 4 | low);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// 按词法规则规范化相对路径：`.` 被忽略，`..` 弹出上一级。
///
/// `..` 越过起点、出现根目录或盘符前缀、或包含 NUL 字节时，
/// 返回 [`Exception::PathTraversal`]。
pub fn normalize_relative(path: &str) -> Result<PathBuf, Exception> {
    if path.contains('\0') {
        return Err(Exception::PathTraversal);
    }
    let mut normalized = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(Exception::PathTraversal);
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(Exception::PathTraversal),
        }
    }
    Ok(normalized)
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;
use serde_derive::Serialize;

use crate::{exception::Exception, param::DEFAULT_BACKLOG};
use log::{error, warn};
use std::fs;

/// 服务器启动配置。启动时构造一次，之后只读地交给 [`crate::server::Server`]。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_worker_threads")]
    worker_threads: usize,
    #[serde(default = "default_backlog")]
    backlog: u32,
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_uploads_dir")]
    uploads_dir: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_worker_threads() -> usize {
    10
}

fn default_backlog() -> u32 {
    DEFAULT_BACKLOG
}

fn default_www_root() -> String {
    "resources".to_string()
}

fn default_uploads_dir() -> String {
    "resources/uploads".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            worker_threads: default_worker_threads(),
            backlog: default_backlog(),
            www_root: default_www_root(),
            uploads_dir: default_uploads_dir(),
        }
    }

    /// 从 TOML 文件读取配置。缺省字段使用默认值；
    /// `worker_threads = 0` 表示按 CPU 核数自动设置。
    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let str_val = fs::read_to_string(filename).map_err(|e| {
            error!("无法读取配置文件{}：{}", filename, e);
            Exception::from(e)
        })?;
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(str_val: &str) -> Result<Self, Exception> {
        let mut raw_config: Config = toml::from_str(str_val).map_err(|e| {
            error!("无法从配置文件构建配置对象：{}", e);
            Exception::InvalidConfiguration
        })?;
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
            warn!("worker_threads被设置为0，将使用CPU核数{}", raw_config.worker_threads);
        }
        Ok(raw_config)
    }

    /// 应用可选的位置参数 `[port] [host] [thread_count]`。
    ///
    /// 端口或线程数不是数字（或为 0）时立即失败，不回退到默认值。
    pub fn with_args<S: AsRef<str>>(mut self, args: &[S]) -> Result<Self, Exception> {
        if args.len() > 3 {
            error!("参数过多，用法：[port] [host] [thread_count]");
            return Err(Exception::InvalidConfiguration);
        }
        if let Some(port) = args.first() {
            let port = port.as_ref();
            self.port = match port.parse::<u16>() {
                Ok(p) if p > 0 => p,
                _ => {
                    error!("非法的端口号：{}", port);
                    return Err(Exception::InvalidConfiguration);
                }
            };
        }
        if let Some(host) = args.get(1) {
            let host = host.as_ref().trim();
            if host.is_empty() {
                error!("监听地址不能为空");
                return Err(Exception::InvalidConfiguration);
            }
            self.host = host.to_string();
        }
        if let Some(threads) = args.get(2) {
            let threads = threads.as_ref();
            self.worker_threads = match threads.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    error!("非法的线程数：{}", threads);
                    return Err(Exception::InvalidConfiguration);
                }
            };
        }
        Ok(self)
    }
}

impl Config {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn backlog(&self) -> u32 {
        self.backlog
    }

    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn uploads_dir(&self) -> &str {
        &self.uploads_dir
    }
}

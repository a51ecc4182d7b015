// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # httpcore 服务器入口
//!
//! 启动顺序：初始化日志 → 载入配置并应用命令行参数 → 组装路由表 → 启动服务器。
//! 命令行：`httpcore [port] [host] [thread_count]`，任何非法参数都会使进程以非零状态退出。

use httpcore::{handlers::configure_router, Config, Exception, Server};

use log::{error, info, LevelFilter};
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
};
use std::{env, path::Path, process};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const SERVER_CONFIG: &str = "config/server.toml";

fn main() {
    init_logging();

    if let Err(e) = start() {
        error!("服务器启动失败：{}", e);
        eprintln!("httpcore: {}", e);
        process::exit(1);
    }
}

fn start() -> Result<(), Exception> {
    let config = if Path::new(SERVER_CONFIG).exists() {
        let config = Config::from_toml(SERVER_CONFIG)?;
        info!("配置文件{}已载入", SERVER_CONFIG);
        config
    } else {
        Config::new()
    };
    let args: Vec<String> = env::args().skip(1).collect();
    let config = config.with_args(&args)?;
    info!("www root: {}", config.www_root());

    let router = configure_router(&config)?;
    info!("路由表已就绪，共{}条路由", router.len());

    Server::new(config, router).run()?;
    info!("服务器已关闭");
    Ok(())
}

/// 优先读取 YAML 日志配置，文件不存在或无效时退回到控制台输出。
fn init_logging() {
    if Path::new(LOG_CONFIG).exists() {
        match log4rs::init_file(LOG_CONFIG, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("无法载入日志配置{}：{}", LOG_CONFIG, e),
        }
    }

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(
            "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}",
        )))
        .build();
    let config = log4rs::Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info));
    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("无法初始化日志系统：{}", e);
            }
        }
        Err(e) => eprintln!("日志配置无效：{}", e),
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接接收器与工作线程池
//!
//! 基于 Tokio 多线程运行时：运行时的 N 个工作线程即工作线程池，
//! 接收循环只负责 `accept` 并为每个连接派生一个任务，从不解析或路由。
//!
//! ## 连接状态机
//! `Accepted → HeadersRead → Parsed | ParseFailed → Routed → Responded → Closed`
//!
//! - 任何状态（包括出错）最终都会到达 `Closed`，套接字总会被关闭。
//! - `ParseFailed` 直接合成 400 响应（不经过路由器）后进入 `Responded`。
//! - 每个连接恰好一个响应，随后关闭，无论请求是否要求 keep-alive。
//!
//! 读写都没有超时：一个永远不发送空行或承诺字节的客户端会一直占用它的任务。

use crate::{
    config::Config,
    exception::Exception,
    param::{HttpStatus, DEFAULT_VERSION},
    parser::{parse, read_head},
    request::Request,
    response::Response,
    router::Router,
};
use log::{debug, error, info, warn};
use std::{
    future::Future,
    io,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::{lookup_host, TcpListener, TcpSocket},
    runtime::Builder,
    task,
};

/// `accept` 失败后的等待时间，避免 EMFILE 之类的持续错误空转
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// 单个连接所经历的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    HeadersRead,
    Parsed,
    ParseFailed,
    Routed,
    Responded,
    Closed,
}

struct Connection {
    id: u128,
    router: Arc<Router>,
    history: Vec<ConnectionState>,
}

impl Connection {
    fn new(id: u128, router: Arc<Router>) -> Self {
        Self {
            id,
            router,
            history: vec![ConnectionState::Accepted],
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        debug!("[ID{}]{:?} -> {:?}", self.id, self.state(), next);
        self.history.push(next);
    }

    fn state(&self) -> ConnectionState {
        self.history
            .last()
            .copied()
            .unwrap_or(ConnectionState::Accepted)
    }

    /// 读取 → 解析 → 路由 → 写回。返回错误时连接被中止（不再写任何字节）。
    async fn process<R, W>(&mut self, reader: &mut R, writer: &mut W) -> Result<(), Exception>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let start_time = Instant::now();
        let id = self.id;

        let head = read_head(reader, id).await;
        let response = match head {
            Ok(None) => {
                debug!("[ID{}]客户端未发送请求即关闭连接", id);
                return Ok(());
            }
            Ok(Some((request_line, raw_headers))) => {
                self.transition(ConnectionState::HeadersRead);
                match parse(&request_line, &raw_headers, reader, id).await {
                    Ok(request) => {
                        self.transition(ConnectionState::Parsed);
                        let request = Arc::new(request);
                        let response = self.dispatch(Arc::clone(&request)).await;
                        self.transition(ConnectionState::Routed);
                        info!(
                            "[ID{}] {}, {}, {}, {}, {}, {}, {}ms",
                            id,
                            request.version(),
                            request.path(),
                            request.verb(),
                            response.status_code(),
                            response.information(),
                            request.user_agent(),
                            start_time.elapsed().as_millis()
                        );
                        response
                    }
                    Err(e) if e.is_parse_error() => self.reject(e),
                    Err(e) => return Err(e),
                }
            }
            Err(e) if e.is_parse_error() => {
                self.transition(ConnectionState::HeadersRead);
                self.reject(e)
            }
            Err(e) => return Err(e),
        };

        response.write_to(writer).await?;
        self.transition(ConnectionState::Responded);
        debug!("[ID{}]HTTP响应发送完毕", id);
        Ok(())
    }

    /// 处理器是同步的，可能做阻塞文件 I/O，因此放到阻塞线程池中执行
    async fn dispatch(&self, request: Arc<Request>) -> Response {
        let router = Arc::clone(&self.router);
        let id = self.id;
        let shared = Arc::clone(&request);
        match task::spawn_blocking(move || router.dispatch(&shared, id)).await {
            Ok(response) => response,
            Err(e) => {
                error!("[ID{}]处理器任务异常结束：{}", id, e);
                Response::status_page(HttpStatus::InternalServerError, request.version())
            }
        }
    }

    fn reject(&mut self, e: Exception) -> Response {
        warn!("[ID{}]解析HTTP请求失败：{}，返回400", self.id, e);
        self.transition(ConnectionState::ParseFailed);
        Response::status_page(HttpStatus::BadRequest, DEFAULT_VERSION)
    }
}

/// 处理一个连接的完整生命周期，返回其经历的状态序列（总以 `Closed` 结尾）。
pub async fn handle_connection<S>(stream: S, id: u128, router: Arc<Router>) -> Vec<ConnectionState>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut connection = Connection::new(id, router);

    if let Err(e) = connection.process(&mut reader, &mut write_half).await {
        error!("[ID{}]连接在{:?}状态下中止：{}", id, connection.state(), e);
    }
    if let Err(e) = write_half.shutdown().await {
        debug!("[ID{}]关闭连接时出错：{}", id, e);
    }
    connection.transition(ConnectionState::Closed);
    connection.history
}

/// 接收循环：每个连接派生一个任务。`accept` 失败只影响该次连接。
pub async fn serve(listener: TcpListener, router: Arc<Router>) {
    let listener = &listener;
    accept_loop(move || listener.accept(), router).await
}

async fn accept_loop<A, F, S>(mut accept: A, router: Arc<Router>)
where
    A: FnMut() -> F,
    F: Future<Output = io::Result<(S, SocketAddr)>>,
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut id: u128 = 0;
    loop {
        let (stream, addr) = match accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("接收连接失败：{}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        debug!("[ID{}]新的连接：{}", id, addr);

        tokio::spawn(handle_connection(stream, id, Arc::clone(&router)));
        id += 1; // 增加连接唯一标识序列
    }
}

/// HTTP 服务器：持有不可变配置与只读路由表
pub struct Server {
    config: Config,
    router: Arc<Router>,
}

impl Server {
    pub fn new(config: Config, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// 解析监听地址并以配置的 backlog 绑定端口。
    ///
    /// 地址无法解析时返回 [`Exception::StartupHostResolutionFailure`]。
    pub async fn bind(&self) -> Result<TcpListener, Exception> {
        let host = self.config.host();
        let port = self.config.port();
        let addr: SocketAddr = match lookup_host((host, port)).await {
            Ok(mut addrs) => addrs.next(),
            Err(e) => {
                error!("无法解析监听地址{}：{}", host, e);
                None
            }
        }
        .ok_or(Exception::StartupHostResolutionFailure)?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr).map_err(|e| {
            error!("无法绑定地址：{}，错误：{}", addr, e);
            Exception::from(e)
        })?;
        let listener = socket.listen(self.config.backlog())?;
        info!("服务端在{}上监听Socket连接", listener.local_addr()?);
        Ok(listener)
    }

    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    /// 构建固定大小的运行时并阻塞运行，直到收到 Ctrl-C。
    pub fn run(self) -> Result<(), Exception> {
        let worker_threads = self.config.worker_threads();
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()?;
        info!("工作线程池容量：{}", worker_threads);

        runtime.block_on(async {
            let listener = self.bind().await?;
            tokio::select! {
                _ = serve(listener, self.router()) => {}
                signal = tokio::signal::ctrl_c() => match signal {
                    Ok(()) => info!("收到停机信号，停止接收新连接"),
                    Err(e) => error!("无法监听停机信号：{}", e),
                },
            }
            Ok(())
        })
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 异步静态内容 Web 服务器
//!
//! 该模块实现了基于 Tokio 运行时的内存镜像静态内容服务器。
//! 核心功能包括：
//! - 目录子树的全量内存镜像与按文件系统事件驱动的后台刷新
//! - 完整的 HTTP 条件请求语义（ETag / Last-Modified / 304 / 412 / HEAD）
//! - 支持多线程异步 I/O 处理
//! - 灵活的忽略规则（内置点号文件规则 + 配置文件正则）
//! - 后台管理控制台（CLI 指令交互）与优雅停机

#![allow(clippy::unused_io_amount)]

// --- 模块定义 ---
mod conditional; // 条件请求判定
mod config;      // 配置解析与管理
mod exception;   // 自定义异常与错误处理
mod ignore;      // 镜像忽略规则
mod mirror;      // 目录内存镜像
mod param;       // 全局常量与静态参数
mod request;     // HTTP 请求报文解析器
mod response;    // HTTP 响应报文构建器
mod serve;       // 镜像服务中间件
mod util;        // 通用工具函数
mod watch;       // 文件系统监听与后台刷新

use config::Config;
use exception::Exception;
use ignore::IgnoreFilter;
use mirror::DirectoryMirror;
use param::HttpRequestMethod;
use request::Request;
use response::Response;
use serve::{ServeMirror, ServeOptions};
use watch::MirrorWatcher;

use log::{debug, error, info, warn};
use log4rs;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    runtime::Builder,
    sync::watch as watch_channel,
};

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::{Arc, Mutex},
    time::Instant,
};

/// # 程序入口点
///
/// 初始化系统环境、加载配置、建立目录镜像并启动主事件循环。
#[tokio::main]
async fn main() {
    // 1. 初始化日志系统：采用 log4rs 异步日志架构，通过外部 YAML 灵活配置级别与输出目的地
    log4rs::init_file("config/log4rs.yaml", Default::default()).unwrap();

    // 2. 环境配置加载：从 TOML 文件读取运行参数
    let config = Config::from_toml("config/development.toml");
    info!("配置文件已载入");
    let root = config.www_root().to_string();
    info!("www root: {}", &root);

    // 3. 异步运行时定制：根据配置文件动态分配工作线程数，实现 CPU 绑定的并发优化
    let worker_threads = config.worker_threads();
    let runtime = Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .build()
        .unwrap();

    // 4. 镜像初始化：
    // - 忽略规则编译失败属于配置错误，立刻终止（快速失败）
    // - 根目录不可读对服务层是致命的，同样终止启动
    let ignore = match IgnoreFilter::from_patterns(config.ignore_patterns()) {
        Ok(filter) => filter,
        Err(e) => {
            error!("忽略规则配置非法：{}", e);
            panic!("忽略规则配置非法：{}", e);
        }
    };
    let mirror = match DirectoryMirror::initialize(&root, ignore) {
        Ok(mirror) => Arc::new(mirror),
        Err(e) => {
            error!("目录镜像初始化失败：{}", e);
            panic!("目录镜像初始化失败：{}", e);
        }
    };
    info!("目录镜像初始化完成，共收录{}个文件", mirror.len());

    // 5. 订阅文件系统变更，启动后台刷新任务
    let watcher = match MirrorWatcher::new(mirror.root()) {
        Ok(watcher) => watcher,
        Err(e) => {
            error!("文件系统监听初始化失败：{}", e);
            panic!("文件系统监听初始化失败：{}", e);
        }
    };
    let (watch_shutdown_tx, watch_shutdown_rx) = watch_channel::channel(false);
    runtime.spawn(watch::run(
        Arc::clone(&mirror),
        watcher,
        watch_shutdown_rx,
    ));
    info!("后台镜像刷新任务已启动");

    let serve = Arc::new(ServeMirror::new(Arc::clone(&mirror), ServeOptions::new()));

    // 6. 网络层初始化：
    // 支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
    let port: u16 = config.port();
    info!("服务端将在{}端口上监听Socket连接", port);
    let address = match config.local() {
        true => Ipv4Addr::new(127, 0, 0, 1),
        false => Ipv4Addr::new(0, 0, 0, 0),
    };
    info!("服务端将在{}地址上监听Socket连接", address);
    let socket = SocketAddrV4::new(address, port);

    // 绑定端口并启动监听器
    let listener = match TcpListener::bind(socket).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("无法绑定端口：{}，错误：{}", port, e);
            panic!("无法绑定端口：{}，错误：{}", port, e);
        }
    };
    info!("端口{}绑定完成", port);

    // 7. 服务器状态与生命周期管理
    // shutdown_flag: 用于优雅停机 (Graceful Shutdown)
    // active_connection: 原子追踪当前并发连接数
    let shutdown_flag = Arc::new(Mutex::new(false));
    let active_connection = Arc::new(Mutex::new(0u32));

    // 8. 启动交互式管理控制台任务
    // 该任务运行在后台，不阻塞监听循环，提供运维指令支持
    runtime.spawn({
        let shutdown_flag = Arc::clone(&shutdown_flag);
        let active_connection = Arc::clone(&active_connection);
        let mirror = Arc::clone(&mirror);
        async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin);
            let mut input = String::new();
            loop {
                input.clear();
                if let Ok(_) = reader.read_line(&mut input).await {
                    let cmd = input.trim();
                    match cmd {
                        "stop" => {
                            let mut flag = shutdown_flag.lock().unwrap();
                            *flag = true;
                            println!("停机指令已激活，服务器将在处理完下一个请求后关闭...");
                            break;
                        }
                        "help" => {
                            println!("== Livedir Help ==");
                            println!("stop   - 发出停机信号");
                            println!("status - 查看当前服务器运行状态");
                            println!("help   - 显示此帮助信息");
                            println!("==================");
                        }
                        "status" => {
                            let active_count = *active_connection.lock().unwrap();
                            println!("== Livedir 状态 ===");
                            println!("当前活跃连接数: {}", active_count);
                            println!("镜像条目数: {}", mirror.len());
                            println!("===================");
                        }
                        _ => {
                            println!("无效的命令：{}", cmd);
                        }
                    }
                } else {
                    break;
                }
            }
        }
    });

    let mut id: u128 = 0;

    // 9. 主事件循环 (Accept Loop)
    // 持续接收新连接并将其分发至 Tokio 线程池进行异步处理
    loop {
        // 检查停机标志位
        if *shutdown_flag.lock().unwrap() {
            info!("主循环接收到停机指令，正在退出...");
            break;
        }

        // 等待新的 TCP 连接
        let (mut stream, addr) = listener.accept().await.unwrap();
        debug!("新的连接：{}", addr);

        // 为每个连接克隆资源句柄（Arc 引用计数增加）
        let active_connection_arc = Arc::clone(&active_connection);
        let serve_arc = Arc::clone(&serve);

        debug!("[ID{}]TCP连接已建立", id);

        // 使用轻量级绿色线程处理具体请求，确保非阻塞 IO
        tokio::spawn(async move {
            {
                // 连接计数加 1
                let mut lock = active_connection_arc.lock().unwrap();
                *lock += 1;
            }

            // 核心业务处理
            handle_connection(&mut stream, id, serve_arc).await;

            {
                // 处理完成后连接计数减 1
                let mut lock = active_connection_arc.lock().unwrap();
                *lock -= 1;
            }
        });
        id += 1; // 增加请求唯一标识序列
    }

    // 10. 停机收尾：通知后台刷新任务退出，释放监听句柄
    let _ = watch_shutdown_tx.send(true);
    info!("已通知镜像刷新任务停止");
}

/// # 连接处理器
///
/// 负责单个 TCP 流的生命周期，包括读取解析请求、交给镜像服务中间件、
/// 以及在中间件穿透时执行兜底路由（204 / 405 / 404）。
async fn handle_connection(stream: &mut TcpStream, id: u128, serve: Arc<ServeMirror>) {
    let mut buffer = vec![0; 4096];

    // 等待流进入可读状态
    stream.readable().await.unwrap();

    // 尝试非阻塞读取 HTTP 报文
    match stream.try_read(&mut buffer) {
        Ok(0) => return, // 客户端主动关闭连接
        Err(e) => {
            error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
            return;
        }
        _ => {}
    }
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();

    // 1. 协议解析阶段：将字节流转换为结构化的 Request 对象
    let request = match Request::try_from(&buffer, id) {
        Ok(req) => req,
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败: {:?}", id, e);
            let response = "HTTP/1.1 400 Bad Request\r\nContent-Length: 11\r\n\r\nBad Request";
            let _ = stream.write_all(response.as_bytes()).await;
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求", id);

    // 2. 镜像服务阶段：中间件命中则直接得到最终响应（200 / 304 / 412）
    let response = match serve.handle(&request, id) {
        Some(response) => response,
        // 3. 穿透兜底：镜像无此条目或方法不适用，由下游路由决定
        None => match request.method() {
            HttpRequestMethod::Options => {
                debug!("[ID{}]请求方法为OPTIONS", id);
                Response::response_204()
            }
            HttpRequestMethod::Post => {
                warn!("[ID{}]不支持的资源方法：{}，返回405", id, request.method());
                Response::response_405()
            }
            HttpRequestMethod::Get | HttpRequestMethod::Head => {
                if request.path().contains("..") {
                    warn!(
                        "[ID{}]{}：{}，返回400",
                        id,
                        Exception::InvalidPath,
                        request.path()
                    );
                    Response::response_400()
                } else {
                    warn!("[ID{}]请求的路径：{} 不存在，返回404", id, request.path());
                    Response::response_404()
                }
            }
        },
    };

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    // 4. 结构化日志记录：便于后期审计与性能监控
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}, ",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    // 5. 数据发送阶段：镜像内容全部驻留内存，一次性写出即可
    let response_bytes = response.as_bytes();
    debug!("[ID{}]发送响应，长度: {}", id, response_bytes.len());
    let _ = stream.write_all(&response_bytes).await;
    let _ = stream.flush().await;
}

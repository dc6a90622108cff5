// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了 Web 服务器在请求处理与镜像维护生命周期中可能抛出的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖了协议解析错误、镜像初始化错误以及后台刷新过程中的文件系统错误。
//! - **语义映射**：每个变体都对应了特定的业务逻辑，便于上层模块将其转化为对应的 HTTP 响应状态码，
//!   或在启动阶段直接终止进程（快速失败）。
//! - **用户友好**：通过实现 `std::fmt::Display`，确保错误信息可以被安全地记录到日志中。
//!
//! 注意：单个请求的 304 / 412 / 未命中穿透等结果属于协议的正常控制流，
//! 不会以 `Exception` 的形式出现。

use std::fmt;

/// 服务器处理请求或维护目录镜像过程中发生的异常类型。
///
/// 该枚举通常作为 `Result` 的 `Err` 部分返回，用于指示处理失败的具体原因。
#[derive(Debug, Clone)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    /// 这通常发生在请求头或正文包含非法字符时。
    RequestIsNotUtf8,
    /// 客户端使用了服务器暂不支持的 HTTP 方法。
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本（例如：HTTP/0.9 或过高的版本）。
    UnsupportedHttpVersion,
    /// 请求的路径格式非法或包含越权尝试（如目录遍历攻击）。对应 `400 Bad Request`。
    InvalidPath,
    /// 镜像根目录在启动时不存在或不可读。该错误对服务层是致命的，应当中止启动。
    MirrorInitFailed(String),
    /// 配置的忽略规则（正则表达式）无法编译。在构造阶段立刻暴露，而不是等到第一个请求。
    InvalidIgnorePattern(String),
    /// 后台刷新时读取文件失败（瞬时 I/O 错误）。内部错误，不致命：
    /// 记录日志后保留既有条目，等待该路径的下一次变更事件重试。
    RefreshIoFailed(String),
}

use Exception::*;

/// 为 `Exception` 实现 `Display` 特性，使其支持字符串格式化输出。
///
/// 工业实践中，这些描述信息常用于系统日志（Logging）以及启动失败时的终端输出。
impl fmt::Display for Exception {
    /// 根据错误类型写入人类可读的描述文本。
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            UnSupportedRequestMethod => write!(f, "Unsupported request method"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            InvalidPath => write!(f, "Invalid path (400)"),
            MirrorInitFailed(detail) => write!(f, "Mirror initialization failed: {}", detail),
            InvalidIgnorePattern(pattern) => write!(f, "Invalid ignore pattern: {}", pattern),
            RefreshIoFailed(detail) => write!(f, "Mirror refresh I/O failed: {}", detail),
        }
    }
}

// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 该模块是 Web 服务器的核心组件之一，负责将 TCP 流中读取的原始字节码
//! 解析为强类型的 `Request` 结构体。它涵盖了：
//! 1. 请求行（Request-Line）的解析（方法、路径、版本）。
//! 2. 常用 HTTP 标头（Headers）的提取。
//! 3. 条件请求校验头（`If-None-Match` / `If-Modified-Since` /
//!    `If-Match` / `If-Unmodified-Since`）的提取与日期解析。

use std::time::SystemTime;

use crate::conditional::RequestValidators;
use crate::util::parse_http_date;
use crate::{exception::Exception, param::*};
use log::error;

/// 表示一个完整的 HTTP 请求元数据。
///
/// 该结构体不包含请求体（Body）的大数据部分，主要用于路由分发与条件判定。
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP 请求方法（GET, POST 等）
    method: HttpRequestMethod,
    /// 请求的资源路径（包含查询字符串）
    path: String,
    /// HTTP 协议版本
    version: HttpVersion,
    /// 客户端标识字符串
    user_agent: String,
    /// `If-None-Match` 校验头的原始值
    if_none_match: Option<String>,
    /// `If-Match` 校验头的原始值
    if_match: Option<String>,
    /// `If-Modified-Since` 校验头解析后的时间（非法日期视同缺失）
    if_modified_since: Option<SystemTime>,
    /// `If-Unmodified-Since` 校验头解析后的时间（非法日期视同缺失）
    if_unmodified_since: Option<SystemTime>,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 逻辑步骤
    /// 1. 验证编码：确保请求数据是合法的 UTF-8 字符串。
    /// 2. 解析请求行：提取方法、路径和协议版本。
    /// 3. 迭代解析标头：识别并解析 `User-Agent` 以及四个条件校验头。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    ///
    /// # 错误处理
    /// 如果请求格式不符合 HTTP 规范或使用了不支持的方法/版本，将返回相应的 `Exception`。
    pub fn try_from(buffer: &Vec<u8>, id: u128) -> Result<Self, Exception> {
        // 1. 将字节流转换为字符串，失败则判定为非法的 HTTP 请求
        let request_string = match String::from_utf8(buffer.to_vec()) {
            Ok(string) => string,
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let request_lines: Vec<&str> = request_string.split(CRLF).collect();

        // 2. 解析请求行 (e.g., "GET /index.html HTTP/1.1")
        let first_line_parts: Vec<&str> = request_lines[0].split(" ").collect();

        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, request_lines[0]);
            return Err(Exception::UnSupportedRequestMethod);
        }

        // 解析方法名
        let method_str = first_line_parts[0].to_uppercase();
        let method = match method_str.as_str() {
            "GET" => HttpRequestMethod::Get,
            "HEAD" => HttpRequestMethod::Head,
            "OPTIONS" => HttpRequestMethod::Options,
            "POST" => HttpRequestMethod::Post,
            _ => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, &method_str);
                return Err(Exception::UnSupportedRequestMethod);
            }
        };

        // 解析协议版本
        let version_str = first_line_parts.last().unwrap().to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 解析路径（考虑到路径中可能包含空格的情况，虽然不规范但通过 join 尝试恢复）
        let path = if first_line_parts.len() == 3 {
            first_line_parts[1].to_string()
        } else {
            first_line_parts[1..first_line_parts.len() - 1].join(" ")
        };

        // 3. 迭代各行解析 Headers
        let mut user_agent = "".to_string();
        let mut if_none_match = None;
        let mut if_match = None;
        let mut if_modified_since = None;
        let mut if_unmodified_since = None;
        for line in &request_lines {
            let line_lower = line.to_lowercase();
            // 处理 User-Agent
            if line_lower.starts_with("user-agent:") {
                if let Some(val) = line.split(": ").nth(1) {
                    user_agent = val.to_string();
                }
            }
            // 处理条件校验头 (RFC 9110 §13)
            // ETag 类校验头保留原始令牌；日期类校验头立即解析，
            // 解析失败的日期按规范要求当作该头不存在。
            else if line_lower.starts_with("if-none-match:") {
                if let Some(val) = line.split(": ").nth(1) {
                    if_none_match = Some(val.trim().to_string());
                }
            } else if line_lower.starts_with("if-match:") {
                if let Some(val) = line.split(": ").nth(1) {
                    if_match = Some(val.trim().to_string());
                }
            } else if line_lower.starts_with("if-modified-since:") {
                if let Some(val) = line.split(": ").nth(1) {
                    if_modified_since = parse_http_date(val.trim());
                }
            } else if line_lower.starts_with("if-unmodified-since:") {
                if let Some(val) = line.split(": ").nth(1) {
                    if_unmodified_since = parse_http_date(val.trim());
                }
            }
        }

        Ok(Self {
            method,
            path,
            version,
            user_agent,
            if_none_match,
            if_match,
            if_modified_since,
            if_unmodified_since,
        })
    }

    /// 以借用形式汇总四个校验头，供条件判定模块使用
    pub fn validators(&self) -> RequestValidators<'_> {
        RequestValidators {
            if_match: self.if_match.as_deref(),
            if_none_match: self.if_none_match.as_deref(),
            if_modified_since: self.if_modified_since,
            if_unmodified_since: self.if_unmodified_since,
        }
    }
}

// --- Getter 访问器实现 ---

impl Request {
    /// 获取 HTTP 协议版本
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取请求方法
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 获取用户代理字符串
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// 获取 `If-None-Match` 校验头
    pub fn if_none_match(&self) -> Option<&str> {
        self.if_none_match.as_deref()
    }

    /// 获取 `If-Match` 校验头
    pub fn if_match(&self) -> Option<&str> {
        self.if_match.as_deref()
    }

    /// 获取解析后的 `If-Modified-Since` 时间
    pub fn if_modified_since(&self) -> Option<SystemTime> {
        self.if_modified_since
    }

    /// 获取解析后的 `If-Unmodified-Since` 时间
    pub fn if_unmodified_since(&self) -> Option<SystemTime> {
        self.if_unmodified_since
    }
}

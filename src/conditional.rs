// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 条件请求判定模块
//!
//! 该模块实现 HTTP 条件请求（Conditional GET）的判定逻辑：
//! 给定资源当前的校验值（ETag 与最后修改时间）和请求携带的校验头，
//! 决定响应应当采用的形态。
//!
//! ## 判定顺序（与 HTTP 缓存互操作所必需）
//! 1. 先决条件（`If-Match` / `If-Unmodified-Since`）最先判定，失败即 412，
//!    不再考虑新鲜度，即使 `If-None-Match` 本可命中 304。
//! 2. 两类校验中 ETag 均优先于时间戳：`If-Unmodified-Since` 只在没有
//!    `If-Match` 时参与判定，`If-Modified-Since` 只在没有 `If-None-Match`
//!    时参与判定。
//! 3. 时间戳按 HTTP 的1秒分辨率比较，亚秒差异不会产生虚假的"已修改"。
//!
//! 本模块完全无状态，不接触镜像，也不产生副作用。

use std::time::SystemTime;

use crate::util::unix_seconds;

/// 条件判定的结果：响应应当采用的形态。
///
/// 三种形态都是协议的正常结果，不是错误。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Disposition {
    /// 发送完整响应体（HEAD 请求时仍为 200，只是省略响应体）。
    Full,
    /// 资源相对客户端持有的版本未变化，返回 304，省略响应体。
    NotModified,
    /// 客户端声明的先决条件不再成立，返回 412，省略响应体。
    PreconditionFailed,
}

/// 请求携带的校验头集合。
///
/// 日期头在解析阶段已转换为 `SystemTime`；携带非法日期的头按 RFC 要求
/// 视同缺失（此处为 `None`）。
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidators<'a> {
    /// `If-Match` 原始值（逗号分隔的 ETag 列表或 `*`）
    pub if_match: Option<&'a str>,
    /// `If-None-Match` 原始值（逗号分隔的 ETag 列表或 `*`）
    pub if_none_match: Option<&'a str>,
    /// `If-Modified-Since` 解析后的时间
    pub if_modified_since: Option<SystemTime>,
    /// `If-Unmodified-Since` 解析后的时间
    pub if_unmodified_since: Option<SystemTime>,
}

impl<'a> RequestValidators<'a> {
    /// 请求是否携带了任何校验头
    pub fn is_conditional(&self) -> bool {
        self.if_match.is_some()
            || self.if_none_match.is_some()
            || self.if_modified_since.is_some()
            || self.if_unmodified_since.is_some()
    }
}

/// 根据资源当前的校验值判定响应形态。
///
/// `etag` 与 `last_modified` 是响应最终生效的校验值：
/// 若自定义标头钩子覆盖了默认值，传入的应当是覆盖后的值。
pub fn evaluate(
    validators: &RequestValidators,
    etag: &str,
    last_modified: SystemTime,
) -> Disposition {
    // 1. 先决条件检查，失败短路到412
    if let Some(if_match) = validators.if_match {
        if !etag_list_matches(if_match, etag) {
            return Disposition::PreconditionFailed;
        }
    } else if let Some(unmodified_since) = validators.if_unmodified_since {
        if unix_seconds(last_modified) > unix_seconds(unmodified_since) {
            return Disposition::PreconditionFailed;
        }
    }

    // 2. 新鲜度检查：If-None-Match存在时独占判定，不再回退到时间戳
    if let Some(if_none_match) = validators.if_none_match {
        if etag_list_matches(if_none_match, etag) {
            return Disposition::NotModified;
        }
        return Disposition::Full;
    }
    if let Some(modified_since) = validators.if_modified_since {
        if unix_seconds(last_modified) <= unix_seconds(modified_since) {
            return Disposition::NotModified;
        }
    }

    Disposition::Full
}

// ETag按不透明令牌做精确相等比较；"*"匹配任何现存资源
fn etag_list_matches(header_value: &str, etag: &str) -> bool {
    header_value
        .split(',')
        .map(str::trim)
        .any(|token| token == "*" || token == etag)
}

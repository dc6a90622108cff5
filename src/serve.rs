// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 镜像服务中间件模块
//!
//! 该模块是请求处理的入口：按方法过滤请求，在目录镜像中查找条目，
//! 执行条件请求判定，并产出最终响应。
//!
//! ## 处理流程
//! 1. 非 GET/HEAD 请求直接穿透（返回 `None`），不触碰镜像。
//! 2. 路径在当前快照中无条目时同样穿透，由下游处理器决定（通常是 404）。
//! 3. 命中条目后先执行调用方提供的自定义标头钩子，再填充默认的
//!    `Last-Modified` / `ETag` / `Content-Type`，钩子设置过的值不会被覆盖。
//! 4. 条件判定产出 412 / 304 / 仅标头（HEAD）/ 完整响应体四种结果之一。
//!
//! 该层对镜像只读，除响应本身外没有任何副作用。

use std::sync::Arc;

use log::debug;

use crate::conditional::{evaluate, Disposition};
use crate::mirror::DirectoryMirror;
use crate::param::{HttpRequestMethod, HTML_INDEX};
use crate::request::Request;
use crate::response::Response;

/// 自定义标头钩子：在默认标头填充之前执行，可写入任意响应标头。
/// 钩子写入的 `ETag` / `Last-Modified` 同时决定条件判定使用的校验值。
pub type HeaderHook = Arc<dyn Fn(&Request, &mut Response) + Send + Sync>;

/// 服务中间件的构造期选项。
#[derive(Clone, Default)]
pub struct ServeOptions {
    header_hook: Option<HeaderHook>,
}

impl ServeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册自定义标头钩子
    pub fn with_header_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Request, &mut Response) + Send + Sync + 'static,
    {
        self.header_hook = Some(Arc::new(hook));
        self
    }
}

/// 面向目录镜像的静态内容服务中间件。
pub struct ServeMirror {
    mirror: Arc<DirectoryMirror>,
    options: ServeOptions,
}

impl ServeMirror {
    pub fn new(mirror: Arc<DirectoryMirror>, options: ServeOptions) -> Self {
        Self { mirror, options }
    }

    pub fn mirror(&self) -> &Arc<DirectoryMirror> {
        &self.mirror
    }

    /// 处理一次请求。`None` 表示穿透：未命中或方法不适用，交给下游处理器。
    pub fn handle(&self, request: &Request, id: u128) -> Option<Response> {
        // 只处理两个只读方法
        if request.method() != HttpRequestMethod::Get
            && request.method() != HttpRequestMethod::Head
        {
            return None;
        }

        let key = mirror_key(request.path())?;
        let entry = self.mirror.get(&key)?;
        debug!("[ID{}]镜像命中: {} (etag {})", id, key, entry.etag());

        let mut response = Response::new();

        // 钩子先行：操作方指定的标头永远优先，默认值只填补空缺
        if let Some(hook) = &self.options.header_hook {
            hook(request, &mut response);
        }
        if !response.has_header("Last-Modified") {
            response.set_last_modified(entry.last_modified());
        }
        if !response.has_header("ETag") {
            response.set_etag(entry.etag());
        }
        if !response.has_header("Content-Type") {
            response.set_content_type(entry.media_type());
        }

        // 条件判定使用响应最终生效的校验值（钩子覆盖后即以覆盖值为准）
        let etag = response
            .etag()
            .map(str::to_string)
            .unwrap_or_else(|| entry.etag().to_string());
        let last_modified = response.last_modified().unwrap_or(entry.last_modified());

        match evaluate(&request.validators(), &etag, last_modified) {
            Disposition::PreconditionFailed => {
                debug!("[ID{}]先决条件不成立: {}", id, key);
                response.set_code(412);
                response.clear_content();
            }
            Disposition::NotModified => {
                debug!("[ID{}]资源未修改: {}", id, key);
                response.set_code(304);
                response.clear_content();
            }
            Disposition::Full => {
                response.set_code(200);
                if request.method() == HttpRequestMethod::Head {
                    // HEAD：与GET完全一致的标头，仅省略响应体
                    response.set_content_length_only(entry.content().len() as u64);
                } else {
                    response.set_content(entry.content().clone());
                }
            }
        }

        Some(response)
    }
}

// 请求路径到镜像键的转换：去掉查询串与前导'/'，根路径映射到索引页。
// 含".."的路径不可能匹配镜像键，直接穿透，顺便挡掉目录遍历尝试。
fn mirror_key(path: &str) -> Option<String> {
    let path = path.split('?').next().unwrap_or(path);
    let path = path.strip_prefix('/')?;
    if path.split('/').any(|segment| segment == "..") {
        return None;
    }
    if path.is_empty() {
        return Some(HTML_INDEX.to_string());
    }
    Some(path.to_string())
}

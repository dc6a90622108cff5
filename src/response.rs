use crate::{
    param::*,
    util::{format_http_date, HtmlBuilder},
};

use bytes::Bytes;
use chrono::prelude::*;
use log::error;

use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    server_name: String,
    allow: Option<Vec<HttpRequestMethod>>,
    etag: Option<String>,
    last_modified: Option<SystemTime>,
    // 自定义标头钩子写入的其余标头，按设置顺序输出
    custom_headers: Vec<(String, String)>,
    content: Option<Bytes>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            allow: None,
            etag: None,
            last_modified: None,
            custom_headers: Vec::new(),
            content: None,
        }
    }

    fn from_status_code(code: u16) -> Self {
        let mut response = Self::new();
        if code == 204 {
            response.allow = Some(ALLOWED_METHODS.to_vec());
            response.set_code(code);
            return response;
        }
        let content = match code {
            404 => HtmlBuilder::from_status_code(404, Some(
                r"<h2>噢！</h2><p>你指定的网页无法找到。</p>"
            )),
            405 => HtmlBuilder::from_status_code(405, Some(
                r"<h2>噢！</h2><p>本服务器的静态资源仅支持GET和HEAD方法。</p>"
            )),
            500 => HtmlBuilder::from_status_code(500, Some(
                r"<h2>噢！</h2><p>服务器出现了一个内部错误。</p>"
            )),
            _ => HtmlBuilder::from_status_code(code, None),
        }.build();
        let bytes = Bytes::from(content.into_bytes());
        response.content_length = bytes.len() as u64;
        response.content = Some(bytes);
        response.content_type = Some("text/html;charset=utf-8".to_string());
        response.set_code(code);
        response
    }

    fn set_date(&mut self) -> &mut Self {
        self.date = Utc::now();
        self
    }

    fn set_version(&mut self) -> &mut Self {
        self.version = HttpVersion::V1_1;
        self
    }

    fn set_server_name(&mut self) -> &mut Self {
        self.server_name = SERVER_NAME.to_string();
        self
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&information) => information.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                panic!();
            }
        };
        self
    }

    pub fn response_404() -> Self {
        Self::from_status_code(404)
            .set_date()
            .set_version()
            .set_server_name()
            .to_owned()
    }

    pub fn response_400() -> Self {
        Self::from_status_code(400)
            .set_date()
            .set_version()
            .set_server_name()
            .to_owned()
    }

    pub fn response_405() -> Self {
        Self::from_status_code(405)
            .set_date()
            .set_version()
            .set_server_name()
            .to_owned()
    }

    pub fn response_204() -> Self {
        Self::from_status_code(204)
            .set_date()
            .set_version()
            .set_server_name()
            .to_owned()
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let status_code: &str = &self.status_code.to_string();
        let information: &str = &self.information;
        let content_length: &str = &self.content_length.to_string();
        let date: &str = &format_date(&self.date);
        let server: &str = &self.server_name;

        let mut custom = String::new();
        for (name, value) in &self.custom_headers {
            custom.push_str(name);
            custom.push_str(": ");
            custom.push_str(value);
            custom.push_str(CRLF);
        }

        let header = [
            version,
            " ",
            status_code,
            " ",
            information,
            CRLF,
            match &self.content_type {
                Some(t) => ["Content-Type: ", t, CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            "Content-Length: ",
            content_length,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Server: ",
            server,
            CRLF,
            match &self.etag {
                Some(etag) => ["ETag: ", etag, CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            match self.last_modified {
                Some(time) => ["Last-Modified: ", &format_http_date(time), CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            custom.as_str(),
            match &self.allow {
                Some(a) => {
                    let mut allow_str = String::new();
                    for (index, method) in a.iter().enumerate() {
                        allow_str.push_str(&format!("{}", method));
                        if index < a.len() - 1 {
                            allow_str.push_str(", ");
                        }
                    }
                    ["Allow: ", &allow_str, CRLF].concat()
                }
                None => "".to_string(),
            }
            .as_str(),
            CRLF,
        ]
        .concat();
        [
            header.as_bytes(),
            match &self.content {
                Some(c) => c,
                None => b"",
            },
        ]
        .concat()
    }
}

// --- 服务层使用的标头与内容访问器 ---

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn set_etag(&mut self, etag: impl Into<String>) {
        self.etag = Some(etag.into());
    }

    pub fn set_last_modified(&mut self, time: SystemTime) {
        self.last_modified = Some(time);
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// 设置完整响应体，同时更新 `Content-Length`
    pub fn set_content(&mut self, content: Bytes) {
        self.content_length = content.len() as u64;
        self.content = Some(content);
    }

    /// 省略响应体但保留 `Content-Length`（HEAD 请求：与 GET 标头完全一致）
    pub fn set_content_length_only(&mut self, length: u64) {
        self.content_length = length;
        self.content = None;
    }

    /// 省略响应体且 `Content-Length` 归零（304 / 412）
    pub fn clear_content(&mut self) {
        self.content_length = 0;
        self.content = None;
    }

    /// 自定义标头钩子的写入口。
    /// `ETag` / `Last-Modified` / `Content-Type` 会路由到对应的类型化字段，
    /// 这样钩子设置过的值能被默认填充逻辑识别并跳过（钩子优先）。
    pub fn set_header(&mut self, name: &str, value: &str) {
        match name.to_ascii_lowercase().as_str() {
            "etag" => self.etag = Some(value.to_string()),
            "last-modified" => {
                match crate::util::parse_http_date(value) {
                    Some(time) => self.last_modified = Some(time),
                    // 无法解析的日期按原样输出，不参与条件判定
                    None => self.push_custom(name, value),
                }
            }
            "content-type" => self.content_type = Some(value.to_string()),
            _ => self.push_custom(name, value),
        }
    }

    /// 标头是否已被设置（类型化字段或自定义列表之一）
    pub fn has_header(&self, name: &str) -> bool {
        match name.to_ascii_lowercase().as_str() {
            "etag" => self.etag.is_some(),
            "last-modified" => {
                self.last_modified.is_some()
                    || self
                        .custom_headers
                        .iter()
                        .any(|(n, _)| n.eq_ignore_ascii_case(name))
            }
            "content-type" => self.content_type.is_some(),
            _ => self
                .custom_headers
                .iter()
                .any(|(n, _)| n.eq_ignore_ascii_case(name)),
        }
    }

    fn push_custom(&mut self, name: &str, value: &str) {
        if let Some(existing) = self
            .custom_headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            existing.1 = value.to_string();
        } else {
            self.custom_headers.push((name.to_string(), value.to_string()));
        }
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

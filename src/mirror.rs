//! # 目录镜像模块
//!
//! 该模块将一个目录子树的全部可服务文件保存在内存中：
//! 每个条目持有文件的原始字节、内容指纹（ETag）、最后修改时间以及媒体类型。
//! 请求路径上的查询是纯内存操作，不会产生任何磁盘 I/O。
//!
//! 磁盘与镜像之间是最终一致的：文件落盘到镜像反映变更之间存在
//! 一段通常很短但无上界的传播延迟，调用方不应假设强一致。

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use bytes::Bytes;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::exception::Exception;
use crate::ignore::IgnoreFilter;
use crate::param::MIME_TYPES;

/// 镜像中的单个可服务文件。
///
/// 条目一旦构建完成即不可变：`etag` 与 `last_modified` 永远描述当前持有的
/// `content`，刷新时整体替换，绝不原位修改字段。
#[derive(Debug, Clone)]
pub struct MirrorEntry {
    relative_path: String,
    content: Bytes,
    last_modified: SystemTime,
    etag: String,
    media_type: &'static str,
}

impl MirrorEntry {
    // 条目在锁外完整构建，构建期间读者仍然看到旧值
    fn build(relative_path: String, content: Vec<u8>, last_modified: SystemTime) -> Self {
        let etag = compute_etag(&content);
        let media_type = media_type_of(&relative_path);
        Self {
            relative_path,
            content: Bytes::from(content),
            last_modified,
            etag,
            media_type,
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// 文件内容的只读视图。调用方不得修改，刷新后也不会自动更新。
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    pub fn etag(&self) -> &str {
        &self.etag
    }

    pub fn media_type(&self) -> &'static str {
        self.media_type
    }
}

/// 根据内容字节计算ETag：SHA-256摘要前16字节的十六进制，外加双引号。
/// 只取决于内容本身，同样的字节在任何一次刷新后都得到同样的ETag。
pub fn compute_etag(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let digest = hasher.finalize();
    format!("\"{}\"", hex::encode(&digest[..16]))
}

// 后缀名查MIME表，未知后缀兜底为二进制流
fn media_type_of(relative_path: &str) -> &'static str {
    let extension = Path::new(relative_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("_");
    match MIME_TYPES.get(extension) {
        Some(v) => v,
        None => "application/octet-stream",
    }
}

/// 目录子树的内存镜像。
///
/// 镜像在启动时做一次全量扫描，之后由后台刷新任务（见 `watch` 模块）
/// 根据文件系统事件逐条替换。条目替换是键级别的原子操作：
/// 替换条目在锁外完整构建，写锁只覆盖一次 `HashMap` 插入或删除，
/// 因此并发读者要么看到刷新前的条目，要么看到刷新后的条目，不存在中间态。
pub struct DirectoryMirror {
    root: PathBuf,
    ignore: IgnoreFilter,
    entries: RwLock<HashMap<String, Arc<MirrorEntry>>>,
}

impl DirectoryMirror {
    /// 全量扫描 `root` 并建立镜像。
    ///
    /// 根目录不存在或不可读返回 `MirrorInitFailed`，调用方应当中止启动。
    /// 扫描期间被忽略规则命中的路径不会产生任何文件读取。
    pub fn initialize(root: impl AsRef<Path>, ignore: IgnoreFilter) -> Result<Self, Exception> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Exception::MirrorInitFailed(format!(
                "{} 不存在或不是目录",
                root.display()
            )));
        }
        let root = root
            .canonicalize()
            .map_err(|e| Exception::MirrorInitFailed(format!("{}: {}", root.display(), e)))?;

        let mut entries = HashMap::new();
        for walked in WalkDir::new(&root) {
            let walked =
                walked.map_err(|e| Exception::MirrorInitFailed(format!("扫描失败: {}", e)))?;
            if !walked.file_type().is_file() {
                continue;
            }
            let relative = match relative_key(&root, walked.path()) {
                Some(key) => key,
                None => continue,
            };
            if ignore.should_ignore(&relative) {
                continue;
            }
            let metadata = walked
                .metadata()
                .map_err(|e| Exception::MirrorInitFailed(format!("{}: {}", relative, e)))?;
            let modified = metadata
                .modified()
                .map_err(|e| Exception::MirrorInitFailed(format!("{}: {}", relative, e)))?;
            let content = fs::read(walked.path())
                .map_err(|e| Exception::MirrorInitFailed(format!("{}: {}", relative, e)))?;
            debug!("镜像收录: {} ({} bytes)", relative, content.len());
            entries.insert(
                relative.clone(),
                Arc::new(MirrorEntry::build(relative, content, modified)),
            );
        }

        Ok(Self {
            root,
            ignore,
            entries: RwLock::new(entries),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 把文件系统事件里的绝对路径换算成镜像键。不在根目录之下返回 `None`。
    pub fn relative_key(&self, absolute: &Path) -> Option<String> {
        relative_key(&self.root, absolute)
    }

    /// O(1) 查询当前快照。未命中返回 `None`（穿透给下游处理器），不是错误。
    ///
    /// 纯内存读取，与正在进行的刷新并发安全，耗时与刷新无关。
    pub fn get(&self, relative_path: &str) -> Option<Arc<MirrorEntry>> {
        let entries = match self.entries.read() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.get(relative_path).cloned()
    }

    pub fn len(&self) -> usize {
        let entries = match self.entries.read() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 刷新路径是否会被忽略规则丢弃。在任何 I/O 之前调用。
    pub fn ignores(&self, relative_path: &str) -> bool {
        self.ignore.should_ignore(relative_path)
    }

    /// 响应一次创建/修改事件：重新读取文件并原子地安装新条目。
    ///
    /// 读取失败时保留既有条目不变：宁可继续服务略旧但完整的内容，
    /// 也不因瞬时 I/O 错误摘除一个可服务的条目；该路径的下一次变更事件会重试。
    /// 文件在事件与读取之间被删除属于终态失败，此时移除条目。
    pub async fn refresh(&self, relative_path: &str) {
        if self.ignores(relative_path) {
            return;
        }
        let absolute = self.root.join(relative_path);

        // 先取元数据：目录事件直接丢弃，消失的文件走移除
        let metadata = match tokio::fs::metadata(&absolute).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.remove(relative_path);
                return;
            }
            Err(e) => {
                warn!(
                    "{}",
                    Exception::RefreshIoFailed(format!("{}: {}，保留现有条目", relative_path, e))
                );
                return;
            }
        };
        if !metadata.is_file() {
            return;
        }
        let modified = match metadata.modified() {
            Ok(time) => time,
            Err(e) => {
                warn!(
                    "{}",
                    Exception::RefreshIoFailed(format!("{}: {}，保留现有条目", relative_path, e))
                );
                return;
            }
        };
        let content = match tokio::fs::read(&absolute).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.remove(relative_path);
                return;
            }
            Err(e) => {
                warn!(
                    "{}",
                    Exception::RefreshIoFailed(format!("{}: {}，保留现有条目", relative_path, e))
                );
                return;
            }
        };

        let entry = Arc::new(MirrorEntry::build(
            relative_path.to_string(),
            content,
            modified,
        ));
        debug!(
            "镜像刷新: {} ({} bytes, etag {})",
            relative_path,
            entry.content().len(),
            entry.etag()
        );
        self.install(entry);
    }

    /// 响应删除事件：移除条目。返回是否确有移除。
    pub fn remove(&self, relative_path: &str) -> bool {
        let mut entries = match self.entries.write() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        let removed = entries.remove(relative_path).is_some();
        if removed {
            debug!("镜像移除: {}", relative_path);
        }
        removed
    }

    // 写锁只覆盖这一次插入，文件读取与哈希全部发生在锁外
    fn install(&self, entry: Arc<MirrorEntry>) {
        let mut entries = match self.entries.write() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.insert(entry.relative_path().to_string(), entry);
    }
}

// 统一使用'/'分隔的相对路径作为镜像键，保证与请求路径可比
fn relative_key(root: &Path, absolute: &Path) -> Option<String> {
    let relative = absolute.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        let segment = component.as_os_str().to_str()?;
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);
    }
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

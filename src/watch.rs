//! # 文件系统监听与后台刷新模块
//!
//! 该模块把磁盘上的变更传播到目录镜像：`notify` 监听器把原始事件
//! 转换成 `WatchEvent` 并推入通道，独立的 tokio 后台任务逐个消费，
//! 重新读取受影响的文件并把完整构建好的条目原子地安装进镜像。
//!
//! 刷新任务与请求处理完全解耦，二者只通过镜像内部的条目级原子替换通信。
//! 任务在收到停机信号后退出，监听句柄随之释放，不留悬挂的 watch 资源。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tokio::sync::{mpsc, watch};

use crate::exception::Exception;
use crate::mirror::DirectoryMirror;

/// 监听器产出的事件
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// 文件被创建
    Created(PathBuf),
    /// 文件被修改
    Modified(PathBuf),
    /// 文件被删除
    Deleted(PathBuf),
    /// 监听过程本身出错
    Error(String),
}

/// 目录镜像的文件系统监听器。
///
/// 原始 notify 回调运行在独立线程上，事件经无界通道转交 tokio 任务消费。
pub struct MirrorWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<WatchEvent>,
}

impl MirrorWatcher {
    /// 订阅 `root` 子树的变更事件。订阅失败对服务层是致命的。
    pub fn new(root: &Path) -> Result<Self, Exception> {
        let (tx, rx) = mpsc::unbounded_channel();
        let tx = Arc::new(tx);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => match event.kind {
                    EventKind::Create(_) => {
                        if let Some(path) = event.paths.first() {
                            WatchEvent::Created(path.clone())
                        } else {
                            return;
                        }
                    }
                    EventKind::Modify(_) => {
                        if let Some(path) = event.paths.first() {
                            WatchEvent::Modified(path.clone())
                        } else {
                            return;
                        }
                    }
                    EventKind::Remove(_) => {
                        if let Some(path) = event.paths.first() {
                            WatchEvent::Deleted(path.clone())
                        } else {
                            return;
                        }
                    }
                    _ => return,
                },
                Err(e) => WatchEvent::Error(e.to_string()),
            };

            let _ = tx.send(event);
        })
        .map_err(|e| Exception::MirrorInitFailed(format!("无法创建文件系统监听器: {}", e)))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| Exception::MirrorInitFailed(format!("无法监听{}: {}", root.display(), e)))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// 等待下一个事件。监听器已关闭时返回 `None`。
    pub async fn next_event(&mut self) -> Option<WatchEvent> {
        self.receiver.recv().await
    }

    /// 非阻塞地尝试取出一个事件
    pub fn try_next_event(&mut self) -> Option<WatchEvent> {
        self.receiver.try_recv().ok()
    }
}

/// 后台刷新任务主循环。
///
/// 持续消费监听事件并应用到镜像，直到停机信号到来或事件通道关闭。
/// 返回时监听器被丢弃，底层 watch 句柄随之释放。
pub async fn run(
    mirror: Arc<DirectoryMirror>,
    mut watcher: MirrorWatcher,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            event = watcher.next_event() => {
                match event {
                    Some(event) => apply_event(&mirror, event).await,
                    None => break,
                }
            }
        }
    }
    info!("镜像刷新任务退出，监听句柄已释放");
}

// 忽略判断先于任何I/O：被排除路径的事件在这里直接丢弃
async fn apply_event(mirror: &DirectoryMirror, event: WatchEvent) {
    match event {
        WatchEvent::Created(path) | WatchEvent::Modified(path) => {
            if let Some(key) = mirror.relative_key(&path) {
                if mirror.ignores(&key) {
                    debug!("忽略规则命中，丢弃变更事件: {}", key);
                    return;
                }
                mirror.refresh(&key).await;
            }
        }
        WatchEvent::Deleted(path) => {
            if let Some(key) = mirror.relative_key(&path) {
                if mirror.ignores(&key) {
                    return;
                }
                mirror.remove(&key);
            }
        }
        WatchEvent::Error(message) => {
            warn!("文件系统监听错误: {}", message);
        }
    }
}

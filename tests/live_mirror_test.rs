// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 镜像与条件服务的进程内端到端测试
//!
//! 该套件不经过网络层，直接驱动目录镜像、文件系统监听任务与服务中间件，
//! 覆盖镜像生命周期（扫描 / 刷新 / 删除）、条件请求语义以及并发一致性。

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use livedir::mirror::compute_etag;
use livedir::{DirectoryMirror, IgnoreFilter, MirrorWatcher, Request, ServeMirror, ServeOptions};

fn request_of(raw: &str) -> Request {
    Request::try_from(&raw.as_bytes().to_vec(), 0).unwrap()
}

/// 轮询等待条件成立。磁盘到镜像的传播是最终一致的，测试只能等待而不能假设即时可见。
async fn eventually<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    condition()
}

#[cfg(test)]
mod mirror_lifecycle_tests {
    use super::*;

    /// 初始化后，所有未被忽略且存在于磁盘上的文件立即可查
    #[test]
    fn test_all_scanned_files_are_served() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/app.js"), b"console.log(1)").unwrap();
        fs::write(dir.path().join(".env"), b"SECRET=1").unwrap();

        let mirror = DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap();

        assert!(mirror.get("index.html").is_some());
        assert!(mirror.get("assets/app.js").is_some());
        // 被忽略的路径永远查不到
        assert!(mirror.get(".env").is_none());
        assert_eq!(mirror.len(), 2);
    }

    /// 无刷新介入时重复查询返回逐位相同的内容与校验值
    #[test]
    fn test_get_is_idempotent_between_refreshes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"stable").unwrap();
        let mirror = DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap();

        let first = mirror.get("a.txt").unwrap();
        for _ in 0..10 {
            let again = mirror.get("a.txt").unwrap();
            assert_eq!(again.content(), first.content());
            assert_eq!(again.etag(), first.etag());
            assert_eq!(again.last_modified(), first.last_modified());
        }
    }

    /// 条目在刷新后是值快照：旧句柄保持旧内容，不跟随更新
    #[tokio::test]
    async fn test_entries_are_value_snapshots() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), b"old").unwrap();
        let mirror = DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap();

        let held = mirror.get("a.txt").unwrap();
        fs::write(dir.path().join("a.txt"), b"new").unwrap();
        mirror.refresh("a.txt").await;

        assert_eq!(held.content().as_ref(), b"old");
        assert_eq!(mirror.get("a.txt").unwrap().content().as_ref(), b"new");
    }
}

#[cfg(test)]
mod live_refresh_tests {
    use super::*;

    /// 新建文件经由监听任务传播后变为可服务
    #[tokio::test]
    async fn test_created_file_becomes_visible() {
        let dir = TempDir::new().unwrap();
        let mirror =
            Arc::new(DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap());
        let watcher = MirrorWatcher::new(mirror.root()).unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(livedir::watch::run(
            Arc::clone(&mirror),
            watcher,
            shutdown_rx,
        ));

        fs::write(dir.path().join("fresh.css"), b"body{}").unwrap();

        let visible = {
            let mirror = Arc::clone(&mirror);
            eventually(
                move || mirror.get("fresh.css").is_some(),
                Duration::from_secs(3),
            )
            .await
        };
        assert!(visible, "新建文件在超时内未进入镜像");

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    /// 修改文件后镜像最终呈现新内容与新ETag
    #[tokio::test]
    async fn test_modified_file_is_refreshed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("page.html"), b"v1").unwrap();
        let mirror =
            Arc::new(DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap());
        let old_etag = mirror.get("page.html").unwrap().etag().to_string();

        let watcher = MirrorWatcher::new(mirror.root()).unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(livedir::watch::run(
            Arc::clone(&mirror),
            watcher,
            shutdown_rx,
        ));

        fs::write(dir.path().join("page.html"), b"v2 content").unwrap();

        let refreshed = {
            let mirror = Arc::clone(&mirror);
            eventually(
                move || {
                    mirror
                        .get("page.html")
                        .map(|e| e.content().as_ref() == b"v2 content")
                        .unwrap_or(false)
                },
                Duration::from_secs(3),
            )
            .await
        };
        assert!(refreshed, "修改后的内容在超时内未进入镜像");
        assert_ne!(mirror.get("page.html").unwrap().etag(), old_etag);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    /// 删除事件传播后，对应请求穿透给下游（不再返回200）
    #[tokio::test]
    async fn test_deleted_file_passes_through() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), [0xFF, 0xD8, 0x01]).unwrap();
        let mirror =
            Arc::new(DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap());
        let serve = ServeMirror::new(Arc::clone(&mirror), ServeOptions::new());

        let watcher = MirrorWatcher::new(mirror.root()).unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(livedir::watch::run(
            Arc::clone(&mirror),
            watcher,
            shutdown_rx,
        ));

        fs::remove_file(dir.path().join("logo.png")).unwrap();

        let gone = {
            let mirror = Arc::clone(&mirror);
            eventually(
                move || mirror.get("logo.png").is_none(),
                Duration::from_secs(3),
            )
            .await
        };
        assert!(gone, "删除事件在超时内未传播到镜像");

        let request = request_of("GET /logo.png HTTP/1.1\r\nHost: localhost\r\n\r\n");
        assert!(serve.handle(&request, 0).is_none());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    /// 被忽略路径的事件不产生任何条目，无论事件何时到达
    #[tokio::test]
    async fn test_ignored_paths_never_enter_mirror() {
        let dir = TempDir::new().unwrap();
        let mirror =
            Arc::new(DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap());
        let watcher = MirrorWatcher::new(mirror.root()).unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let task = tokio::spawn(livedir::watch::run(
            Arc::clone(&mirror),
            watcher,
            shutdown_rx,
        ));

        fs::write(dir.path().join(".hidden"), b"secret").unwrap();
        fs::write(dir.path().join("visible.txt"), b"ok").unwrap();

        let visible = {
            let mirror = Arc::clone(&mirror);
            eventually(
                move || mirror.get("visible.txt").is_some(),
                Duration::from_secs(3),
            )
            .await
        };
        assert!(visible);
        // 同批事件已处理完毕，被忽略的路径仍然不存在
        assert!(mirror.get(".hidden").is_none());

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }
}

#[cfg(test)]
mod conditional_serving_tests {
    use super::*;

    fn serve_of(dir: &TempDir) -> ServeMirror {
        let mirror = Arc::new(
            DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap(),
        );
        ServeMirror::new(mirror, ServeOptions::new())
    }

    /// 场景：无校验头的GET返回200与完整字节；携带返回ETag的再次请求得到304空响应体
    #[test]
    fn test_logo_scenario() {
        let dir = TempDir::new().unwrap();
        let content: &[u8] = &[0xFF, 0xD8, 0xDE, 0xAD, 0xBE, 0xEF];
        fs::write(dir.path().join("logo.png"), content).unwrap();
        let serve = serve_of(&dir);

        let first = serve
            .handle(
                &request_of("GET /logo.png HTTP/1.1\r\nHost: localhost\r\n\r\n"),
                0,
            )
            .unwrap();
        assert_eq!(first.status_code(), 200);
        assert_eq!(first.content_type(), Some("image/png"));
        assert_eq!(first.content().unwrap().as_ref(), content);
        let etag = first.etag().unwrap().to_string();

        let second = serve
            .handle(
                &request_of(&format!(
                    "GET /logo.png HTTP/1.1\r\nHost: localhost\r\nIf-None-Match: {}\r\n\r\n",
                    etag
                )),
                1,
            )
            .unwrap();
        assert_eq!(second.status_code(), 304);
        assert!(second.content().is_none());
        assert_eq!(second.content_length(), 0);
    }

    /// HEAD与GET对同一路径和校验头集合产出相同的状态码与标头
    #[test]
    fn test_head_parity_with_validators() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("doc.txt"), b"bytes of the doc").unwrap();
        let serve = serve_of(&dir);

        let etag = serve
            .handle(
                &request_of("GET /doc.txt HTTP/1.1\r\nHost: localhost\r\n\r\n"),
                0,
            )
            .unwrap()
            .etag()
            .unwrap()
            .to_string();

        let validators = [
            "If-None-Match: \"miss\"".to_string(),
            format!("If-None-Match: {}", etag),
        ];
        for validator in &validators {
            let get = serve
                .handle(
                    &request_of(&format!(
                        "GET /doc.txt HTTP/1.1\r\nHost: localhost\r\n{}\r\n\r\n",
                        validator
                    )),
                    0,
                )
                .unwrap();
            let head = serve
                .handle(
                    &request_of(&format!(
                        "HEAD /doc.txt HTTP/1.1\r\nHost: localhost\r\n{}\r\n\r\n",
                        validator
                    )),
                    1,
                )
                .unwrap();

            assert_eq!(get.status_code(), head.status_code());
            assert_eq!(get.etag(), head.etag());
            assert_eq!(get.last_modified(), head.last_modified());
            assert_eq!(get.content_type(), head.content_type());
            assert_eq!(get.content_length(), head.content_length());
            assert!(head.content().is_none());
        }
    }

    /// 刷新改变内容后，携带旧ETag的If-Match产出412，旧If-None-Match产出200
    #[tokio::test]
    async fn test_stale_validators_after_refresh() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data.json"), b"{\"v\":1}").unwrap();
        let mirror = Arc::new(
            DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap(),
        );
        let serve = ServeMirror::new(Arc::clone(&mirror), ServeOptions::new());

        let stale_etag = mirror.get("data.json").unwrap().etag().to_string();

        fs::write(dir.path().join("data.json"), b"{\"v\":2}").unwrap();
        mirror.refresh("data.json").await;

        let precondition = serve
            .handle(
                &request_of(&format!(
                    "GET /data.json HTTP/1.1\r\nHost: localhost\r\nIf-Match: {}\r\n\r\n",
                    stale_etag
                )),
                0,
            )
            .unwrap();
        assert_eq!(precondition.status_code(), 412);

        let freshness = serve
            .handle(
                &request_of(&format!(
                    "GET /data.json HTTP/1.1\r\nHost: localhost\r\nIf-None-Match: {}\r\n\r\n",
                    stale_etag
                )),
                1,
            )
            .unwrap();
        assert_eq!(freshness.status_code(), 200);
        assert_eq!(freshness.content().unwrap().as_ref(), b"{\"v\":2}");
    }
}

#[cfg(test)]
mod concurrency_tests {
    use super::*;

    /// 并发读者在刷新风暴中永远看不到撕裂的条目：
    /// 观察到的ETag必须与同一条目的内容重新哈希一致
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_never_observes_torn_entry() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("p.bin"), b"generation-0").unwrap();
        let mirror = Arc::new(
            DirectoryMirror::initialize(dir.path(), IgnoreFilter::dotfiles()).unwrap(),
        );

        let stop = Arc::new(AtomicBool::new(false));
        let mut readers = Vec::new();
        for _ in 0..4 {
            let mirror = Arc::clone(&mirror);
            let stop = Arc::clone(&stop);
            readers.push(std::thread::spawn(move || {
                let mut observed = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    if let Some(entry) = mirror.get("p.bin") {
                        assert_eq!(
                            entry.etag(),
                            &compute_etag(entry.content()),
                            "读者观察到ETag与内容不配对的条目"
                        );
                        observed += 1;
                    }
                }
                observed
            }));
        }

        for generation in 1..=50u32 {
            let content = format!("generation-{}", generation);
            fs::write(dir.path().join("p.bin"), content.as_bytes()).unwrap();
            mirror.refresh("p.bin").await;
        }

        stop.store(true, Ordering::Relaxed);
        for reader in readers {
            let observed = reader.join().unwrap();
            assert!(observed > 0, "读者线程没有观察到任何条目");
        }

        assert_eq!(
            mirror.get("p.bin").unwrap().content().as_ref(),
            b"generation-50"
        );
    }
}

//! 测试用的本地 HTTP 服务器（axum），在独立线程的 tokio runtime 上运行。

use std::net::{SocketAddr, TcpListener};
use std::thread;

use axum::Router;
use tokio::sync::oneshot;

pub(crate) struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub(crate) fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        listener
            .set_nonblocking(true)
            .expect("set test listener non-blocking");
        let addr = listener.local_addr().expect("test server addr");
        let (tx, rx) = oneshot::channel::<()>();

        thread::Builder::new()
            .name("test-server".to_string())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .enable_all()
                    .build()
                    .expect("test server runtime");
                rt.block_on(async move {
                    let listener =
                        tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                    let _ = axum::serve(listener, router)
                        .with_graceful_shutdown(async {
                            let _ = rx.await;
                        })
                        .await;
                });
            })
            .expect("spawn test server");

        Self {
            addr,
            shutdown: Some(tx),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// 去掉协议头的地址（`//127.0.0.1:port/path`），与目录页里的写法一致。
    pub(crate) fn scheme_relative(&self, path: &str) -> String {
        format!("//{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// 一个当前没有任何进程监听的地址，连接会被拒绝。
pub(crate) fn refused_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}{path}")
}

pub(crate) fn book_page(title: Option<&str>, rows: &[&str]) -> String {
    let header = title
        .map(|t| format!(r#"<div class="header"><h1 itemprop="name">{t}</h1></div>"#))
        .unwrap_or_default();
    let rows: String = rows
        .iter()
        .map(|about| {
            format!(
                r#"<tr class="even" about="{about}" typeof="pgterms:file"><td><a href="{about}">EPUB</a></td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html><html><head><title>Book</title></head><body>{header}<table class="files"><tbody>{rows}</tbody></table></body></html>"#
    )
}

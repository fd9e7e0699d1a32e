use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::base_system::context::RunConfig;

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

pub(crate) fn random_user_agent() -> &'static str {
    USER_AGENTS[rand::random_range(0..USER_AGENTS.len())]
}

/// 页面抓取结果：404 视为目录中不存在该书，不算错误。
#[derive(Debug)]
pub(crate) enum PageBody {
    Found(String),
    Missing,
}

/// 进程内唯一的 HTTP 客户端，启动时构建一次，以引用方式传给每个页面任务。
pub struct CatalogClient {
    client: Client,
    user_agent: String,
    random_user_agent: bool,
}

impl CatalogClient {
    pub fn new(run: &RunConfig) -> reqwest::Result<Self> {
        // reqwest 未启用 gzip 解码，要求服务端返回原始字节
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        default_headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        if let Ok(ua) = HeaderValue::from_str(&run.user_agent) {
            default_headers.insert(USER_AGENT, ua);
        }

        let client = Client::builder()
            .default_headers(default_headers)
            .http1_only()
            .pool_max_idle_per_host(run.concurrency)
            .timeout(run.request_timeout)
            .build()?;

        Ok(Self {
            client,
            user_agent: run.user_agent.clone(),
            random_user_agent: run.random_user_agent,
        })
    }

    fn page_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        let ua = if self.random_user_agent {
            random_user_agent()
        } else {
            self.user_agent.as_str()
        };
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(ua).unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
        );
        headers
    }

    pub(crate) fn fetch_page(&self, url: &str) -> reqwest::Result<PageBody> {
        debug!(target: "page", url, "请求书籍页面");
        let resp = self.client.get(url).headers(self.page_headers()).send()?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(PageBody::Missing);
        }
        let resp = resp.error_for_status()?;
        Ok(PageBody::Found(resp.text()?))
    }

    /// 请求下载链接，非 2xx 状态视为失败。响应体由调用方流式读取。
    pub(crate) fn fetch_asset(&self, url: &str) -> reqwest::Result<Response> {
        debug!(target: "download", url, "请求 EPUB");
        self.client.get(url).send()?.error_for_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::context::{Config, RunOverrides};
    use crate::test_support::TestServer;
    use axum::Router;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::routing::get;

    fn run_config(base_url: &str, random_user_agent: bool) -> RunConfig {
        Config {
            base_url: base_url.to_string(),
            ..Config::default()
        }
        .run_config(RunOverrides {
            output: Some("out".to_string()),
            concurrency: Some(3),
            random_user_agent,
            start_id: 1,
            stop_id: 1,
        })
        .unwrap()
    }

    async fn echo_ua(headers: AxumHeaders) -> String {
        headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    fn server() -> TestServer {
        TestServer::start(
            Router::new()
                .route("/ebooks/1", get(echo_ua))
                .route("/ebooks/2", get(|| async { AxumStatus::NOT_FOUND }))
                .route("/ebooks/3", get(|| async { AxumStatus::INTERNAL_SERVER_ERROR })),
        )
    }

    #[test]
    fn random_user_agent_comes_from_pool() {
        for _ in 0..32 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn page_fetch_uses_configured_user_agent() {
        let server = server();
        let run = run_config(&server.url("/ebooks"), false);
        let client = CatalogClient::new(&run).unwrap();

        match client.fetch_page(&run.page_url(1)).unwrap() {
            PageBody::Found(body) => assert_eq!(body, run.user_agent),
            PageBody::Missing => panic!("page 1 should exist"),
        }
    }

    #[test]
    fn page_fetch_rotates_user_agent_when_enabled() {
        let server = server();
        let run = run_config(&server.url("/ebooks"), true);
        let client = CatalogClient::new(&run).unwrap();

        for _ in 0..8 {
            let PageBody::Found(body) = client.fetch_page(&run.page_url(1)).unwrap() else {
                panic!("page 1 should exist");
            };
            assert!(USER_AGENTS.contains(&body.as_str()));
        }
    }

    #[test]
    fn missing_page_is_not_an_error() {
        let server = server();
        let run = run_config(&server.url("/ebooks"), false);
        let client = CatalogClient::new(&run).unwrap();

        assert!(matches!(
            client.fetch_page(&run.page_url(2)).unwrap(),
            PageBody::Missing
        ));
        assert!(client.fetch_page(&run.page_url(3)).is_err());
    }

    #[test]
    fn asset_fetch_rejects_error_status() {
        let server = server();
        let run = run_config(&server.url("/ebooks"), false);
        let client = CatalogClient::new(&run).unwrap();

        let err = client.fetch_asset(&run.page_url(3)).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    }
}

//! 书籍页面解析：从页面中取出书名与 EPUB 下载链接。

use thiserror::Error;
use tracing::debug;

use super::markup::{Markup, ScraperMarkup};
use crate::base_system::context::RunConfig;
use crate::network_parser::network::{CatalogClient, PageBody};

const TITLE_SCOPE: &str = "div.header";
const TITLE_SELECTOR: &str = "h1";
const LINK_SCOPE: &str = "tbody";
const LINK_ROW: &str = "tr.even";
const LINK_ATTR: &str = "about";
const EPUB_MARKER: &str = "epub.images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub title: String,
    pub link: String,
    pub index: u32,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("page request failed: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// 抓取并解析第 `index` 本书的页面。
///
/// 返回 `Ok(None)` 表示该书不存在或没有 EPUB 版本，调用方应直接跳过；
/// 网络错误与非 404 的错误状态返回 `Err`，与“没有 EPUB”区分开。
pub fn extract(
    client: &CatalogClient,
    run: &RunConfig,
    index: u32,
) -> Result<Option<PageResult>, ExtractError> {
    let url = run.page_url(index);
    match client.fetch_page(&url)? {
        PageBody::Found(html) => Ok(extract_from_html::<ScraperMarkup>(&html, index)),
        PageBody::Missing => {
            debug!(target: "page", index, "页面不存在");
            Ok(None)
        }
    }
}

pub fn extract_from_html<M: Markup>(html: &str, index: u32) -> Option<PageResult> {
    let doc = M::parse(html);

    let title = doc
        .child_texts(TITLE_SCOPE, TITLE_SELECTOR)
        .into_iter()
        .find(|t| !t.is_empty())
        .unwrap_or_default();

    let link = doc
        .child_attrs(LINK_SCOPE, LINK_ROW, LINK_ATTR)
        .into_iter()
        .find(|about| about.contains(EPUB_MARKER))
        .map(|about| absolute_link(about.trim()))
        .unwrap_or_default();

    if title.is_empty() || link.is_empty() {
        debug!(target: "page", index, has_title = !title.is_empty(), has_link = !link.is_empty(), "没有可用的 EPUB");
        return None;
    }

    Some(PageResult { title, link, index })
}

// 页面里的链接省略了协议头（//www.gutenberg.org/...）
fn absolute_link(about: &str) -> String {
    if about.starts_with("//") {
        format!("http:{about}")
    } else {
        about.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::context::{Config, RunOverrides};
    use crate::test_support::{TestServer, book_page};
    use axum::Router;
    use axum::http::StatusCode;
    use axum::response::Html;
    use axum::routing::get;

    #[test]
    fn extracts_title_and_first_epub_link() {
        let html = book_page(
            Some("Alice's Adventures in Wonderland"),
            &[
                "//www.gutenberg.org/ebooks/11.html.images",
                "//www.gutenberg.org/ebooks/11.epub.images",
                "//www.gutenberg.org/ebooks/11.epub3.images",
            ],
        );
        let result = extract_from_html::<ScraperMarkup>(&html, 11).unwrap();
        assert_eq!(result.title, "Alice's Adventures in Wonderland");
        assert_eq!(result.link, "http://www.gutenberg.org/ebooks/11.epub.images");
        assert_eq!(result.index, 11);
    }

    #[test]
    fn page_without_epub_row_yields_nothing() {
        let html = book_page(Some("Audio Only"), &["//www.gutenberg.org/files/1/1.mp3"]);
        assert_eq!(extract_from_html::<ScraperMarkup>(&html, 1), None);

        let html = book_page(Some("No Table"), &[]);
        assert_eq!(extract_from_html::<ScraperMarkup>(&html, 1), None);
    }

    #[test]
    fn page_without_title_yields_nothing() {
        let html = book_page(None, &["//www.gutenberg.org/ebooks/7.epub.images"]);
        assert_eq!(extract_from_html::<ScraperMarkup>(&html, 7), None);
    }

    #[test]
    fn absolute_links_are_kept() {
        assert_eq!(
            absolute_link("https://mirror/5.epub.images"),
            "https://mirror/5.epub.images"
        );
        assert_eq!(absolute_link("//mirror/5.epub.images"), "http://mirror/5.epub.images");
    }

    struct FixedMarkup;

    impl Markup for FixedMarkup {
        fn parse(_html: &str) -> Self {
            FixedMarkup
        }

        fn child_texts(&self, parent: &str, child: &str) -> Vec<String> {
            assert_eq!((parent, child), (TITLE_SCOPE, TITLE_SELECTOR));
            vec![String::new(), "Second Header".to_string()]
        }

        fn child_attrs(&self, parent: &str, child: &str, attr: &str) -> Vec<String> {
            assert_eq!((parent, child, attr), (LINK_SCOPE, LINK_ROW, LINK_ATTR));
            vec![" //h/9.epub.images ".to_string()]
        }
    }

    #[test]
    fn extraction_only_depends_on_markup_capability() {
        let result = extract_from_html::<FixedMarkup>("", 9).unwrap();
        assert_eq!(result.title, "Second Header");
        assert_eq!(result.link, "http://h/9.epub.images");
    }

    #[test]
    fn extract_distinguishes_missing_pages_from_failures() {
        let server = TestServer::start(
            Router::new()
                .route(
                    "/ebooks/3",
                    get(|| async {
                        Html(book_page(Some("Three"), &["//h/ebooks/3.epub.images"]))
                    }),
                )
                .route("/ebooks/4", get(|| async { StatusCode::SERVICE_UNAVAILABLE })),
        );
        let run = Config {
            base_url: server.url("/ebooks"),
            ..Config::default()
        }
        .run_config(RunOverrides {
            output: Some("out".to_string()),
            concurrency: Some(1),
            random_user_agent: false,
            start_id: 3,
            stop_id: 5,
        })
        .unwrap();
        let client = CatalogClient::new(&run).unwrap();

        let found = extract(&client, &run, 3).unwrap().unwrap();
        assert_eq!(found.title, "Three");
        assert!(matches!(extract(&client, &run, 4), Err(ExtractError::Fetch(_))));
        // axum 对未注册路由返回 404
        assert_eq!(extract(&client, &run, 5).unwrap(), None);
    }
}

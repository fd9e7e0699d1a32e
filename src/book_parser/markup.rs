//! 页面标记查询接口。
//!
//! 提取逻辑只依赖 [`Markup`]，解析引擎（目前是 `scraper`）可以替换，
//! 提取规则也可以直接对固定的 HTML 片段做测试。

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub trait Markup: Sized {
    fn parse(html: &str) -> Self;

    /// 每个匹配 `parent` 的元素下，第一个匹配 `child` 的元素的文本（已去首尾空白）。
    fn child_texts(&self, parent: &str, child: &str) -> Vec<String>;

    /// 所有匹配 `parent` 的元素下，匹配 `child` 的元素的 `attr` 属性值，按文档顺序。
    fn child_attrs(&self, parent: &str, child: &str, attr: &str) -> Vec<String>;
}

pub struct ScraperMarkup {
    document: Html,
}

fn selector(raw: &str) -> Option<Selector> {
    match Selector::parse(raw) {
        Ok(sel) => Some(sel),
        Err(err) => {
            debug!(target: "page", selector = raw, error = %err, "无效选择器");
            None
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

impl Markup for ScraperMarkup {
    fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    fn child_texts(&self, parent: &str, child: &str) -> Vec<String> {
        let (Some(parent), Some(child)) = (selector(parent), selector(child)) else {
            return Vec::new();
        };
        self.document
            .select(&parent)
            .filter_map(|p| p.select(&child).next().map(element_text))
            .collect()
    }

    fn child_attrs(&self, parent: &str, child: &str, attr: &str) -> Vec<String> {
        let (Some(parent), Some(child)) = (selector(parent), selector(child)) else {
            return Vec::new();
        };
        self.document
            .select(&parent)
            .flat_map(|p| p.select(&child))
            .filter_map(|el| el.value().attr(attr).map(str::to_string))
            .collect()
    }
}

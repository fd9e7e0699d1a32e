//! 页面解析模块入口。
//!
//! - `markup` — 标记查询接口与 scraper 实现
//! - `page`   — 书名 / EPUB 链接提取

pub mod markup;
pub mod page;

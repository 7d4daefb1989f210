//! Address validation and link discovery / 地址校验与链接发现

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Parse a crawlable address: http(s), non-empty host, no whitespace in the path
/// 解析可抓取地址
pub fn parse_address(raw: &str) -> Option<Url> {
    if raw.is_empty() || raw.chars().any(char::is_whitespace) {
        return None;
    }
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    if url.host_str().map_or(true, str::is_empty) {
        return None;
    }
    let decoded = urlencoding::decode(url.path()).ok()?;
    if decoded.chars().any(char::is_whitespace) {
        return None;
    }
    Some(url)
}

/// `scheme://host[:port]`, the key sites are stored under / 站点来源
pub fn origin(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    }
}

/// Origin of a configured site URL; `None` if it is not crawlable / 配置站点的来源
pub fn site_origin(site_url: &str) -> Option<String> {
    parse_address(site_url).map(|url| origin(&url))
}

/// Path stored for a page / 页面路径
pub fn page_path(url: &Url) -> String {
    url.path().to_string()
}

/// Same-site anchors of `html`, keyed by canonical path / 同站链接（按路径去重）
///
/// Each href is resolved against `base`; query and fragment are dropped.
pub fn discover_links(html: &str, base: &Url) -> BTreeMap<String, Url> {
    let base_origin = origin(base);
    let document = Html::parse_document(html);
    let mut links = BTreeMap::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") || origin(&resolved) != base_origin {
            continue;
        }
        let path = page_path(&resolved);
        let Some(canonical) = parse_address(&format!("{}{}", base_origin, path)) else {
            continue;
        };
        links.entry(path).or_insert(canonical);
    }

    links
}

//! Search request / result types / 搜索请求与结果类型

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 20;

/// One ranked page / 单条搜索结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchItem {
    /// Site URL / 站点地址
    pub site: String,
    pub site_name: String,
    /// Page path within the site / 站内路径
    pub uri: String,
    pub title: String,
    /// Highlighted excerpt / 高亮摘要
    pub snippet: String,
    /// Relative relevance in (0, 1] / 相对相关度
    pub relevance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Matching pages before pagination / 分页前的总数
    pub total: usize,
    pub items: Vec<SearchItem>,
}

/// Offset / limit window / 分页参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Parse raw request values; anything invalid falls back to 0 / 20
    /// 解析原始参数，非法值回退为 0 / 20
    pub fn parse(offset: Option<&str>, limit: Option<&str>) -> Self {
        let offset = offset
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let limit = limit
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&v| v > 0)
            .unwrap_or(DEFAULT_LIMIT);
        Self { offset, limit }
    }
}

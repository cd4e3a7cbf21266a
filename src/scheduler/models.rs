// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 标准化内容条目
///
/// 搜索批次与详情增强共用同一结构：详情获取成功时
/// `detail_fetched`为true，失败时回退到搜索批次里的基础信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    pub platform: String,
    pub content_id: String,
    pub title: String,
    pub author_id: String,
    pub url: String,
    /// 命中该条目的搜索关键词，创作者抓取时为空
    pub source_keyword: String,
    pub detail_fetched: bool,
}

/// 标准化评论条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentItem {
    pub platform: String,
    pub content_id: String,
    pub comment_id: String,
    pub author_id: String,
    pub text: String,
}

/// 代理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyStrategy {
    Disabled,
    Enabled,
}

/// 单次平台遍历的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassConfig {
    pub platform: String,
    /// 搜索关键词列表，与`creator_ids`可同时非空
    pub keywords: Vec<String>,
    /// 创作者ID列表
    pub creator_ids: Vec<String>,
    /// 本次遍历最多收集的内容条数
    pub max_count: usize,
    /// 详情/评论增强的并发上限
    pub max_concurrency: usize,
    pub enable_comments: bool,
    pub proxy_strategy: ProxyStrategy,
    /// 关键词分页的起始页码
    pub start_page: u32,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            platform: String::new(),
            keywords: Vec::new(),
            creator_ids: Vec::new(),
            max_count: 200,
            max_concurrency: 1,
            enable_comments: false,
            proxy_strategy: ProxyStrategy::Disabled,
            start_page: 1,
        }
    }
}

/// 单次平台遍历的结果汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassResult {
    /// 本次遍历的唯一标识，用于日志关联
    pub pass_id: Uuid,
    pub platform: String,
    pub contents_stored: usize,
    pub comments_stored: usize,
    /// 遍历中整体失败的关键词（其余关键词不受影响）
    pub failed_keywords: Vec<String>,
    /// 整体失败的创作者ID
    pub failed_creators: Vec<String>,
    /// 代理获取失败后降级为直连
    pub proxy_degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_config_defaults() {
        let config = PassConfig::default();
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.start_page, 1);
        assert_eq!(config.proxy_strategy, ProxyStrategy::Disabled);
        assert!(!config.enable_comments);
    }

    #[test]
    fn test_proxy_strategy_serde_lowercase() {
        let json = serde_json::to_string(&ProxyStrategy::Enabled).unwrap();
        assert_eq!(json, "\"enabled\"");
    }
}

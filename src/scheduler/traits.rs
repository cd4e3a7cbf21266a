// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::scheduler::models::{CommentItem, ContentItem};
use anyhow::Result;
use async_trait::async_trait;

/// 平台内容客户端接口
///
/// 由具体平台实现（签名、接口协议等均在实现侧），调度器只依赖
/// 这几个语义化操作。`search`返回空批次表示该关键词已翻到底
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// 按关键词搜索一页内容
    async fn search(&self, keyword: &str, page: u32) -> Result<Vec<ContentItem>>;

    /// 获取单条内容的详情
    ///
    /// 返回`Ok(None)`表示详情不可用，调用方应回退到批次内的基础信息
    async fn content_detail(&self, item: &ContentItem) -> Result<Option<ContentItem>>;

    /// 获取单条内容的评论
    async fn content_comments(&self, content_id: &str) -> Result<Vec<CommentItem>>;

    /// 获取指定创作者的全部内容
    async fn creator_contents(&self, creator_id: &str) -> Result<Vec<ContentItem>>;
}

/// 内容落库接口
///
/// 一次标准化结果调用一次；失败重试由实现侧负责，调度器不重试
#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn store_content(&self, item: &ContentItem) -> Result<()>;

    async fn store_comment(&self, comment: &CommentItem) -> Result<()>;
}

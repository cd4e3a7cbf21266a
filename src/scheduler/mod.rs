// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 爬取调度模块
//!
//! 一次平台遍历 = 关键词/创作者列表 + 顺序翻页 + 并发受限的
//! 详情/评论增强。平台客户端与落库接口以trait注入，调度器
//! 本身不持有任何平台协议细节。

pub mod models;
#[allow(clippy::module_inception)]
pub mod scheduler;
pub mod traits;


pub use models::{CommentItem, ContentItem, PassConfig, PassResult, ProxyStrategy};
pub use scheduler::CrawlScheduler;
pub use traits::{ContentSink, PlatformClient};

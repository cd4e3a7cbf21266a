// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::proxy::{ProxyError, ProxyProvider, ProxyRecord};
use crate::scheduler::models::{CommentItem, ContentItem, PassConfig, PassResult, ProxyStrategy};
use crate::scheduler::traits::{ContentSink, PlatformClient};
use anyhow::Result;
use futures::future::join_all;
use metrics::counter;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 爬取调度器
///
/// 驱动一次平台遍历：关键词顺序翻页、详情/评论按信号量限流并发
/// 增强、结果交给落库接口。翻页之间不额外加延迟，退避完全由
/// 页面抓取路径上的规避层负责
pub struct CrawlScheduler {
    client: Arc<dyn PlatformClient>,
    sink: Arc<dyn ContentSink>,
    proxy_provider: Option<Arc<dyn ProxyProvider>>,
}

impl CrawlScheduler {
    pub fn new(client: Arc<dyn PlatformClient>, sink: Arc<dyn ContentSink>) -> Self {
        Self {
            client,
            sink,
            proxy_provider: None,
        }
    }

    /// 挂接代理商，`proxy_strategy`为enabled的遍历会先取一批代理
    pub fn with_proxy_provider(mut self, provider: Arc<dyn ProxyProvider>) -> Self {
        self.proxy_provider = Some(provider);
        self
    }

    /// 执行一次平台遍历
    ///
    /// 单个关键词/创作者的失败只影响自身，其余继续执行；
    /// 代理获取失败降级为直连而不是中止
    pub async fn run_platform_pass(&self, config: PassConfig) -> PassResult {
        let pass_id = Uuid::new_v4();
        let mut result = PassResult {
            pass_id,
            platform: config.platform.clone(),
            ..PassResult::default()
        };
        info!(
            "[{}] pass {} started: {} keywords, {} creators",
            config.platform,
            pass_id,
            config.keywords.len(),
            config.creator_ids.len()
        );

        let proxies = self.acquire_proxies(&config, &mut result).await;

        let semaphore = Semaphore::new(config.max_concurrency.max(1));

        for keyword in &config.keywords {
            info!("[{}] crawl keyword: {}", config.platform, keyword);
            match self.crawl_keyword(&config, &semaphore, keyword).await {
                Ok((contents, comments)) => {
                    result.contents_stored += contents;
                    result.comments_stored += comments;
                }
                Err(e) => {
                    warn!("[{}] keyword {} failed: {}", config.platform, keyword, e);
                    counter!("crawl_keyword_failures_total", "platform" => config.platform.clone())
                        .increment(1);
                    result.failed_keywords.push(keyword.clone());
                }
            }
        }

        for creator_id in &config.creator_ids {
            info!("[{}] crawl creator: {}", config.platform, creator_id);
            match self.crawl_creator(&config, &semaphore, creator_id).await {
                Ok((contents, comments)) => {
                    result.contents_stored += contents;
                    result.comments_stored += comments;
                }
                Err(e) => {
                    warn!(
                        "[{}] creator {} failed: {}",
                        config.platform, creator_id, e
                    );
                    result.failed_creators.push(creator_id.clone());
                }
            }
        }

        self.release_proxies(&config, proxies).await;

        counter!("crawl_contents_stored_total", "platform" => config.platform.clone())
            .increment(result.contents_stored as u64);
        counter!("crawl_comments_stored_total", "platform" => config.platform.clone())
            .increment(result.comments_stored as u64);
        info!(
            "[{}] pass {} finished: {} contents, {} comments, {} failed keywords",
            config.platform,
            pass_id,
            result.contents_stored,
            result.comments_stored,
            result.failed_keywords.len()
        );
        result
    }

    /// 按需获取一批代理，失败降级为直连
    async fn acquire_proxies(
        &self,
        config: &PassConfig,
        result: &mut PassResult,
    ) -> Vec<ProxyRecord> {
        if config.proxy_strategy != ProxyStrategy::Enabled {
            return Vec::new();
        }
        let Some(provider) = &self.proxy_provider else {
            warn!(
                "[{}] proxy enabled but no provider attached, direct connection",
                config.platform
            );
            result.proxy_degraded = true;
            return Vec::new();
        };

        match provider.fetch(config.max_concurrency.max(1)).await {
            Ok(records) => {
                info!(
                    "[{}] acquired {} proxies from {}",
                    config.platform,
                    records.len(),
                    provider.name()
                );
                records
            }
            Err(ProxyError::Exhausted { requested, got }) => {
                warn!(
                    "[{}] proxy pool exhausted ({}/{}), degrade to direct connection",
                    config.platform, got, requested
                );
                result.proxy_degraded = true;
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "[{}] proxy acquisition failed: {}, degrade to direct connection",
                    config.platform, e
                );
                result.proxy_degraded = true;
                Vec::new()
            }
        }
    }

    /// 归还本次遍历占用的代理，尽力而为
    async fn release_proxies(&self, config: &PassConfig, proxies: Vec<ProxyRecord>) {
        let Some(provider) = &self.proxy_provider else {
            return;
        };
        for record in proxies {
            if !provider.release(&record.ip, record.port).await {
                debug!(
                    "[{}] proxy release failed: {}:{}",
                    config.platform, record.ip, record.port
                );
            }
        }
    }

    /// 单关键词的顺序翻页循环
    ///
    /// 空批次或收集量达到`max_count`时停止；第N+1页一定在第N页
    /// 批次拿到之后才请求
    async fn crawl_keyword(
        &self,
        config: &PassConfig,
        semaphore: &Semaphore,
        keyword: &str,
    ) -> Result<(usize, usize)> {
        let mut page = config.start_page;
        // 翻页的停止条件看采集量而不是落库量，落库失败不会引发多翻页
        let mut items_collected = 0usize;
        let mut contents_stored = 0usize;
        let mut comments_stored = 0usize;

        loop {
            if items_collected >= config.max_count {
                debug!(
                    "[{}] keyword {} reached max_count {}",
                    config.platform, keyword, config.max_count
                );
                break;
            }

            let batch = self.client.search(keyword, page).await?;
            if batch.is_empty() {
                debug!(
                    "[{}] keyword {} page {} empty, stop",
                    config.platform, keyword, page
                );
                break;
            }

            let remaining = config.max_count - items_collected;
            let batch: Vec<ContentItem> = batch.into_iter().take(remaining).collect();
            items_collected += batch.len();
            debug!(
                "[{}] keyword {} page {}: {} items",
                config.platform,
                keyword,
                page,
                batch.len()
            );

            let (contents, comments) = self.enrich_and_store(config, semaphore, batch).await;
            contents_stored += contents;
            comments_stored += comments;
            page += 1;
        }

        Ok((contents_stored, comments_stored))
    }

    /// 单创作者的内容抓取，走与关键词相同的增强管线
    async fn crawl_creator(
        &self,
        config: &PassConfig,
        semaphore: &Semaphore,
        creator_id: &str,
    ) -> Result<(usize, usize)> {
        let contents = self.client.creator_contents(creator_id).await?;
        let batch: Vec<ContentItem> = contents.into_iter().take(config.max_count).collect();
        Ok(self.enrich_and_store(config, semaphore, batch).await)
    }

    /// 详情/评论增强与落库
    ///
    /// 详情获取在信号量限流下并发执行，失败回退到批次内的基础
    /// 信息；全部结果聚齐后再逐条交给落库接口
    async fn enrich_and_store(
        &self,
        config: &PassConfig,
        semaphore: &Semaphore,
        batch: Vec<ContentItem>,
    ) -> (usize, usize) {
        let detail_tasks = batch.into_iter().map(|item| async move {
            let _permit = semaphore.acquire().await.ok()?;
            match self.client.content_detail(&item).await {
                Ok(Some(mut detail)) => {
                    detail.detail_fetched = true;
                    Some(detail)
                }
                Ok(None) => {
                    debug!(
                        "[{}] detail unavailable, fallback to batch item: {}",
                        config.platform, item.content_id
                    );
                    Some(item)
                }
                Err(e) => {
                    debug!(
                        "[{}] detail fetch failed ({}), fallback to batch item: {}",
                        config.platform, e, item.content_id
                    );
                    Some(item)
                }
            }
        });
        let enriched: Vec<ContentItem> = join_all(detail_tasks).await.into_iter().flatten().collect();

        let mut contents_stored = 0usize;
        for item in &enriched {
            match self.sink.store_content(item).await {
                Ok(()) => contents_stored += 1,
                Err(e) => warn!(
                    "[{}] store content {} failed: {}",
                    config.platform, item.content_id, e
                ),
            }
        }

        if !config.enable_comments {
            return (contents_stored, 0);
        }

        let comment_tasks = enriched.iter().map(|item| async move {
            let _permit = semaphore.acquire().await.ok()?;
            match self.client.content_comments(&item.content_id).await {
                Ok(comments) => Some(comments),
                Err(e) => {
                    debug!(
                        "[{}] comment fetch failed for {}: {}",
                        config.platform, item.content_id, e
                    );
                    None
                }
            }
        });
        let comment_batches: Vec<Vec<CommentItem>> =
            join_all(comment_tasks).await.into_iter().flatten().collect();

        let mut comments_stored = 0usize;
        for comment in comment_batches.iter().flatten() {
            match self.sink.store_comment(comment).await {
                Ok(()) => comments_stored += 1,
                Err(e) => warn!(
                    "[{}] store comment {} failed: {}",
                    config.platform, comment.comment_id, e
                ),
            }
        }

        (contents_stored, comments_stored)
    }
}

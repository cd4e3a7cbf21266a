// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// 页面操作错误类型
#[derive(Error, Debug)]
pub enum PageError {
    /// 页面已关闭
    #[error("Page closed")]
    Closed,
    /// 导航失败
    #[error("Navigation failed: {0}")]
    Navigation(String),
    /// 脚本执行失败
    #[error("Evaluate failed: {0}")]
    Evaluate(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl PageError {
    /// 判断错误是否为终止性错误
    ///
    /// 页面关闭后的任何操作都不可重试，调用方应立即放弃该页面
    pub fn is_terminal(&self) -> bool {
        matches!(self, PageError::Closed)
    }
}

/// 浏览器页面边界
///
/// 对浏览器自动化引擎的最小抽象，所有调用都可能失败；
/// 调用失败与`is_alive() == false`对该页面而言等价（终止、不可重试）
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// 导航到指定URL，带超时控制
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// 重新加载当前页面，带超时控制
    async fn reload(&self, timeout: Duration) -> Result<(), PageError>;

    /// 获取页面标题
    async fn title(&self) -> Result<String, PageError>;

    /// 获取页面body的纯文本内容
    async fn body_text(&self) -> Result<String, PageError>;

    /// 查询选择器是否命中可见元素
    async fn query_selector(&self, selector: &str) -> Result<bool, PageError>;

    /// 点击选择器命中的第一个元素
    async fn click_selector(&self, selector: &str) -> Result<(), PageError>;

    /// 在页面中执行脚本并返回结果
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError>;

    /// 屏蔽匹配URL模式的子资源请求
    async fn block_resources(&self, patterns: &[String]) -> Result<(), PageError>;

    /// 页面是否存活
    async fn is_alive(&self) -> bool;

    /// 关闭页面
    async fn close(&self);
}

/// 浏览器上下文边界
///
/// 上下文级别的强化入口：初始化脚本在每次导航前注入，
/// 额外请求头作用于上下文内的所有请求
#[async_trait]
pub trait BrowserContext: Send + Sync {
    /// 注入初始化脚本（在每个新文档创建时执行）
    async fn add_init_script(&self, script: &str) -> Result<(), PageError>;

    /// 设置额外的HTTP请求头
    async fn set_extra_headers(&self, headers: &HashMap<String, String>) -> Result<(), PageError>;

    /// 覆盖视口尺寸
    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), PageError>;
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::browser::page::{BrowserContext, BrowserPage, PageError};
use crate::config::settings::BrowserSettings;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetBlockedUrLsParams, SetExtraHttpHeadersParams,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 按配置启动一个本地Chromium实例
///
/// 返回浏览器句柄和驱动CDP事件循环的后台任务；
/// 任务在浏览器连接断开后自行结束
pub async fn launch_browser(
    settings: &BrowserSettings,
) -> Result<(Browser, JoinHandle<()>), PageError> {
    let mut builder = BrowserConfig::builder();
    if !settings.headless {
        builder = builder.with_head();
    }
    let config = builder.build().map_err(PageError::Other)?;
    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| PageError::Other(e.to_string()))?;
    let driver = tokio::spawn(async move { while handler.next().await.is_some() {} });
    Ok((browser, driver))
}

/// 基于chromiumoxide的页面边界实现
///
/// 持有一个CDP页面句柄；页面关闭后所有操作返回`PageError::Closed`
pub struct ChromiumPage {
    page: Page,
    closed: AtomicBool,
}

impl ChromiumPage {
    /// 包装一个已创建的CDP页面
    pub fn new(page: Page) -> Self {
        Self {
            page,
            closed: AtomicBool::new(false),
        }
    }

    fn check_alive(&self) -> Result<(), PageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PageError::Closed);
        }
        Ok(())
    }

    fn map_cdp_err(&self, e: chromiumoxide::error::CdpError) -> PageError {
        // CDP连接断开等价于页面消失
        let msg = e.to_string();
        if msg.contains("closed") || msg.contains("Connection") {
            self.closed.store(true, Ordering::SeqCst);
            PageError::Closed
        } else {
            PageError::Other(msg)
        }
    }
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError> {
        self.check_alive()?;
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| PageError::Timeout)?
            .map(|_| ())
            .map_err(|e| match self.map_cdp_err(e) {
                PageError::Other(msg) => PageError::Navigation(msg),
                other => other,
            })
    }

    async fn reload(&self, timeout: Duration) -> Result<(), PageError> {
        self.check_alive()?;
        tokio::time::timeout(timeout, self.page.reload())
            .await
            .map_err(|_| PageError::Timeout)?
            .map(|_| ())
            .map_err(|e| match self.map_cdp_err(e) {
                PageError::Other(msg) => PageError::Navigation(msg),
                other => other,
            })
    }

    async fn title(&self) -> Result<String, PageError> {
        self.check_alive()?;
        self.page
            .get_title()
            .await
            .map(|t| t.unwrap_or_default())
            .map_err(|e| self.map_cdp_err(e))
    }

    async fn body_text(&self) -> Result<String, PageError> {
        self.check_alive()?;
        let result = self
            .page
            .evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| self.map_cdp_err(e))?;
        result
            .into_value::<String>()
            .map_err(|e| PageError::Evaluate(e.to_string()))
    }

    async fn query_selector(&self, selector: &str) -> Result<bool, PageError> {
        self.check_alive()?;
        // find_element对未命中的选择器返回错误，这里归一化为false
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn click_selector(&self, selector: &str) -> Result<(), PageError> {
        self.check_alive()?;
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| self.map_cdp_err(e))?;
        element
            .click()
            .await
            .map(|_| ())
            .map_err(|e| self.map_cdp_err(e))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError> {
        self.check_alive()?;
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| self.map_cdp_err(e))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn block_resources(&self, patterns: &[String]) -> Result<(), PageError> {
        self.check_alive()?;
        let params = SetBlockedUrLsParams::new(patterns.to_vec());
        self.page
            .execute(params)
            .await
            .map(|_| ())
            .map_err(|e| self.map_cdp_err(e))
    }

    async fn is_alive(&self) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        // 轻量探测：无法取到标题视为页面已消失
        self.page.get_title().await.is_ok()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.page.clone().close().await;
    }
}

#[async_trait]
impl BrowserContext for ChromiumPage {
    async fn add_init_script(&self, script: &str) -> Result<(), PageError> {
        self.check_alive()?;
        let params = AddScriptToEvaluateOnNewDocumentParams::new(script.to_string());
        self.page
            .execute(params)
            .await
            .map(|_| ())
            .map_err(|e| self.map_cdp_err(e))
    }

    async fn set_extra_headers(&self, headers: &HashMap<String, String>) -> Result<(), PageError> {
        self.check_alive()?;
        let json = serde_json::to_value(headers)
            .map_err(|e| PageError::Other(e.to_string()))?;
        let params = SetExtraHttpHeadersParams::new(Headers::new(json));
        self.page
            .execute(params)
            .await
            .map(|_| ())
            .map_err(|e| self.map_cdp_err(e))
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), PageError> {
        self.check_alive()?;
        let params = SetDeviceMetricsOverrideParams::new(width as i64, height as i64, 1.0, false);
        self.page
            .execute(params)
            .await
            .map(|_| ())
            .map_err(|e| self.map_cdp_err(e))
    }
}

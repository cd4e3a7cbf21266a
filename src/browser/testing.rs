// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 测试用页面桩实现

use crate::browser::page::{BrowserContext, BrowserPage, PageError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// 可编程的内存页面桩
///
/// 记录所有操作调用次数，供断言使用
#[derive(Default)]
pub struct FakePage {
    pub alive: AtomicBool,
    pub title: Mutex<String>,
    pub body: Mutex<String>,
    pub reload_count: AtomicU32,
    pub navigate_count: AtomicU32,
    pub evaluated: Mutex<Vec<String>>,
    pub clicked: Mutex<Vec<String>>,
    pub init_scripts: Mutex<Vec<String>>,
    pub extra_headers: Mutex<HashMap<String, String>>,
    pub blocked_patterns: Mutex<Vec<String>>,
    pub viewport: Mutex<Option<(u32, u32)>>,
    pub matching_selectors: Mutex<HashSet<String>>,
    /// 导航后要呈现的标题（模拟页面加载结果）
    pub title_after_navigate: Mutex<Option<String>>,
}

impl FakePage {
    pub fn alive_with(title: &str, body: &str) -> Self {
        Self {
            alive: AtomicBool::new(true),
            title: Mutex::new(title.to_string()),
            body: Mutex::new(body.to_string()),
            ..Default::default()
        }
    }

    pub fn dead() -> Self {
        Self::default()
    }

    pub fn with_selector(self, selector: &str) -> Self {
        self.matching_selectors.lock().insert(selector.to_string());
        self
    }

    fn ensure_alive(&self) -> Result<(), PageError> {
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PageError::Closed)
        }
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<(), PageError> {
        self.ensure_alive()?;
        self.navigate_count.fetch_add(1, Ordering::SeqCst);
        if let Some(title) = self.title_after_navigate.lock().clone() {
            *self.title.lock() = title;
        }
        Ok(())
    }

    async fn reload(&self, _timeout: Duration) -> Result<(), PageError> {
        self.ensure_alive()?;
        self.reload_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn title(&self) -> Result<String, PageError> {
        self.ensure_alive()?;
        Ok(self.title.lock().clone())
    }

    async fn body_text(&self) -> Result<String, PageError> {
        self.ensure_alive()?;
        Ok(self.body.lock().clone())
    }

    async fn query_selector(&self, selector: &str) -> Result<bool, PageError> {
        self.ensure_alive()?;
        Ok(self.matching_selectors.lock().contains(selector))
    }

    async fn click_selector(&self, selector: &str) -> Result<(), PageError> {
        self.ensure_alive()?;
        self.clicked.lock().push(selector.to_string());
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, PageError> {
        self.ensure_alive()?;
        self.evaluated.lock().push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn block_resources(&self, patterns: &[String]) -> Result<(), PageError> {
        self.ensure_alive()?;
        self.blocked_patterns.lock().extend_from_slice(patterns);
        Ok(())
    }

    async fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserContext for FakePage {
    async fn add_init_script(&self, script: &str) -> Result<(), PageError> {
        self.ensure_alive()?;
        self.init_scripts.lock().push(script.to_string());
        Ok(())
    }

    async fn set_extra_headers(&self, headers: &HashMap<String, String>) -> Result<(), PageError> {
        self.ensure_alive()?;
        self.extra_headers.lock().extend(headers.clone());
        Ok(())
    }

    async fn set_viewport(&self, width: u32, height: u32) -> Result<(), PageError> {
        self.ensure_alive()?;
        *self.viewport.lock() = Some((width, height));
        Ok(())
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::browser::page::{BrowserContext, BrowserPage};
use crate::config::settings::BrowserSettings;
use crate::evasion::guard::{DetectionIndicatorSet, GuardConfig, RateLimitGuard};
use crate::evasion::profile::EvasionProfile;
use crate::evasion::strategy::EvasionStrategy;
use crate::evasion::toolkit::EvasionToolkit;
use async_trait::async_trait;
use chrono::{Local, Timelike};
use std::time::Duration;

const PLATFORM: &str = "dy";

/// 抖音规避策略
pub struct DouyinStrategy {
    toolkit: EvasionToolkit,
    guard: RateLimitGuard,
}

impl Default for DouyinStrategy {
    fn default() -> Self {
        // 抖音的限流恢复更慢，退避窗口比小红书更宽
        Self::new(GuardConfig {
            min_wait: Duration::from_secs(3),
            max_wait: Duration::from_secs(8),
            ..GuardConfig::default()
        })
    }
}

impl DouyinStrategy {
    pub fn new(guard_config: GuardConfig) -> Self {
        let mut profile = EvasionProfile::default();
        // 客户端提示头需要与伪装的桌面Chrome一致
        profile.locale_headers.insert(
            "sec-ch-ua".to_string(),
            r#""Google Chrome";v="131", "Chromium";v="131", "Not_A Brand";v="24""#.to_string(),
        );
        profile
            .locale_headers
            .insert("sec-ch-ua-mobile".to_string(), "?0".to_string());
        profile
            .locale_headers
            .insert("sec-ch-ua-platform".to_string(), "\"Windows\"".to_string());

        let indicators = DetectionIndicatorSet::new(vec![
            "验证过于频繁".to_string(),
            "请稍后重试".to_string(),
            "访问过于频繁".to_string(),
            "安全验证".to_string(),
            "验证码".to_string(),
            "请求过于频繁".to_string(),
            "请稍后再试".to_string(),
            "系统繁忙".to_string(),
        ]);

        Self {
            toolkit: EvasionToolkit::new(PLATFORM, profile),
            guard: RateLimitGuard::new(PLATFORM, indicators, guard_config),
        }
    }

    /// 套用浏览器配置中的超时与预算
    pub fn with_browser_settings(mut self, settings: &BrowserSettings) -> Self {
        self.toolkit = self.toolkit.with_browser_settings(settings);
        self
    }

    /// 按小时段选择登录入口，凌晨与工作时间走主站，晚间走移动端
    pub(crate) fn login_url_for_hour(hour: u32) -> &'static str {
        match hour {
            9..=18 => "https://www.douyin.com",
            19..=23 => "https://m.douyin.com",
            _ => "https://www.douyin.com",
        }
    }
}

#[async_trait]
impl EvasionStrategy for DouyinStrategy {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    async fn harden_context(&self, context: &dyn BrowserContext) {
        self.toolkit.harden_context(context).await;
    }

    async fn simulate_human_behavior(&self, page: &dyn BrowserPage) {
        self.toolkit.simulate_human_behavior(page).await;
    }

    async fn bypass_captcha(&self, page: &dyn BrowserPage) -> bool {
        self.toolkit.bypass_captcha(page).await
    }

    async fn enhance_page_load(&self, page: &dyn BrowserPage, url: &str) -> bool {
        self.toolkit
            .enhance_page_load(page, url, &["抖音", "douyin"])
            .await
    }

    fn optimal_login_url(&self) -> String {
        Self::login_url_for_hour(Local::now().hour()).to_string()
    }

    async fn handle_frequency_limit(&self, page: &dyn BrowserPage, attempts_used: u32) -> bool {
        self.guard.handle_frequency_limit(page, attempts_used).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::FakePage;

    #[test]
    fn test_login_url_buckets_cover_all_hours() {
        for hour in 0..24 {
            assert!(DouyinStrategy::login_url_for_hour(hour).starts_with("https://"));
        }
        assert_eq!(
            DouyinStrategy::login_url_for_hour(12),
            "https://www.douyin.com"
        );
        assert_eq!(
            DouyinStrategy::login_url_for_hour(20),
            "https://m.douyin.com"
        );
    }

    #[tokio::test]
    async fn test_client_hint_headers_applied() {
        let strategy = DouyinStrategy::default();
        let page = FakePage::alive_with("", "");
        strategy.harden_context(&page).await;

        let headers = page.extra_headers.lock().clone();
        assert_eq!(headers.get("sec-ch-ua-mobile").map(String::as_str), Some("?0"));
        assert!(headers.contains_key("User-Agent"));
    }

    #[tokio::test]
    async fn test_douyin_specific_indicator_detected() {
        let strategy = DouyinStrategy::new(GuardConfig {
            min_wait: Duration::from_millis(10),
            max_wait: Duration::from_millis(20),
            ..GuardConfig::default()
        });
        let page = FakePage::alive_with("", "系统繁忙，请稍候");
        assert!(strategy.handle_frequency_limit(&page, 0).await);
    }
}

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

const PLATFORM: &str = "xhs";

/// 小红书专属初始化脚本：伪装屏幕与设备内存信息
const XHS_STEALTH_SCRIPT: &str = r#"
if (window.navigator) {
    Object.defineProperty(navigator, 'deviceMemory', {
        get: () => 8,
        configurable: true
    });
}
Object.defineProperty(screen, 'width', {
    get: () => 1920,
    configurable: true
});
Object.defineProperty(screen, 'height', {
    get: () => 1080,
    configurable: true
});
"#;

/// 小红书规避策略
pub struct XiaohongshuStrategy {
    toolkit: EvasionToolkit,
    guard: RateLimitGuard,
}

impl Default for XiaohongshuStrategy {
    fn default() -> Self {
        Self::new(GuardConfig {
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(5),
            ..GuardConfig::default()
        })
    }
}

impl XiaohongshuStrategy {
    pub fn new(guard_config: GuardConfig) -> Self {
        let mut profile = EvasionProfile::default();
        profile.init_scripts.push(XHS_STEALTH_SCRIPT.to_string());

        let indicators = DetectionIndicatorSet::new(vec![
            "验证过于频繁".to_string(),
            "请稍后重试".to_string(),
            "访问过于频繁".to_string(),
            "安全验证".to_string(),
            "验证码".to_string(),
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

    /// 按小时段选择登录入口
    ///
    /// 不同时段的封禁率有明显差异：工作时间创作者后台最稳，
    /// 晚间用探索页，凌晨走移动端
    pub(crate) fn login_url_for_hour(hour: u32) -> &'static str {
        match hour {
            9..=18 => "https://creator.xiaohongshu.com/login",
            19..=23 => "https://www.xiaohongshu.com/explore",
            _ => "https://m.xiaohongshu.com",
        }
    }
}

#[async_trait]
impl EvasionStrategy for XiaohongshuStrategy {
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
            .enhance_page_load(page, url, &["小红书", "xiaohongshu"])
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
            let url = XiaohongshuStrategy::login_url_for_hour(hour);
            assert!(url.starts_with("https://"));
        }
        assert_eq!(
            XiaohongshuStrategy::login_url_for_hour(10),
            "https://creator.xiaohongshu.com/login"
        );
        assert_eq!(
            XiaohongshuStrategy::login_url_for_hour(21),
            "https://www.xiaohongshu.com/explore"
        );
        assert_eq!(
            XiaohongshuStrategy::login_url_for_hour(3),
            "https://m.xiaohongshu.com"
        );
    }

    #[tokio::test]
    async fn test_platform_script_injected_on_harden() {
        let strategy = XiaohongshuStrategy::default();
        let page = FakePage::alive_with("", "");
        strategy.harden_context(&page).await;

        let scripts = page.init_scripts.lock().clone();
        assert!(scripts.iter().any(|s| s.contains("deviceMemory")));
    }

    #[tokio::test]
    async fn test_browser_settings_applied_strategy_still_functional() {
        let settings = BrowserSettings {
            headless: true,
            navigation_timeout_secs: 90,
            captcha_poll_budget_secs: 1,
        };
        let strategy = XiaohongshuStrategy::default().with_browser_settings(&settings);

        let page = FakePage::alive_with("", "").with_selector(".captcha");
        // 轮询预算压到1秒，验证码未消失时很快放弃
        assert!(!strategy.bypass_captcha(&page).await);
    }

    #[tokio::test]
    async fn test_dead_page_is_terminal_for_every_method() {
        let strategy = XiaohongshuStrategy::default();
        let page = FakePage::dead();

        strategy.simulate_human_behavior(&page).await;
        assert!(strategy.bypass_captcha(&page).await);
        assert!(!strategy.enhance_page_load(&page, "https://www.xiaohongshu.com").await);
        assert!(!strategy.handle_frequency_limit(&page, 0).await);
    }
}

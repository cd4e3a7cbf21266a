// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::browser::page::{BrowserContext, BrowserPage};
use crate::config::settings::BrowserSettings;
use crate::evasion::profile::{EvasionProfile, COMMON_STEALTH_SCRIPT};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认屏蔽的重型子资源模式
const HEAVY_RESOURCE_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.svg", "*.css", "*.woff", "*.woff2", "*.ttf",
];

/// 验证码DOM标记选择器
const CAPTCHA_SELECTORS: &[&str] = &[
    ".captcha",
    ".verify",
    "[class*='captcha']",
    "[class*='verify']",
    "img[src*='captcha']",
    "img[src*='verify']",
];

/// 验证码刷新按钮选择器
const REFRESH_SELECTORS: &[&str] = &[
    "button[class*='refresh']",
    "button[class*='reload']",
    ".refresh",
    ".reload",
    "[class*='refresh']",
    "[class*='reload']",
];

/// 共享规避工具集
///
/// 承载各平台策略的默认通用能力，以注入方式组合进平台适配器，
/// 不做继承；所有操作尽力而为，单步失败记录日志后继续执行后续步骤
pub struct EvasionToolkit {
    platform: &'static str,
    profile: EvasionProfile,
    /// 验证码轮询预算
    captcha_poll_budget: Duration,
    /// 导航超时
    navigation_timeout: Duration,
    /// 导航后的稳定等待窗口（毫秒）
    settle_window: (u64, u64),
}

impl EvasionToolkit {
    pub fn new(platform: &'static str, profile: EvasionProfile) -> Self {
        Self {
            platform,
            profile,
            captcha_poll_budget: Duration::from_secs(300),
            navigation_timeout: Duration::from_secs(60),
            settle_window: (2000, 5000),
        }
    }

    /// 覆盖验证码轮询预算
    pub fn with_captcha_poll_budget(mut self, budget: Duration) -> Self {
        self.captcha_poll_budget = budget;
        self
    }

    /// 覆盖导航超时
    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// 覆盖导航后的稳定等待窗口（测试用）
    pub fn with_settle_window(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.settle_window = (min_ms, max_ms);
        self
    }

    /// 套用浏览器配置中的超时与预算
    pub fn with_browser_settings(self, settings: &BrowserSettings) -> Self {
        self.with_navigation_timeout(Duration::from_secs(settings.navigation_timeout_secs))
            .with_captcha_poll_budget(Duration::from_secs(settings.captcha_poll_budget_secs))
    }

    pub fn profile(&self) -> &EvasionProfile {
        &self.profile
    }

    /// 强化浏览器上下文
    ///
    /// 注入通用与平台专属的反检测脚本，并设置随机化请求头；
    /// 每一步失败都只记录日志，不中断剩余步骤
    pub async fn harden_context(&self, context: &dyn BrowserContext) {
        if let Err(e) = context.add_init_script(COMMON_STEALTH_SCRIPT).await {
            warn!("[{}] inject common stealth script failed: {}", self.platform, e);
        }
        for script in &self.profile.init_scripts {
            if let Err(e) = context.add_init_script(script).await {
                warn!("[{}] inject platform script failed: {}", self.platform, e);
            }
        }
        let (width, height) = self.profile.random_viewport();
        if let Err(e) = context.set_viewport(width, height).await {
            warn!("[{}] set viewport failed: {}", self.platform, e);
        }
        if let Err(e) = context.set_extra_headers(&self.random_headers()).await {
            warn!("[{}] set random headers failed: {}", self.platform, e);
        }
        debug!("[{}] browser context hardened", self.platform);
    }

    /// 组装一套随机化的请求头：轮换UA + 区域头
    pub fn random_headers(&self) -> HashMap<String, String> {
        let mut headers = self.profile.locale_headers.clone();
        headers.insert(
            "User-Agent".to_string(),
            self.profile.random_user_agent().to_string(),
        );
        headers
    }

    /// 模拟人类行为
    ///
    /// 派发2-5次随机坐标的指针事件、一次随机滚动和一次空白区域点击，
    /// 最后短暂停顿1-3秒；只尽力而为，从不报错
    pub async fn simulate_human_behavior(&self, page: &dyn BrowserPage) {
        if !page.is_alive().await {
            warn!("[{}] page gone, skip human behavior", self.platform);
            return;
        }

        let moves = rand::random_range(2..=5u32);
        let script = format!(
            r#"
            const viewport = {{
                width: window.innerWidth || 1920,
                height: window.innerHeight || 1080
            }};
            for (let i = 0; i < {moves}; i++) {{
                const x = Math.floor(Math.random() * (viewport.width - 200)) + 100;
                const y = Math.floor(Math.random() * (viewport.height - 200)) + 100;
                document.dispatchEvent(new MouseEvent('mousemove', {{
                    clientX: x, clientY: y, bubbles: true, cancelable: true
                }}));
            }}
            window.scrollTo(0, Math.random() * 100);
            setTimeout(() => {{ window.scrollTo(0, 0); }}, Math.random() * 1000 + 500);
            const cx = Math.floor(Math.random() * 150) + 50;
            const cy = Math.floor(Math.random() * 150) + 50;
            document.elementFromPoint(cx, cy)?.dispatchEvent(new MouseEvent('click', {{
                clientX: cx, clientY: cy, bubbles: true, cancelable: true, button: 0
            }}));
            "#
        );
        if let Err(e) = page.evaluate(&script).await {
            warn!("[{}] human behavior script failed: {}", self.platform, e);
            return;
        }

        let idle = Duration::from_millis(rand::random_range(1000..=3000));
        tokio::time::sleep(idle).await;
    }

    /// 绕过验证码
    ///
    /// 未检出验证码标记时立即返回true；检出后尝试点击刷新按钮，
    /// 再以1秒间隔轮询标记是否消失，轮询受预算约束
    pub async fn bypass_captcha(&self, page: &dyn BrowserPage) -> bool {
        if !page.is_alive().await {
            warn!("[{}] page gone, skip captcha check", self.platform);
            return true;
        }

        let mut present = false;
        for selector in CAPTCHA_SELECTORS {
            match page.query_selector(selector).await {
                Ok(true) => {
                    warn!("[{}] captcha detected: {}", self.platform, selector);
                    present = true;
                    break;
                }
                Ok(false) => continue,
                Err(_) => return false,
            }
        }
        if !present {
            return true;
        }

        // 先尝试刷新验证码
        for selector in REFRESH_SELECTORS {
            if let Ok(true) = page.query_selector(selector).await {
                if page.click_selector(selector).await.is_ok() {
                    info!("[{}] captcha refresh clicked: {}", self.platform, selector);
                    tokio::time::sleep(Duration::from_secs(2).min(self.captcha_poll_budget)).await;
                }
                break;
            }
        }

        // 轮询等待标记消失（人工处理或刷新生效）
        let deadline = tokio::time::Instant::now() + self.captcha_poll_budget;
        loop {
            if !page.is_alive().await {
                return false;
            }
            let mut still_present = false;
            for selector in CAPTCHA_SELECTORS {
                if let Ok(true) = page.query_selector(selector).await {
                    still_present = true;
                    break;
                }
            }
            if !still_present {
                info!("[{}] captcha resolved", self.platform);
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("[{}] captcha poll budget expired", self.platform);
                return false;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// 增强页面加载
    ///
    /// 屏蔽重型子资源、带长超时导航、随机稳定等待，
    /// 最后以标题标记校验加载结果
    pub async fn enhance_page_load(
        &self,
        page: &dyn BrowserPage,
        url: &str,
        title_markers: &[&str],
    ) -> bool {
        if !page.is_alive().await {
            warn!("[{}] page gone, skip page load", self.platform);
            return false;
        }

        let patterns: Vec<String> = HEAVY_RESOURCE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .collect();
        if let Err(e) = page.block_resources(&patterns).await {
            warn!("[{}] block heavy resources failed: {}", self.platform, e);
        }

        if let Err(e) = page.navigate(url, self.navigation_timeout).await {
            warn!("[{}] navigate failed: {}", self.platform, e);
            return false;
        }

        let (settle_min, settle_max) = self.settle_window;
        let settle = Duration::from_millis(rand::random_range(settle_min..=settle_max));
        tokio::time::sleep(settle).await;

        match page.title().await {
            Ok(title) => {
                let lowered = title.to_lowercase();
                let ok = title_markers
                    .iter()
                    .any(|marker| title.contains(marker) || lowered.contains(&marker.to_lowercase()));
                if ok {
                    info!("[{}] page loaded: {}", self.platform, title);
                } else {
                    warn!("[{}] unexpected page title: {}", self.platform, title);
                }
                ok
            }
            Err(e) => {
                warn!("[{}] read title failed: {}", self.platform, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::FakePage;
    use std::sync::atomic::Ordering;

    fn toolkit() -> EvasionToolkit {
        EvasionToolkit::new("test", EvasionProfile::default())
            .with_captcha_poll_budget(Duration::from_millis(50))
            .with_settle_window(1, 2)
    }

    #[tokio::test]
    async fn test_harden_context_injects_scripts_and_headers() {
        let page = FakePage::alive_with("", "");
        toolkit().harden_context(&page).await;

        let scripts = page.init_scripts.lock().clone();
        assert!(scripts.iter().any(|s| s.contains("navigator, 'webdriver'")));
        let headers = page.extra_headers.lock().clone();
        assert!(headers.contains_key("User-Agent"));
        assert!(headers.contains_key("Accept-Language"));
    }

    #[tokio::test]
    async fn test_harden_context_applies_viewport_from_pool() {
        let profile = EvasionProfile::default();
        let page = FakePage::alive_with("", "");
        EvasionToolkit::new("test", profile.clone())
            .harden_context(&page)
            .await;

        let viewport = page.viewport.lock().expect("viewport applied");
        assert!(profile.viewports.contains(&viewport));
    }

    #[test]
    fn test_browser_settings_override_timeouts() {
        let settings = BrowserSettings {
            headless: true,
            navigation_timeout_secs: 90,
            captcha_poll_budget_secs: 120,
        };
        let toolkit =
            EvasionToolkit::new("test", EvasionProfile::default()).with_browser_settings(&settings);
        assert_eq!(toolkit.navigation_timeout, Duration::from_secs(90));
        assert_eq!(toolkit.captcha_poll_budget, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_harden_context_survives_dead_page() {
        let page = FakePage::dead();
        // 不应panic，也不应传播错误
        toolkit().harden_context(&page).await;
        assert!(page.init_scripts.lock().is_empty());
    }

    #[tokio::test]
    async fn test_bypass_captcha_true_when_absent() {
        let page = FakePage::alive_with("正常页面", "内容");
        assert!(toolkit().bypass_captcha(&page).await);
    }

    #[tokio::test]
    async fn test_bypass_captcha_false_when_budget_expires() {
        let page = FakePage::alive_with("", "").with_selector(".captcha");
        assert!(!toolkit().bypass_captcha(&page).await);
    }

    #[tokio::test]
    async fn test_bypass_captcha_clicks_refresh_when_available() {
        let page = FakePage::alive_with("", "")
            .with_selector(".captcha")
            .with_selector(".refresh");
        toolkit().bypass_captcha(&page).await;
        assert!(page.clicked.lock().contains(&".refresh".to_string()));
    }

    #[tokio::test]
    async fn test_enhance_page_load_validates_title_marker() {
        let page = FakePage::alive_with("", "");
        *page.title_after_navigate.lock() = Some("小红书 - 你的生活指南".to_string());

        let ok = toolkit()
            .enhance_page_load(&page, "https://www.xiaohongshu.com", &["小红书", "xiaohongshu"])
            .await;
        assert!(ok);
        assert_eq!(page.navigate_count.load(Ordering::SeqCst), 1);
        assert!(!page.blocked_patterns.lock().is_empty());
    }

    #[tokio::test]
    async fn test_enhance_page_load_rejects_wrong_title() {
        let page = FakePage::alive_with("", "");
        *page.title_after_navigate.lock() = Some("安全验证".to_string());

        let ok = toolkit()
            .enhance_page_load(&page, "https://www.xiaohongshu.com", &["小红书"])
            .await;
        assert!(!ok);
    }

    #[tokio::test]
    async fn test_human_behavior_never_errors_on_dead_page() {
        let page = FakePage::dead();
        toolkit().simulate_human_behavior(&page).await;
        assert!(page.evaluated.lock().is_empty());
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::browser::page::BrowserPage;
use metrics::counter;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// 单次受控操作的重试预算
///
/// 由守卫自身创建并执行，调用方从不负责计时
#[derive(Debug, Clone)]
pub struct RetryBudget {
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 墙钟时间上限
    pub max_total: Duration,
    started: Instant,
}

impl RetryBudget {
    pub fn start(max_attempts: u32, max_total: Duration) -> Self {
        Self {
            max_attempts,
            max_total,
            started: Instant::now(),
        }
    }

    /// 已消耗的墙钟时间
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 剩余预算，耗尽后为零
    pub fn remaining(&self) -> Duration {
        self.max_total.saturating_sub(self.started.elapsed())
    }
}

/// 检测指示器集合
///
/// 平台专属的有序短语列表，按序对页面标题和正文做子串匹配，
/// 首个命中者生效
#[derive(Debug, Clone)]
pub struct DetectionIndicatorSet {
    indicators: Vec<String>,
}

impl DetectionIndicatorSet {
    pub fn new(indicators: Vec<String>) -> Self {
        Self { indicators }
    }

    /// 按序匹配标题与正文，返回首个命中的指示器
    pub fn detect<'a>(&'a self, title: &str, body: &str) -> Option<&'a str> {
        self.indicators
            .iter()
            .find(|indicator| title.contains(indicator.as_str()) || body.contains(indicator.as_str()))
            .map(|s| s.as_str())
    }
}

/// 频率限制守卫配置
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// 最大本地处理次数（超过后上抛给外层重试逻辑）
    pub max_attempts: u32,
    /// 单次调用的总时间预算
    pub max_total: Duration,
    /// 退避等待下限
    pub min_wait: Duration,
    /// 退避等待上限
    pub max_wait: Duration,
    /// 页面重载的导航超时
    pub reload_timeout: Duration,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            // 外层调度器已有重试循环，这里只本地处理一次
            max_attempts: 1,
            max_total: Duration::from_secs(10),
            min_wait: Duration::from_secs(2),
            max_wait: Duration::from_secs(5),
            reload_timeout: Duration::from_secs(30),
        }
    }
}

/// 频率限制守卫
///
/// 检测敌对响应（限流/验证码提示）并在预算内执行
/// 等待-重载-清理的退避流程；守卫的任何睡眠都不会超过剩余总预算，
/// 这是它与朴素指数退避的根本区别
pub struct RateLimitGuard {
    platform: &'static str,
    indicators: DetectionIndicatorSet,
    config: GuardConfig,
}

impl RateLimitGuard {
    pub fn new(
        platform: &'static str,
        indicators: DetectionIndicatorSet,
        config: GuardConfig,
    ) -> Self {
        Self {
            platform,
            indicators,
            config,
        }
    }

    /// 处理频率限制
    ///
    /// # 参数
    ///
    /// * `page` - 待检测的页面
    /// * `attempts_used` - 调用方在本轮外层重试中已消耗的本地处理次数
    ///
    /// # 返回值
    ///
    /// * `true` - 检测到限流并已执行退避，调用方应重新检查页面
    /// * `false` - 无需处理，或已达本地处理上限（升级给调用方），
    ///   或页面已不可用
    pub async fn handle_frequency_limit(&self, page: &dyn BrowserPage, attempts_used: u32) -> bool {
        if !page.is_alive().await {
            warn!("[{}] page gone, skip frequency limit check", self.platform);
            return false;
        }

        let budget = RetryBudget::start(self.config.max_attempts, self.config.max_total);

        // Detecting: 标题与正文各读取一次
        let title = match page.title().await {
            Ok(title) => title,
            Err(e) => {
                warn!("[{}] read title failed: {}", self.platform, e);
                return false;
            }
        };
        let body = match page.body_text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("[{}] read body failed: {}", self.platform, e);
                return false;
            }
        };

        let Some(indicator) = self.indicators.detect(&title, &body) else {
            return false;
        };

        counter!("rate_limit_detections_total", "platform" => self.platform).increment(1);

        // Escalated: 本地处理次数耗尽，升级给调用方，不再睡眠
        if attempts_used >= budget.max_attempts {
            warn!(
                "[{}] frequency limit detected but local attempts exhausted ({}/{}), escalate",
                self.platform, attempts_used, budget.max_attempts
            );
            counter!("rate_limit_escalations_total", "platform" => self.platform).increment(1);
            return false;
        }

        warn!(
            "[{}] frequency limit detected: {} (attempt {}/{})",
            self.platform,
            indicator,
            attempts_used + 1,
            budget.max_attempts
        );

        // Backoff: 等待时间永不超过剩余预算
        let remaining = budget.remaining();
        if remaining.is_zero() {
            warn!("[{}] budget already spent, skip backoff", self.platform);
            return true;
        }
        let wait = random_wait(self.config.min_wait, self.config.max_wait).min(remaining);
        info!(
            "[{}] backoff {:.1}s (elapsed {:.1}s)",
            self.platform,
            wait.as_secs_f64(),
            budget.elapsed().as_secs_f64()
        );
        tokio::time::sleep(wait).await;

        // Reloading: 有界导航超时，失败不影响流程结论
        if page.is_alive().await {
            if let Err(e) = page.reload(self.config.reload_timeout).await {
                warn!("[{}] reload failed: {}", self.platform, e);
                return true;
            }
            let jitter = random_wait(self.config.min_wait, self.config.max_wait)
                .min(budget.remaining());
            tokio::time::sleep(jitter).await;
        } else {
            return true;
        }

        // ClearingState: 尽力清除本地存储与cookie
        if page.is_alive().await {
            if let Err(e) = page
                .evaluate(
                    r#"
                    localStorage.clear();
                    sessionStorage.clear();
                    document.cookie.split(";").forEach(function(c) {
                        document.cookie = c.replace(/^ +/, "").replace(/=.*/, "=;expires=" + new Date().toUTCString() + ";path=/");
                    });
                    "#,
                )
                .await
            {
                warn!("[{}] clear storage failed: {}", self.platform, e);
            }
        }

        true
    }
}

fn random_wait(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}

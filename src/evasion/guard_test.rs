use crate::browser::testing::FakePage;
use crate::evasion::guard::{DetectionIndicatorSet, GuardConfig, RateLimitGuard, RetryBudget};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

fn indicators() -> DetectionIndicatorSet {
    DetectionIndicatorSet::new(vec![
        "验证过于频繁".to_string(),
        "访问过于频繁".to_string(),
        "安全验证".to_string(),
    ])
}

fn fast_config() -> GuardConfig {
    GuardConfig {
        max_attempts: 1,
        max_total: Duration::from_secs(10),
        min_wait: Duration::from_millis(30),
        max_wait: Duration::from_millis(60),
        reload_timeout: Duration::from_secs(5),
    }
}

#[test]
fn test_budget_remaining_clamps_to_zero() {
    let budget = RetryBudget::start(1, Duration::from_millis(0));
    assert_eq!(budget.remaining(), Duration::ZERO);
}

#[test]
fn test_indicator_order_first_match_wins() {
    let set = DetectionIndicatorSet::new(vec![
        "安全验证".to_string(),
        "访问过于频繁".to_string(),
    ]);
    let hit = set.detect("", "页面提示: 访问过于频繁，且需要安全验证");
    assert_eq!(hit, Some("安全验证"));
}

#[tokio::test]
async fn test_no_indicator_returns_false_without_side_effects() {
    let guard = RateLimitGuard::new("xhs", indicators(), fast_config());
    let page = FakePage::alive_with("正常页面", "一切正常的内容");

    assert!(!guard.handle_frequency_limit(&page, 0).await);
    assert_eq!(page.reload_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_detection_triggers_single_reload_and_returns_true() {
    let guard = RateLimitGuard::new("xhs", indicators(), fast_config());
    let page = FakePage::alive_with("", "访问过于频繁，请稍后再试");

    let handled = guard.handle_frequency_limit(&page, 0).await;
    assert!(handled);
    assert_eq!(page.reload_count.load(Ordering::SeqCst), 1);
    // 清理脚本已下发
    let evaluated = page.evaluated.lock().clone();
    assert!(evaluated.iter().any(|s| s.contains("localStorage.clear()")));
}

#[tokio::test]
async fn test_attempts_exhausted_escalates_immediately() {
    let guard = RateLimitGuard::new("xhs", indicators(), fast_config());
    let page = FakePage::alive_with("", "访问过于频繁");

    let started = Instant::now();
    let handled = guard.handle_frequency_limit(&page, 1).await;
    assert!(!handled);
    assert_eq!(page.reload_count.load(Ordering::SeqCst), 0);
    // 无任何退避睡眠
    assert!(started.elapsed() < Duration::from_millis(25));
}

#[tokio::test]
async fn test_spent_budget_skips_backoff_but_reports_handled() {
    let config = GuardConfig {
        max_total: Duration::ZERO,
        ..fast_config()
    };
    let guard = RateLimitGuard::new("xhs", indicators(), config);
    let page = FakePage::alive_with("", "访问过于频繁");

    let handled = guard.handle_frequency_limit(&page, 0).await;
    assert!(handled);
    assert_eq!(page.reload_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_wait_never_exceeds_remaining_budget() {
    // 等待窗口远大于总预算时，实际睡眠被预算截断
    let config = GuardConfig {
        max_attempts: 1,
        max_total: Duration::from_millis(80),
        min_wait: Duration::from_secs(5),
        max_wait: Duration::from_secs(10),
        reload_timeout: Duration::from_secs(5),
    };
    let guard = RateLimitGuard::new("dy", indicators(), config);
    let page = FakePage::alive_with("", "访问过于频繁");

    let started = Instant::now();
    let handled = guard.handle_frequency_limit(&page, 0).await;
    assert!(handled);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn test_dead_page_returns_false_for_guard() {
    let guard = RateLimitGuard::new("xhs", indicators(), fast_config());
    let page = FakePage::dead();

    assert!(!guard.handle_frequency_limit(&page, 0).await);
    assert_eq!(page.reload_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_indicator_in_title_also_detected() {
    let guard = RateLimitGuard::new("xhs", indicators(), fast_config());
    let page = FakePage::alive_with("安全验证 - 小红书", "正文没有异常");

    assert!(guard.handle_frequency_limit(&page, 0).await);
}

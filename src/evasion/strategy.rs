// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::browser::page::{BrowserContext, BrowserPage};
use async_trait::async_trait;

/// 平台规避策略接口
///
/// 每个内容平台一个实现；共享的默认行为由注入的
/// [`EvasionToolkit`](crate::evasion::toolkit::EvasionToolkit)提供，不使用深继承。
/// 所有方法对已关闭/消失的页面返回"无事可做"值，从不让页面消失
/// 击穿外层调度器
#[async_trait]
pub trait EvasionStrategy: Send + Sync {
    /// 平台标识
    fn platform(&self) -> &'static str;

    /// 强化新建的浏览器上下文（反检测脚本 + 随机请求头）
    async fn harden_context(&self, context: &dyn BrowserContext);

    /// 模拟人类行为，副作用操作，尽力而为
    async fn simulate_human_behavior(&self, page: &dyn BrowserPage);

    /// 检测并尝试绕过验证码
    ///
    /// 无验证码或已解决返回`true`，轮询预算耗尽返回`false`
    async fn bypass_captcha(&self, page: &dyn BrowserPage) -> bool;

    /// 增强页面加载并校验加载结果
    async fn enhance_page_load(&self, page: &dyn BrowserPage, url: &str) -> bool;

    /// 按本地时段选择最优登录URL，始终有静态兜底
    fn optimal_login_url(&self) -> String;

    /// 处理频率限制，委托给平台的频率限制守卫
    async fn handle_frequency_limit(&self, page: &dyn BrowserPage, attempts_used: u32) -> bool;
}

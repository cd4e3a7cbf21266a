// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 反检测规避模块
//!
//! 提供浏览器上下文强化、人类行为模拟、验证码绕过与频率限制
//! 守卫能力。共享能力集中在[`EvasionToolkit`]，各平台以组合方式
//! 接入并补充平台专属的脚本、指示词与退避窗口。

pub mod guard;
pub mod platforms;
pub mod profile;
pub mod strategy;
pub mod toolkit;

#[cfg(test)]
mod guard_test;

pub use guard::{DetectionIndicatorSet, GuardConfig, RateLimitGuard, RetryBudget};
pub use platforms::{DouyinStrategy, XiaohongshuStrategy};
pub use profile::EvasionProfile;
pub use strategy::EvasionStrategy;
pub use toolkit::EvasionToolkit;

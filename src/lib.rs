// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 浏览器模块
///
/// 浏览器自动化边界：页面/上下文trait与chromium实现
pub mod browser;

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 规避模块
///
/// 反检测、验证码绕过与频率限制守卫
pub mod evasion;

/// 代理模块
///
/// 代理IP池：供应商适配器与TTL缓存
pub mod proxy;

/// 调度模块
///
/// 平台遍历调度与并发受限的内容增强
pub mod scheduler;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;

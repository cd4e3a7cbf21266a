// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 代理模块
///
/// 提供代理IP的缓存、供应商适配和轮换获取能力
pub mod cache;
pub mod provider;
pub mod providers;
pub mod types;

pub use cache::ProxyCache;
pub use provider::{ProxyError, ProxyProvider};
pub use types::{ProviderName, ProxyRecord};

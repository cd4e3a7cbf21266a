// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::proxy::types::{ProviderName, ProxyRecord};
use async_trait::async_trait;
use thiserror::Error;

/// 代理层错误类型
#[derive(Error, Debug)]
pub enum ProxyError {
    /// 供应商返回了格式错误或错误标记的载荷（批次级别，不影响缓存）
    #[error("代理商响应异常: {0}")]
    Provider(String),

    /// 缓存加补充获取后仍未满足请求数量
    #[error("代理不足: 请求{requested}个, 实际{got}个")]
    Exhausted { requested: usize, got: usize },

    /// 请求失败
    #[error("请求失败: {0}")]
    Request(#[from] reqwest::Error),
}

/// 代理供应商接口
///
/// 具体适配器负责解析各供应商的专有线路格式；
/// `fetch`遵循先取缓存、不足再向供应商补充的策略，
/// 供应商欠供时返回较短的列表而非报错——调用方必须把代理稀缺当作降级条件处理
#[async_trait]
pub trait ProxyProvider: Send + Sync {
    /// 获取至多`count`个有效代理记录
    ///
    /// # 参数
    ///
    /// * `count` - 需要的代理数量
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<ProxyRecord>)` - 可能短于`count`的有效记录列表
    /// * `Err(ProxyError)` - 供应商返回空载荷或已知错误标记
    async fn fetch(&self, count: usize) -> Result<Vec<ProxyRecord>, ProxyError>;

    /// 释放一个代理IP（尽力而为，失败返回false）
    async fn release(&self, ip: &str, port: u16) -> bool;

    /// 查询账户余额（尽力而为，失败返回0.0）
    async fn balance(&self) -> f64;

    /// 供应商名称
    fn name(&self) -> ProviderName;
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::proxy::cache::ProxyCache;
use crate::proxy::provider::{ProxyError, ProxyProvider};
use crate::proxy::providers::parse_proxy_line;
use crate::proxy::types::{ProviderName, ProxyRecord};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use metrics::counter;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_API_BASE: &str = "https://proxy.qg.net/";

/// 青果代理适配器
///
/// 短效弹性提取，线路格式为纯文本、每行一个`ip:port,过期时间戳`；
/// 以供应商Key作为代理认证用户名
pub struct QingguoProxy {
    key: String,
    pwd: Option<String>,
    api_base: String,
    cache: Arc<ProxyCache>,
    client: reqwest::Client,
}

impl QingguoProxy {
    /// 创建青果代理适配器
    ///
    /// # 参数
    ///
    /// * `key` - 青果代理的Key
    /// * `pwd` - 青果代理的密码（可选）
    /// * `cache` - 该供应商专属的代理缓存
    pub fn new(key: String, pwd: Option<String>, cache: Arc<ProxyCache>) -> Self {
        Self {
            key,
            pwd,
            api_base: DEFAULT_API_BASE.to_string(),
            cache,
            client: reqwest::Client::new(),
        }
    }

    /// 覆盖API地址（测试用）
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn auth_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("Key", self.key.clone())];
        if let Some(pwd) = &self.pwd {
            params.push(("Pwd", pwd.clone()));
        }
        params
    }

    /// 解析供应商的纯文本载荷，坏行跳过不致命
    fn parse_payload(&self, payload: &str) -> Result<Vec<ProxyRecord>, ProxyError> {
        let text = payload.trim();
        if text.is_empty() {
            return Err(ProxyError::Provider("empty response".to_string()));
        }
        if text.starts_with("error") {
            return Err(ProxyError::Provider(text.to_string()));
        }

        let now = Utc::now();
        let mut records = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((ip, port, expire_ts)) = parse_proxy_line(line) else {
                warn!("[QingguoProxy] parse proxy line failed, skip: {}", line);
                continue;
            };
            let Some(expires_at) = Utc.timestamp_opt(expire_ts, 0).single() else {
                warn!("[QingguoProxy] invalid expire timestamp, skip: {}", line);
                continue;
            };
            let record = ProxyRecord {
                provider: ProviderName::Qingguo,
                ip,
                port,
                user: self.key.clone(),
                password: self.pwd.clone().unwrap_or_default(),
                protocol: "http://".to_string(),
                expires_at,
            };
            if !record.is_valid(now) {
                warn!(
                    "[QingguoProxy] vendor returned already-expired proxy, skip: {}",
                    record.cache_key()
                );
                continue;
            }
            records.push(record);
        }
        Ok(records)
    }
}

#[async_trait]
impl ProxyProvider for QingguoProxy {
    async fn fetch(&self, count: usize) -> Result<Vec<ProxyRecord>, ProxyError> {
        // 优先从缓存中拿IP
        let cached = self.cache.get_valid(count);
        if cached.len() >= count {
            return Ok(cached);
        }

        let need = count - cached.len();
        let mut params = self.auth_params();
        params.push(("num", need.to_string()));
        params.push(("format", "txt".to_string()));
        params.push(("sep", "1".to_string()));

        let response = self
            .client
            .get(format!("{}allocate", self.api_base))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            counter!("proxy_fetch_errors_total", "provider" => "qingguo").increment(1);
            return Err(ProxyError::Provider(format!(
                "status {} body {}",
                status, body
            )));
        }

        let payload = response.text().await?;
        let fetched = self.parse_payload(&payload)?;

        // 新获取的记录写入缓存，并与缓存命中的部分去重合并
        let mut seen: HashSet<String> = cached.iter().map(|r| r.cache_key()).collect();
        let mut result = cached;
        for record in fetched {
            let key = record.cache_key();
            self.cache.put(key.clone(), record.clone());
            if seen.insert(key) {
                result.push(record);
            }
        }

        counter!("proxy_fetch_total", "provider" => "qingguo").increment(1);
        info!(
            "[QingguoProxy] fetch done, requested: {}, delivered: {}",
            count,
            result.len()
        );
        Ok(result)
    }

    async fn release(&self, ip: &str, port: u16) -> bool {
        let mut params = self.auth_params();
        params.push(("ip", ip.to_string()));
        params.push(("port", port.to_string()));

        let response = self
            .client
            .get(format!("{}release", self.api_base))
            .query(&params)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let body = resp.text().await.unwrap_or_default();
                if body.trim() == "success" {
                    info!("[QingguoProxy] release proxy {}:{} success", ip, port);
                    self.cache
                        .evict(&format!("{}_{}_{}", ProviderName::Qingguo, ip, port));
                    true
                } else {
                    warn!("[QingguoProxy] release proxy failed: {}", body.trim());
                    false
                }
            }
            Ok(resp) => {
                warn!(
                    "[QingguoProxy] release proxy status code not 200: {}",
                    resp.status()
                );
                false
            }
            Err(e) => {
                warn!("[QingguoProxy] release proxy request error: {}", e);
                false
            }
        }
    }

    async fn balance(&self) -> f64 {
        let params = self.auth_params();
        let response = self
            .client
            .get(format!("{}query", self.api_base))
            .query(&params)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let body = resp.text().await.unwrap_or_default();
                match body.trim().parse::<f64>() {
                    Ok(balance) => {
                        info!("[QingguoProxy] current balance: {}", balance);
                        balance
                    }
                    Err(_) => {
                        warn!("[QingguoProxy] invalid balance format: {}", body.trim());
                        0.0
                    }
                }
            }
            Ok(resp) => {
                warn!(
                    "[QingguoProxy] query balance status code not 200: {}",
                    resp.status()
                );
                0.0
            }
            Err(e) => {
                warn!("[QingguoProxy] query balance request error: {}", e);
                0.0
            }
        }
    }

    fn name(&self) -> ProviderName {
        ProviderName::Qingguo
    }
}

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
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_API_BASE: &str = "https://dps.kdlapi.com/";

/// 快代理响应信封
#[derive(Debug, Deserialize)]
struct KdlResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: KdlData,
}

#[derive(Debug, Default, Deserialize)]
struct KdlData {
    #[serde(default)]
    proxy_list: Vec<String>,
    #[serde(default)]
    balance: Option<f64>,
}

/// 快代理适配器
///
/// 私密代理提取，JSON信封内的线路仍为`ip:port,过期时间戳`格式
pub struct KuaidailiProxy {
    user_name: String,
    user_pwd: String,
    secret_id: String,
    signature: String,
    api_base: String,
    cache: Arc<ProxyCache>,
    client: reqwest::Client,
}

impl KuaidailiProxy {
    /// 创建快代理适配器
    pub fn new(
        user_name: String,
        user_pwd: String,
        secret_id: String,
        signature: String,
        cache: Arc<ProxyCache>,
    ) -> Self {
        Self {
            user_name,
            user_pwd,
            secret_id,
            signature,
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
        vec![
            ("secret_id", self.secret_id.clone()),
            ("signature", self.signature.clone()),
        ]
    }

    async fn get_envelope(
        &self,
        uri: &str,
        extra: Vec<(&'static str, String)>,
    ) -> Result<KdlResponse, ProxyError> {
        let mut params = self.auth_params();
        params.extend(extra);

        let response = self
            .client
            .get(format!("{}{}", self.api_base, uri))
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProxyError::Provider(format!(
                "status {}",
                response.status()
            )));
        }

        let envelope: KdlResponse = response
            .json()
            .await
            .map_err(|e| ProxyError::Provider(format!("invalid json envelope: {}", e)))?;
        if envelope.code != 0 {
            return Err(ProxyError::Provider(format!(
                "code {} msg {}",
                envelope.code, envelope.msg
            )));
        }
        Ok(envelope)
    }
}

#[async_trait]
impl ProxyProvider for KuaidailiProxy {
    async fn fetch(&self, count: usize) -> Result<Vec<ProxyRecord>, ProxyError> {
        // 优先从缓存中拿IP
        let cached = self.cache.get_valid(count);
        if cached.len() >= count {
            return Ok(cached);
        }

        let need = count - cached.len();
        let extra = vec![
            ("num", need.to_string()),
            ("pt", "1".to_string()),
            ("format", "json".to_string()),
            ("sep", "1".to_string()),
            ("f_et", "1".to_string()),
        ];

        let envelope = match self.get_envelope("api/getdps/", extra).await {
            Ok(env) => env,
            Err(e) => {
                counter!("proxy_fetch_errors_total", "provider" => "kuaidaili").increment(1);
                return Err(e);
            }
        };

        let now = Utc::now();
        let mut seen: HashSet<String> = cached.iter().map(|r| r.cache_key()).collect();
        let mut result = cached;
        for line in &envelope.data.proxy_list {
            let Some((ip, port, expire_ts)) = parse_proxy_line(line) else {
                warn!("[KuaidailiProxy] parse proxy line failed, skip: {}", line);
                continue;
            };
            let Some(expires_at) = Utc.timestamp_opt(expire_ts, 0).single() else {
                warn!("[KuaidailiProxy] invalid expire timestamp, skip: {}", line);
                continue;
            };
            let record = ProxyRecord {
                provider: ProviderName::Kuaidaili,
                ip,
                port,
                user: self.user_name.clone(),
                password: self.user_pwd.clone(),
                protocol: "http://".to_string(),
                expires_at,
            };
            if !record.is_valid(now) {
                warn!(
                    "[KuaidailiProxy] vendor returned already-expired proxy, skip: {}",
                    record.cache_key()
                );
                continue;
            }
            let key = record.cache_key();
            self.cache.put(key.clone(), record.clone());
            if seen.insert(key) {
                result.push(record);
            }
        }

        counter!("proxy_fetch_total", "provider" => "kuaidaili").increment(1);
        info!(
            "[KuaidailiProxy] fetch done, requested: {}, delivered: {}",
            count,
            result.len()
        );
        Ok(result)
    }

    async fn release(&self, ip: &str, port: u16) -> bool {
        let extra = vec![("proxy", format!("{}:{}", ip, port))];
        match self.get_envelope("api/releasedps/", extra).await {
            Ok(_) => {
                info!("[KuaidailiProxy] release proxy {}:{} success", ip, port);
                self.cache
                    .evict(&format!("{}_{}_{}", ProviderName::Kuaidaili, ip, port));
                true
            }
            Err(e) => {
                warn!("[KuaidailiProxy] release proxy failed: {}", e);
                false
            }
        }
    }

    async fn balance(&self) -> f64 {
        match self.get_envelope("api/getaccountbalance/", vec![]).await {
            Ok(envelope) => {
                let balance = envelope.data.balance.unwrap_or(0.0);
                info!("[KuaidailiProxy] current balance: {}", balance);
                balance
            }
            Err(e) => {
                warn!("[KuaidailiProxy] query balance failed: {}", e);
                0.0
            }
        }
    }

    fn name(&self) -> ProviderName {
        ProviderName::Kuaidaili
    }
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::proxy::types::ProxyRecord;
use chrono::Utc;
use dashmap::DashMap;
use metrics::counter;
use tracing::debug;

/// 代理IP缓存
///
/// 以`供应商_IP_端口`为键的TTL存储，读取时惰性淘汰过期记录，
/// 绝不向调用方返回已过期的记录
#[derive(Default)]
pub struct ProxyCache {
    entries: DashMap<String, ProxyRecord>,
}

impl ProxyCache {
    /// 创建空缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或覆盖一条记录
    pub fn put(&self, key: String, record: ProxyRecord) {
        self.entries.insert(key, record);
    }

    /// 读取至多`count`条未过期记录，途中淘汰遇到的过期记录
    ///
    /// 可能返回少于请求数量的记录（包括零条），从不报错
    pub fn get_valid(&self, count: usize) -> Vec<ProxyRecord> {
        let now = Utc::now();
        let mut valid = Vec::new();
        let mut expired_keys = Vec::new();

        for entry in self.entries.iter() {
            if entry.value().is_valid(now) {
                if valid.len() < count {
                    valid.push(entry.value().clone());
                }
            } else {
                expired_keys.push(entry.key().clone());
            }
        }

        for key in expired_keys {
            self.entries.remove(&key);
            counter!("proxy_cache_evictions_total").increment(1);
            debug!("Evicted expired proxy from cache: {}", key);
        }

        valid
    }

    /// 幂等移除一条记录
    pub fn evict(&self, key: &str) {
        self.entries.remove(key);
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// 当前缓存条数（含尚未惰性淘汰的过期记录）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

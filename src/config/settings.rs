// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::evasion::guard::GuardConfig;
use crate::proxy::providers::kuaidaili::KuaidailiProxy;
use crate::proxy::providers::qingguo::QingguoProxy;
use crate::proxy::{ProxyCache, ProxyProvider};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// 应用程序配置设置
///
/// 包含爬取、代理、频率限制守卫和浏览器等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 爬取配置
    pub crawler: CrawlerSettings,
    /// 代理配置
    pub proxy: ProxySettings,
    /// 频率限制守卫配置
    pub guard: GuardSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
}

/// 爬取配置设置
#[derive(Debug, Deserialize)]
pub struct CrawlerSettings {
    /// 单次遍历最多收集的内容条数
    pub max_count: usize,
    /// 详情/评论增强的并发上限
    pub max_concurrency: usize,
    /// 是否抓取评论
    pub enable_comments: bool,
    /// 关键词分页起始页码
    pub start_page: u32,
}

/// 代理配置设置
#[derive(Debug, Deserialize)]
pub struct ProxySettings {
    /// 是否启用IP代理
    pub enabled: bool,
    /// 代理供应商 (qingguo, kuaidaili)
    pub provider: String,
    /// 青果代理Key
    pub qingguo_key: Option<String>,
    /// 青果代理密码（可选）
    pub qingguo_pwd: Option<String>,
    /// 快代理SecretId
    pub kuaidaili_secret_id: Option<String>,
    /// 快代理签名
    pub kuaidaili_signature: Option<String>,
    /// 快代理订单用户名
    pub kuaidaili_user: Option<String>,
    /// 快代理订单密码
    pub kuaidaili_pwd: Option<String>,
}

impl ProxySettings {
    /// 按配置实例化代理供应商适配器
    ///
    /// # 返回值
    ///
    /// * `Ok(Arc<dyn ProxyProvider>)` - 配置完整的供应商适配器
    /// * `Err(ConfigError)` - 供应商未知或缺少必填凭据
    pub fn build_provider(
        &self,
        cache: Arc<ProxyCache>,
    ) -> Result<Arc<dyn ProxyProvider>, ConfigError> {
        match self.provider.as_str() {
            "qingguo" => {
                let key = self.qingguo_key.clone().ok_or_else(|| {
                    ConfigError::Message("proxy.qingguo_key is required".to_string())
                })?;
                Ok(Arc::new(QingguoProxy::new(
                    key,
                    self.qingguo_pwd.clone(),
                    cache,
                )))
            }
            "kuaidaili" => {
                let secret_id = self.kuaidaili_secret_id.clone().ok_or_else(|| {
                    ConfigError::Message("proxy.kuaidaili_secret_id is required".to_string())
                })?;
                let signature = self.kuaidaili_signature.clone().ok_or_else(|| {
                    ConfigError::Message("proxy.kuaidaili_signature is required".to_string())
                })?;
                Ok(Arc::new(KuaidailiProxy::new(
                    self.kuaidaili_user.clone().unwrap_or_default(),
                    self.kuaidaili_pwd.clone().unwrap_or_default(),
                    secret_id,
                    signature,
                    cache,
                )))
            }
            other => Err(ConfigError::Message(format!(
                "unknown proxy provider: {}",
                other
            ))),
        }
    }
}

/// 频率限制守卫配置设置
#[derive(Debug, Deserialize)]
pub struct GuardSettings {
    /// 本地处理的最大尝试次数
    pub max_attempts: u32,
    /// 单次处理的总时间预算（秒）
    pub max_total_secs: u64,
    /// 退避等待下限（秒）
    pub min_wait_secs: u64,
    /// 退避等待上限（秒）
    pub max_wait_secs: u64,
    /// 重载页面的导航超时（秒）
    pub reload_timeout_secs: u64,
}

impl GuardSettings {
    /// 转换为守卫运行时配置
    pub fn to_guard_config(&self) -> GuardConfig {
        GuardConfig {
            max_attempts: self.max_attempts,
            max_total: Duration::from_secs(self.max_total_secs),
            min_wait: Duration::from_secs(self.min_wait_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
            reload_timeout: Duration::from_secs(self.reload_timeout_secs),
        }
    }
}

/// 浏览器配置设置
#[derive(Debug, Deserialize)]
pub struct BrowserSettings {
    /// 是否无头运行
    pub headless: bool,
    /// 导航超时（秒）
    pub navigation_timeout_secs: u64,
    /// 验证码轮询预算（秒）
    pub captcha_poll_budget_secs: u64,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # 返回值
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Default crawler settings
            .set_default("crawler.max_count", 200)?
            .set_default("crawler.max_concurrency", 1)?
            .set_default("crawler.enable_comments", false)?
            .set_default("crawler.start_page", 1)?
            // Default proxy settings
            .set_default("proxy.enabled", false)?
            .set_default("proxy.provider", "qingguo")?
            // Default guard settings
            .set_default("guard.max_attempts", 1)?
            .set_default("guard.max_total_secs", 10)?
            .set_default("guard.min_wait_secs", 2)?
            .set_default("guard.max_wait_secs", 5)?
            .set_default("guard.reload_timeout_secs", 30)?
            // Default browser settings
            .set_default("browser.headless", true)?
            .set_default("browser.navigation_timeout_secs", 60)?
            .set_default("browser.captcha_poll_budget_secs", 300)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("MEDIACRAWL").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_files_or_env() {
        let settings = Settings::new().expect("defaults should load");
        assert_eq!(settings.crawler.max_count, 200);
        assert_eq!(settings.crawler.max_concurrency, 1);
        assert_eq!(settings.proxy.provider, "qingguo");
        assert!(!settings.proxy.enabled);
        assert!(settings.proxy.qingguo_key.is_none());
        assert!(settings.browser.headless);
    }

    #[test]
    fn test_build_provider_by_name() {
        let mut proxy = ProxySettings {
            enabled: true,
            provider: "qingguo".to_string(),
            qingguo_key: Some("key".to_string()),
            qingguo_pwd: None,
            kuaidaili_secret_id: None,
            kuaidaili_signature: None,
            kuaidaili_user: None,
            kuaidaili_pwd: None,
        };
        let provider = proxy.build_provider(Arc::new(ProxyCache::new())).unwrap();
        assert_eq!(provider.name(), crate::proxy::ProviderName::Qingguo);

        proxy.provider = "kuaidaili".to_string();
        proxy.kuaidaili_secret_id = Some("sid".to_string());
        proxy.kuaidaili_signature = Some("sig".to_string());
        let provider = proxy.build_provider(Arc::new(ProxyCache::new())).unwrap();
        assert_eq!(provider.name(), crate::proxy::ProviderName::Kuaidaili);
    }

    #[test]
    fn test_build_provider_rejects_missing_credentials_and_unknown_vendor() {
        let mut proxy = ProxySettings {
            enabled: true,
            provider: "qingguo".to_string(),
            qingguo_key: None,
            qingguo_pwd: None,
            kuaidaili_secret_id: None,
            kuaidaili_signature: None,
            kuaidaili_user: None,
            kuaidaili_pwd: None,
        };
        assert!(proxy.build_provider(Arc::new(ProxyCache::new())).is_err());

        proxy.provider = "unknown-vendor".to_string();
        assert!(proxy.build_provider(Arc::new(ProxyCache::new())).is_err());
    }

    #[test]
    fn test_guard_settings_convert_to_runtime_config() {
        let settings = Settings::new().expect("defaults should load");
        let guard = settings.guard.to_guard_config();
        assert_eq!(guard.max_attempts, 1);
        assert_eq!(guard.max_total, Duration::from_secs(10));
        assert_eq!(guard.min_wait, Duration::from_secs(2));
        assert_eq!(guard.max_wait, Duration::from_secs(5));
    }
}

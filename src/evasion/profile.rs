// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;

/// 通用反检测初始化脚本
///
/// 隐藏自动化标记、补齐真实浏览器应有的全局对象、
/// 伪装插件/语言字段，并给指针事件派发加入随机延迟
pub const COMMON_STEALTH_SCRIPT: &str = r#"
// 1. 隐藏自动化特征
Object.defineProperty(navigator, 'webdriver', {
    get: () => undefined,
    configurable: true
});

// 2. 删除webdriver相关变量
delete window.webdriver;
delete window.__webdriver_script_fn;
delete window.__webdriver_evaluate;
delete window.__selenium_evaluate;
delete window.__webdriver_unwrapped;
delete window.__webdriver_script_func;
delete window.__$webdriverAsyncExecutor;
delete window.__lastWatirAlert;
delete window.__lastWatirConfirm;
delete window.__lastWatirPrompt;

// 3. 完善chrome对象，避免其缺失本身成为特征
if (!window.chrome) {
    window.chrome = {};
}
if (!window.chrome.runtime) {
    window.chrome.runtime = {
        onConnect: {
            addListener: function() {},
            removeListener: function() {},
            hasListener: function() { return false; }
        },
        connect: function() {
            throw new Error('Extension context invalidated.');
        },
        sendMessage: function() {
            throw new Error('Extension context invalidated.');
        }
    };
}

// 4. 伪装为可信的桌面环境
Object.defineProperty(navigator, 'plugins', {
    get: () => [1, 2, 3, 4, 5],
    configurable: true
});
Object.defineProperty(navigator, 'languages', {
    get: () => ['zh-CN', 'zh', 'en'],
    configurable: true
});
Object.defineProperty(navigator, 'hardwareConcurrency', {
    get: () => 8,
    configurable: true
});

// 5. 屏蔽针对自动化痕迹的选择器探测
const originalQuerySelector = document.querySelector;
const originalQuerySelectorAll = document.querySelectorAll;
document.querySelector = function(selector) {
    if (selector.includes('webdriver') || selector.includes('selenium')) {
        return null;
    }
    return originalQuerySelector.call(this, selector);
};
document.querySelectorAll = function(selector) {
    if (selector.includes('webdriver') || selector.includes('selenium')) {
        return [];
    }
    return originalQuerySelectorAll.call(this, selector);
};

// 6. 指针事件加入随机延迟，打散均匀时序指纹
const originalAddEventListener = EventTarget.prototype.addEventListener;
EventTarget.prototype.addEventListener = function(type, listener, options) {
    if (type === 'mousedown' || type === 'mouseup' || type === 'click') {
        const originalListener = listener;
        listener = function(event) {
            setTimeout(() => {
                originalListener.call(this, event);
            }, Math.random() * 50);
        };
    }
    return originalAddEventListener.call(this, type, listener, options);
};
"#;

/// 浏览器伪装档案
///
/// 应用到新浏览器上下文的强化载荷，平台级别不可变；
/// 每次创建上下文时从池中伪随机选取具体值
#[derive(Debug, Clone)]
pub struct EvasionProfile {
    /// User-Agent池
    pub user_agents: Vec<String>,
    /// 视口尺寸池
    pub viewports: Vec<(u32, u32)>,
    /// 区域相关的固定请求头
    pub locale_headers: HashMap<String, String>,
    /// 平台专属的初始化脚本（在通用脚本之后注入）
    pub init_scripts: Vec<String>,
}

impl Default for EvasionProfile {
    fn default() -> Self {
        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0".to_string(),
            "Mozilla/5.0 (iPhone; CPU iPhone OS 16_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1".to_string(),
            "Mozilla/5.0 (Linux; Android 10; SM-G975F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36".to_string(),
        ];

        let mut locale_headers = HashMap::new();
        locale_headers.insert(
            "Accept-Language".to_string(),
            "zh-CN,zh;q=0.9,en;q=0.8".to_string(),
        );
        locale_headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,image/apng,*/*;q=0.8"
                .to_string(),
        );
        locale_headers.insert("Accept-Encoding".to_string(), "gzip, deflate, br".to_string());
        locale_headers.insert("Cache-Control".to_string(), "no-cache".to_string());
        locale_headers.insert("Pragma".to_string(), "no-cache".to_string());
        locale_headers.insert("Sec-Fetch-Dest".to_string(), "document".to_string());
        locale_headers.insert("Sec-Fetch-Mode".to_string(), "navigate".to_string());
        locale_headers.insert("Sec-Fetch-Site".to_string(), "none".to_string());
        locale_headers.insert("Sec-Fetch-User".to_string(), "?1".to_string());
        locale_headers.insert("Upgrade-Insecure-Requests".to_string(), "1".to_string());

        Self {
            user_agents,
            viewports: vec![(1920, 1080), (1536, 864), (1440, 900), (1366, 768)],
            locale_headers,
            init_scripts: Vec::new(),
        }
    }
}

/// 池为空时兜底的User-Agent
const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// 池为空时兜底的视口尺寸
const FALLBACK_VIEWPORT: (u32, u32) = (1920, 1080);

impl EvasionProfile {
    /// 从池中随机选取一个User-Agent，空池时返回兜底值
    pub fn random_user_agent(&self) -> &str {
        if self.user_agents.is_empty() {
            return FALLBACK_USER_AGENT;
        }
        let idx = rand::random_range(0..self.user_agents.len());
        &self.user_agents[idx]
    }

    /// 从池中随机选取一个视口尺寸，空池时返回兜底值
    pub fn random_viewport(&self) -> (u32, u32) {
        if self.viewports.is_empty() {
            return FALLBACK_VIEWPORT;
        }
        let idx = rand::random_range(0..self.viewports.len());
        self.viewports[idx]
    }
}

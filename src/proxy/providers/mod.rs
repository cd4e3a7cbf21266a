// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod kuaidaili;
pub mod qingguo;


use once_cell::sync::Lazy;
use regex::Regex;

/// 供应商线路格式：`ip:port,过期时间戳（秒）`
static PROXY_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}):(\d{1,5}),(\d+)").expect("valid regex")
});

/// 解析一行代理信息
///
/// 返回`(ip, port, 过期时间戳)`，格式不符时返回`None`，
/// 由调用方记录日志并跳过该行
pub(crate) fn parse_proxy_line(line: &str) -> Option<(String, u16, i64)> {
    let caps = PROXY_LINE_RE.captures(line)?;
    let ip = caps.get(1)?.as_str().to_string();
    let port: u16 = caps.get(2)?.as_str().parse().ok()?;
    let expire_ts: i64 = caps.get(3)?.as_str().parse().ok()?;
    Some((ip, port, expire_ts))
}

// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 平台规避适配器

pub mod douyin;
pub mod xiaohongshu;

pub use douyin::DouyinStrategy;
pub use xiaohongshu::XiaohongshuStrategy;

//! 投递上下文
//!
//! 封装"我正在处理哪个平台的第几个职位"这一信息

use std::fmt::Display;

use crate::models::Platform;

/// 投递上下文，仅用于日志
#[derive(Debug, Clone)]
pub struct ApplyCtx {
    pub platform: Platform,

    /// 本轮该平台内的序号（从1开始）
    pub posting_index: usize,
}

impl ApplyCtx {
    pub fn new(platform: Platform, posting_index: usize) -> Self {
        Self {
            platform,
            posting_index,
        }
    }
}

impl Display for ApplyCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} #{}]", self.platform, self.posting_index)
    }
}

//! 平台驱动
//!
//! 每个平台一个独立实现，互不共享可变状态。驱动只负责：
//! 登录、搜索（惰性流）、对单个职位执行投递状态机。

pub mod dom;
pub mod indeed;
pub mod linkedin;
pub mod search;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::AuthError;
use crate::models::{ApplicationRecord, JobPosting, Platform};
use crate::services::QuestionResolver;
use crate::workflow::ApplyCtx;

pub use indeed::{IndeedCredentials, IndeedDriver};
pub use linkedin::{LinkedInCredentials, LinkedInDriver};
pub use search::{search_stream, SearchBackend, MAX_RESULT_PAGES};

/// 已登录会话可以直接复用的时长（分钟）
pub const SESSION_TTL_MINUTES: i64 = 30;

/// 平台驱动
#[async_trait]
pub trait PlatformDriver: Send {
    fn platform(&self) -> Platform;

    /// 登录；失败时本轮不再重试
    async fn authenticate(&mut self) -> Result<(), AuthError>;

    /// 标题 × 地点 的惰性搜索流，已按 url 去重
    fn search(&self, titles: &[String], locations: &[String]) -> BoxStream<'static, JobPosting>;

    /// 投递单个职位，任何结果都折叠为一条记录
    async fn apply(
        &mut self,
        posting: JobPosting,
        resolver: &QuestionResolver,
        ctx: &ApplyCtx,
    ) -> ApplicationRecord;

    /// 释放浏览器等资源
    async fn shutdown(&mut self) {}
}

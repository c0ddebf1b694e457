//! 通知分发器 - 入站通知的唯一入口
//!
//! 每条通知依次经过四个阶段：toast → 徽标 → 提示音 → 分类更新。
//! 每个阶段运行在独立的失败边界中，前一个阶段出错或 panic 不影响后续阶段。

use super::payload::Notification;
use crate::best_effort::guard;
use anyhow::Result;
use tracing::{debug, info};

/// 分发阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Render,
    Badge,
    Sound,
    Category,
}

impl Stage {
    /// 固定执行顺序
    pub const ORDER: [Stage; 4] = [Stage::Render, Stage::Badge, Stage::Sound, Stage::Category];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Render => "render",
            Stage::Badge => "badge",
            Stage::Sound => "sound",
            Stage::Category => "category",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 阶段执行结果
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// 已执行
    Done,
    /// 跳过（元素缺失、无对应更新器等）
    Skipped(String),
    /// 失败（错误或 panic，已记录日志）
    Failed(String),
}

/// 分发阶段 trait
pub trait NotificationStage: Send + Sync {
    fn handle(&self, notification: &Notification) -> Result<StageOutcome>;
}

/// 通知分发器
pub struct NotificationDispatcher {
    stages: [(Stage, Box<dyn NotificationStage>); 4],
}

impl NotificationDispatcher {
    /// 按固定顺序组装四个阶段
    pub fn new(
        render: impl NotificationStage + 'static,
        badge: impl NotificationStage + 'static,
        sound: impl NotificationStage + 'static,
        category: impl NotificationStage + 'static,
    ) -> Self {
        Self {
            stages: [
                (Stage::Render, Box::new(render) as Box<dyn NotificationStage>),
                (Stage::Badge, Box::new(badge) as Box<dyn NotificationStage>),
                (Stage::Sound, Box::new(sound) as Box<dyn NotificationStage>),
                (Stage::Category, Box::new(category) as Box<dyn NotificationStage>),
            ],
        }
    }

    /// 处理一条通知；所有阶段都会执行，且每个只执行一次
    pub fn on_notification(&self, notification: &Notification) -> Vec<(Stage, StageOutcome)> {
        info!(
            category = %notification.category,
            message = %notification.message,
            "Notification received"
        );

        let mut results = Vec::with_capacity(self.stages.len());
        for (stage, handler) in &self.stages {
            let outcome = match guard(stage.as_str(), || handler.handle(notification)) {
                Ok(outcome) => outcome,
                Err(e) => StageOutcome::Failed(e),
            };
            debug!(stage = %stage, outcome = ?outcome, "Stage finished");
            results.push((*stage, outcome));
        }
        results
    }
}

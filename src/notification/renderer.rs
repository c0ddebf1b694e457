//! Toast 渲染 - 每条通知生成一个短暂显示的 toast

use super::dispatcher::{NotificationStage, StageOutcome};
use super::formatter::{format_relative_time, Clock, SystemClock};
use super::payload::Notification;
use crate::page::{self, SharedPage, ToastElement, ToastId};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 默认显示时长（与 data-bs-delay 一致）
pub const DEFAULT_TOAST_LIFETIME: Duration = Duration::from_millis(5000);
/// Toast 图标
pub const TOAST_ICON: &str = "🔔";

/// Toast 渲染器
pub struct NotificationRenderer {
    page: SharedPage,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl NotificationRenderer {
    pub fn new(page: SharedPage) -> Self {
        Self {
            page,
            lifetime: DEFAULT_TOAST_LIFETIME,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 渲染 toast；容器不存在时返回 `None`
    ///
    /// 在 tokio runtime 中调用时会为这个 toast 安排自动移除。
    pub fn render(&self, notification: &Notification) -> Option<ToastId> {
        let time_label = format_relative_time(notification.timestamp, self.clock.now());

        let id = {
            let mut page = page::lock(&self.page);
            let container = page.toast_container.as_mut()?;
            let id = container.next_id();
            container.append(ToastElement {
                id,
                icon: TOAST_ICON.to_string(),
                title: notification.category.title().to_string(),
                time_label,
                body: notification.message.clone(),
                shown_at: Instant::now(),
                lifetime: self.lifetime,
            });
            id
        };

        info!(
            toast = id.0,
            category = %notification.category,
            message = %notification.message,
            "Toast shown"
        );
        self.schedule_removal(id);
        Some(id)
    }

    /// 手动关闭（关闭按钮）
    pub fn dismiss(&self, id: ToastId) -> bool {
        dismiss(&self.page, id)
    }

    fn schedule_removal(&self, id: ToastId) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!(toast = id.0, "No runtime, toast expires on next sweep");
            return;
        };
        let page = self.page.clone();
        let lifetime = self.lifetime;
        handle.spawn(async move {
            tokio::time::sleep(lifetime).await;
            dismiss(&page, id);
        });
    }
}

/// 移除单个 toast，不影响其他 toast
pub fn dismiss(page: &SharedPage, id: ToastId) -> bool {
    let mut page = page::lock(page);
    let removed = page
        .toast_container
        .as_mut()
        .map_or(false, |container| container.remove(id));
    if removed {
        debug!(toast = id.0, "Toast removed");
    }
    removed
}

impl NotificationStage for NotificationRenderer {
    fn handle(&self, notification: &Notification) -> Result<StageOutcome> {
        Ok(match self.render(notification) {
            Some(_) => StageOutcome::Done,
            None => StageOutcome::Skipped("no toast container".to_string()),
        })
    }
}

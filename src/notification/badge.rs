//! 未读徽标计数

use super::dispatcher::{NotificationStage, StageOutcome};
use super::payload::Notification;
use crate::page::{self, SharedPage};
use anyhow::Result;
use tracing::debug;

/// 未读徽标计数器，只增不减
pub struct BadgeCounter {
    page: SharedPage,
}

impl BadgeCounter {
    pub fn new(page: SharedPage) -> Self {
        Self { page }
    }

    /// 计数 +1 并显示徽标；徽标不存在时返回 `None`
    pub fn increment(&self) -> Option<i64> {
        let mut page = page::lock(&self.page);
        let badge = page.badge.as_mut()?;
        let count = parse_badge_count(&badge.text).saturating_add(1);
        badge.text = count.to_string();
        badge.visible = true;
        debug!(count, "Badge incremented");
        Some(count)
    }
}

/// 解析徽标文本：取开头的整数部分，无法解析时为 0
///
/// "12" -> 12, " 7 new" -> 7, "99+" -> 99, "" -> 0, "abc" -> 0
pub fn parse_badge_count(text: &str) -> i64 {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

impl NotificationStage for BadgeCounter {
    fn handle(&self, _notification: &Notification) -> Result<StageOutcome> {
        Ok(match self.increment() {
            Some(_) => StageOutcome::Done,
            None => StageOutcome::Skipped("no badge element".to_string()),
        })
    }
}

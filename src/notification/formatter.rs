//! 相对时间格式化
//!
//! 纯函数：结果只取决于时间戳和注入的 "now"。

use chrono::{DateTime, Datelike, Local, TimeZone, Utc};

/// 小于 60 秒
pub const JUST_NOW: &str = "เมื่อสักครู่";

/// 佛历与公历的年份差
const BUDDHIST_ERA_OFFSET: i32 = 543;

/// 时钟抽象，测试时注入固定时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定时钟
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// 格式化为相对时间，超过一天时按本地时区输出日期
pub fn format_relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    format_relative_time_in(timestamp, now, &Local)
}

/// 同 [`format_relative_time`]，绝对日期使用指定时区
///
/// 分桶按顺序匹配：
/// - `< 60s` → "เมื่อสักครู่"
/// - `< 3600s` → "N นาทีที่แล้ว"
/// - `< 86400s` → "N ชั่วโมงที่แล้ว"
/// - 其他 → th-TH 短日期（佛历年）
pub fn format_relative_time_in<Tz: TimeZone>(
    timestamp: DateTime<Utc>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> String {
    let diff = (now - timestamp).num_seconds();

    if diff < 60 {
        return JUST_NOW.to_string();
    }
    if diff < 3600 {
        return format!("{} นาทีที่แล้ว", diff / 60);
    }
    if diff < 86400 {
        return format!("{} ชั่วโมงที่แล้ว", diff / 3600);
    }
    format_thai_date(&timestamp.with_timezone(tz))
}

/// th-TH 短日期：`d/m/yyyy`，年份为佛历
pub fn format_thai_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String {
    format!(
        "{}/{}/{}",
        date.day(),
        date.month(),
        date.year() + BUDDHIST_ERA_OFFSET
    )
}

//! 通知载荷 - 服务端推送的通知结构及其线上格式解析
//!
//! 服务端的序列化器输出 PascalCase 字段（`Type` / `Message` / `Timestamp` / `Data`），
//! 其他发送方使用 camelCase（`category` 或 `type`）。两种都接受。

use super::category::Category;
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// 小于该值的整数时间戳按秒处理，否则按毫秒
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// 服务端推送的通知（接收后不可变）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub category: Category,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// 各字段的候选键，按优先级排列
const CATEGORY_KEYS: [&str; 4] = ["Type", "type", "category", "Category"];
const MESSAGE_KEYS: [&str; 2] = ["Message", "message"];
const TIMESTAMP_KEYS: [&str; 2] = ["Timestamp", "timestamp"];
const DATA_KEYS: [&str; 2] = ["Data", "data"];

/// 取第一个存在且非 null 的字段
fn field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| !value.is_null())
}

/// 字符串原样返回，其他类型按 JSON 文本显示
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Notification {
    pub fn new(category: Category, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            category,
            message: message.into(),
            timestamp,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// 从 JSON 值解析；时间戳缺失或无法解析时使用 `received_at`
    pub fn from_wire(value: Value, received_at: DateTime<Utc>) -> Result<Self> {
        let Value::Object(object) = &value else {
            return Err(anyhow!("notification payload must be a JSON object, got {}", value));
        };

        // 非字符串的分类按未知分类处理
        let category = match field(object, &CATEGORY_KEYS) {
            Some(Value::String(tag)) => Category::parse(tag),
            Some(other) => Category::Unknown(other.to_string()),
            None => Category::Unknown(String::new()),
        };
        let timestamp = field(object, &TIMESTAMP_KEYS)
            .and_then(parse_timestamp_value)
            .unwrap_or(received_at);

        Ok(Self {
            category,
            message: field(object, &MESSAGE_KEYS).map(text_of).unwrap_or_default(),
            timestamp,
            data: field(object, &DATA_KEYS).cloned(),
        })
    }

    /// 从 JSON 字符串解析（一行一条，用于回放）
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_wire(value, Utc::now())
    }
}

/// 解析时间戳：RFC 3339、无时区的 ISO-8601（按 UTC）、或 epoch 秒/毫秒
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    raw.parse::<i64>().ok().and_then(from_epoch)
}

fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                // 超出 i64 范围的浮点数无法表示为时间
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .and_then(from_epoch),
        _ => None,
    }
}

fn from_epoch(epoch: i64) -> Option<DateTime<Utc>> {
    if epoch.unsigned_abs() < EPOCH_MILLIS_THRESHOLD.unsigned_abs() {
        Utc.timestamp_opt(epoch, 0).single()
    } else {
        Utc.timestamp_millis_opt(epoch).single()
    }
}

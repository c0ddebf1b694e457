//! Hub JSON 协议
//!
//! 每条消息是一个 JSON 对象，以 0x1E 结尾。连接建立后客户端先发送握手请求，
//! 服务端回复 `{}`（成功）或 `{"error": "..."}`。之后的消息按 `type` 区分：
//! 1 = invocation，6 = ping，7 = close，其他类型忽略。

use anyhow::{anyhow, bail, Result};
use serde_json::{json, Value};

/// 记录分隔符
pub const RECORD_SEPARATOR: char = '\u{1e}';
/// 推送通知的目标方法名
pub const NOTIFICATION_TARGET: &str = "ReceiveNotification";

const INVOCATION: u64 = 1;
const PING: u64 = 6;
const CLOSE: u64 = 7;

/// Hub 消息
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation { target: String, arguments: Vec<Value> },
    Ping,
    Close { error: Option<String>, allow_reconnect: bool },
    /// 客户端不处理的消息类型（stream item、completion 等）
    Other(u64),
}

impl HubMessage {
    /// 是否是推送通知调用（目标名不区分大小写）
    pub fn notification_argument(&self) -> Option<&Value> {
        match self {
            HubMessage::Invocation { target, arguments }
                if target.eq_ignore_ascii_case(NOTIFICATION_TARGET) =>
            {
                arguments.first()
            }
            _ => None,
        }
    }
}

/// 握手请求
pub fn handshake_request() -> String {
    frame(&json!({"protocol": "json", "version": 1}))
}

/// Ping 消息
pub fn ping_message() -> String {
    frame(&json!({"type": PING}))
}

fn frame(value: &Value) -> String {
    format!("{}{}", value, RECORD_SEPARATOR)
}

/// 解析握手响应
pub fn parse_handshake_response(record: &str) -> Result<()> {
    let value: Value = serde_json::from_str(record)
        .map_err(|e| anyhow!("invalid handshake response: {}", e))?;
    if let Some(error) = value.get("error").and_then(|v| v.as_str()) {
        bail!("hub rejected handshake: {}", error);
    }
    Ok(())
}

/// 解析单条消息（不含分隔符）
pub fn parse_message(record: &str) -> Result<HubMessage> {
    let value: Value = serde_json::from_str(record)
        .map_err(|e| anyhow!("invalid hub message: {}", e))?;
    let message_type = value
        .get("type")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| anyhow!("hub message without type: {}", record))?;

    Ok(match message_type {
        INVOCATION => HubMessage::Invocation {
            target: value
                .get("target")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            arguments: value
                .get("arguments")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default(),
        },
        PING => HubMessage::Ping,
        CLOSE => HubMessage::Close {
            error: value
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            allow_reconnect: value
                .get("allowReconnect")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        },
        other => HubMessage::Other(other),
    })
}

/// 拼接跨 websocket 消息的记录
#[derive(Debug, Default)]
pub struct RecordBuffer {
    pending: String,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加数据，返回所有已完整的记录
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.pending.push_str(chunk);
        let mut records = Vec::new();
        while let Some(idx) = self.pending.find(RECORD_SEPARATOR) {
            let record: String = self.pending.drain(..idx).collect();
            self.pending.drain(..RECORD_SEPARATOR.len_utf8());
            if !record.trim().is_empty() {
                records.push(record);
            }
        }
        records
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

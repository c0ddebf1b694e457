//! 传输层抽象
//!
//! 握手、分帧、自动重连都属于传输层；上层只消费事件。

use crate::notification::Notification;
use anyhow::Result;
use async_trait::async_trait;

/// 传输层事件
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// 收到通知
    Notification(Notification),
    /// 连接中断，传输层正在自动重连
    Reconnecting(Option<String>),
    /// 自动重连成功
    Reconnected,
    /// 连接关闭，传输层不再重连
    Closed(Option<String>),
}

/// Hub 传输层
#[async_trait]
pub trait HubTransport: Send {
    /// 传输名称（用于日志）
    fn name(&self) -> &str;

    /// 建立连接
    async fn connect(&mut self) -> Result<()>;

    /// 等待下一个事件；`None` 表示事件流结束
    async fn next_event(&mut self) -> Option<TransportEvent>;
}

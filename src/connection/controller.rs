//! 连接生命周期控制器
//!
//! 持有传输层，负责首次连接与重试，并把生命周期事件写入状态指示器。
//! 连接建立后的自动重连由传输层负责；传输层放弃（`Closed`）后这里不会再重连。

use super::retry::RetryPolicy;
use super::status::ConnectionStatusIndicator;
use super::transport::{HubTransport, TransportEvent};
use crate::notification::NotificationDispatcher;
use anyhow::{bail, Result};
use tracing::{info, warn};

/// 生命周期事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting,
    Connected,
    Reconnecting,
    Reconnected,
    Closed,
}

impl LifecycleEvent {
    /// 事件对应的连接状态
    pub fn connected(&self) -> bool {
        matches!(self, LifecycleEvent::Connected | LifecycleEvent::Reconnected)
    }
}

/// 连接生命周期控制器
pub struct ConnectionLifecycleController<T: HubTransport> {
    transport: T,
    indicator: ConnectionStatusIndicator,
    retry: RetryPolicy,
    connected: bool,
}

impl<T: HubTransport> ConnectionLifecycleController<T> {
    pub fn new(transport: T, indicator: ConnectionStatusIndicator, retry: RetryPolicy) -> Self {
        Self {
            transport,
            indicator,
            retry,
            connected: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 处理生命周期事件，这是唯一修改连接状态的地方
    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Connecting => info!(transport = self.transport.name(), "Connecting to hub"),
            LifecycleEvent::Connected => info!(transport = self.transport.name(), "Hub connected"),
            LifecycleEvent::Reconnecting => warn!("Attempting to reconnect..."),
            LifecycleEvent::Reconnected => info!("Reconnected!"),
            LifecycleEvent::Closed => warn!("Connection closed"),
        }
        self.connected = event.connected();
        self.indicator.update(self.connected);
    }

    /// 建立连接，失败时按重试策略等待后重试
    ///
    /// 只有在 `max_attempts` 用尽时才返回错误。
    pub async fn start(&mut self) -> Result<()> {
        self.handle_lifecycle(LifecycleEvent::Connecting);

        let mut failed_attempts = 0u32;
        loop {
            match self.transport.connect().await {
                Ok(()) => {
                    self.handle_lifecycle(LifecycleEvent::Connected);
                    return Ok(());
                }
                Err(e) => {
                    failed_attempts += 1;
                    let Some(delay) = self.retry.next_delay(failed_attempts) else {
                        warn!(attempts = failed_attempts, error = %e, "Giving up on hub connection");
                        bail!("hub connection failed after {} attempts: {}", failed_attempts, e);
                    };
                    warn!(
                        attempt = failed_attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %e,
                        "Hub connection failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// 消费传输层事件直到连接关闭
    ///
    /// 通知按到达顺序逐条处理，处理完一条才读取下一条。
    pub async fn pump(&mut self, dispatcher: &NotificationDispatcher) -> Result<()> {
        while let Some(event) = self.transport.next_event().await {
            match event {
                TransportEvent::Notification(notification) => {
                    dispatcher.on_notification(&notification);
                }
                TransportEvent::Reconnecting(reason) => {
                    if let Some(reason) = reason {
                        warn!(reason = %reason, "Hub connection lost");
                    }
                    self.handle_lifecycle(LifecycleEvent::Reconnecting);
                }
                TransportEvent::Reconnected => self.handle_lifecycle(LifecycleEvent::Reconnected),
                TransportEvent::Closed(reason) => {
                    if let Some(reason) = reason {
                        warn!(reason = %reason, "Hub closed the connection");
                    }
                    self.handle_lifecycle(LifecycleEvent::Closed);
                    return Ok(());
                }
            }
        }

        // 事件流结束等同于关闭
        self.handle_lifecycle(LifecycleEvent::Closed);
        Ok(())
    }

    /// `start()` + `pump()`
    pub async fn run(&mut self, dispatcher: &NotificationDispatcher) -> Result<()> {
        self.start().await?;
        self.pump(dispatcher).await
    }
}

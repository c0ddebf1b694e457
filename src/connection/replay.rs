//! 回放传输 - 从 JSON lines 文件或 stdin 读取通知
//!
//! 每行一条通知（与 hub 推送的载荷格式相同），读到末尾后发出 `Closed`。
//! 无法解析的行记录日志后跳过。

use super::transport::{HubTransport, TransportEvent};
use crate::notification::Notification;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tracing::{debug, warn};

type LineSource = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// 回放来源
pub enum ReplaySource {
    File(PathBuf),
    Stdin,
    Reader(Option<Box<dyn AsyncRead + Send + Unpin>>),
}

/// 回放传输
pub struct ReplayTransport {
    source: ReplaySource,
    lines: Option<LineSource>,
    interval: Duration,
    line_number: usize,
    emitted: usize,
    finished: bool,
}

impl ReplayTransport {
    pub fn new(source: ReplaySource) -> Self {
        Self {
            source,
            lines: None,
            interval: Duration::ZERO,
            line_number: 0,
            emitted: 0,
            finished: false,
        }
    }

    /// `-` 表示 stdin
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::new(ReplaySource::Stdin)
        } else {
            Self::new(ReplaySource::File(PathBuf::from(arg)))
        }
    }

    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::new(ReplaySource::Reader(Some(Box::new(reader))))
    }

    /// 每条通知之间的间隔
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl HubTransport for ReplayTransport {
    fn name(&self) -> &str {
        "replay"
    }

    async fn connect(&mut self) -> Result<()> {
        let reader: Box<dyn AsyncRead + Send + Unpin> = match &mut self.source {
            ReplaySource::File(path) => Box::new(
                tokio::fs::File::open(path.as_path())
                    .await
                    .map_err(|e| anyhow!("cannot open {}: {}", path.display(), e))?,
            ),
            ReplaySource::Stdin => Box::new(tokio::io::stdin()),
            ReplaySource::Reader(reader) => reader
                .take()
                .ok_or_else(|| anyhow!("replay reader already consumed"))?,
        };
        self.lines = Some(BufReader::new(reader).lines());
        self.line_number = 0;
        self.emitted = 0;
        self.finished = false;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        if self.finished {
            return None;
        }
        let lines = self.lines.as_mut()?;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finished = true;
                    return Some(TransportEvent::Closed(None));
                }
                Err(e) => {
                    self.finished = true;
                    return Some(TransportEvent::Closed(Some(e.to_string())));
                }
            };
            self.line_number += 1;

            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Notification::from_json_str(line) {
                Ok(notification) => {
                    if !self.interval.is_zero() && self.emitted > 0 {
                        tokio::time::sleep(self.interval).await;
                    }
                    self.emitted += 1;
                    debug!(line = self.line_number, "Replaying notification");
                    return Some(TransportEvent::Notification(notification));
                }
                Err(e) => warn!(line = self.line_number, error = %e, "Skipping invalid replay line"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::Category;

    #[tokio::test]
    async fn test_replays_lines_then_closes() {
        let input = b"{\"Type\":\"new-order\",\"Message\":\"Order #1\"}\n\n# comment\nnot json\n{\"category\":\"system-alert\",\"message\":\"Backup done\"}\n";
        let mut transport = ReplayTransport::from_reader(&input[..]);
        transport.connect().await.unwrap();

        match transport.next_event().await {
            Some(TransportEvent::Notification(n)) => assert_eq!(n.category, Category::NewOrder),
            other => panic!("unexpected: {:?}", other),
        }
        match transport.next_event().await {
            Some(TransportEvent::Notification(n)) => assert_eq!(n.message, "Backup done"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(transport.next_event().await, Some(TransportEvent::Closed(None)));
        assert_eq!(transport.next_event().await, None);
    }

    #[tokio::test]
    async fn test_malformed_fields_do_not_stop_replay() {
        let input = b"{\"Type\":\"new-order\",\"Message\":\"a\",\"Timestamp\":-1e300}\n{\"Type\":5,\"type\":\"x\",\"Message\":42}\n{\"Type\":\"system-alert\",\"Message\":\"c\"}\n";
        let mut transport = ReplayTransport::from_reader(&input[..]);
        transport.connect().await.unwrap();

        let mut messages = Vec::new();
        while let Some(TransportEvent::Notification(n)) = transport.next_event().await {
            messages.push(n.message);
        }
        assert_eq!(messages, vec!["a", "42", "c"]);
    }

    #[tokio::test]
    async fn test_missing_file_fails_connect() {
        let mut transport = ReplayTransport::from_arg("/no/such/replay.jsonl");
        assert!(transport.connect().await.is_err());
    }

    #[tokio::test]
    async fn test_next_event_before_connect_is_none() {
        let mut transport = ReplayTransport::from_reader(&b""[..]);
        assert_eq!(transport.next_event().await, None);
    }
}

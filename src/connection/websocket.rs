//! WebSocket hub 传输
//!
//! 连接流程：negotiate（可跳过）→ websocket 连接 → 握手 → 读取消息。
//! 连接中断后按 `reconnect_delays` 自动重连（默认 0s, 2s, 10s, 30s），
//! 全部失败后发出 `Closed`，不再重连。

use super::hub_protocol::{
    handshake_request, parse_handshake_response, parse_message, ping_message, HubMessage,
    RecordBuffer,
};
use super::transport::{HubTransport, TransportEvent};
use crate::notification::Notification;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 默认自动重连间隔
pub const DEFAULT_RECONNECT_DELAYS_MS: [u64; 4] = [0, 2000, 10_000, 30_000];

/// WebSocket 传输配置
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Hub 地址（http/https/ws/wss）
    pub hub_url: Url,
    /// 跳过 negotiate，直接连接 websocket
    pub skip_negotiation: bool,
    /// 连接中断后的自动重连间隔
    pub reconnect_delays: Vec<Duration>,
    /// 连接和握手超时
    pub connect_timeout: Duration,
    /// 客户端 ping 间隔
    pub keep_alive_interval: Duration,
    /// 超过该时间没有收到任何消息视为断开
    pub server_timeout: Duration,
}

impl WebSocketConfig {
    pub fn new(hub_url: Url) -> Self {
        Self {
            hub_url,
            skip_negotiation: false,
            reconnect_delays: DEFAULT_RECONNECT_DELAYS_MS
                .iter()
                .map(|ms| Duration::from_millis(*ms))
                .collect(),
            connect_timeout: Duration::from_secs(15),
            keep_alive_interval: Duration::from_secs(15),
            server_timeout: Duration::from_secs(30),
        }
    }
}

/// 已完成握手的连接
struct Session {
    ws: WsStream,
    buffer: RecordBuffer,
    /// 与握手响应一起到达的记录
    backlog: Vec<String>,
}

/// 断开原因
#[derive(Debug)]
enum Disconnect {
    /// 可以重连
    Lost(String),
    /// 服务端要求关闭，不重连
    Closed(Option<String>),
    /// 接收方已不存在
    ClientGone,
}

/// WebSocket hub 传输
pub struct WebSocketHubTransport {
    config: WebSocketConfig,
    events: Option<mpsc::Receiver<TransportEvent>>,
    session_task: Option<JoinHandle<()>>,
}

impl WebSocketHubTransport {
    pub fn new(config: WebSocketConfig) -> Self {
        Self {
            config,
            events: None,
            session_task: None,
        }
    }

    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

impl Drop for WebSocketHubTransport {
    fn drop(&mut self) {
        if let Some(task) = self.session_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl HubTransport for WebSocketHubTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn connect(&mut self) -> Result<()> {
        if let Some(task) = self.session_task.take() {
            task.abort();
        }

        let session = open_session(&self.config).await?;
        let (tx, rx) = mpsc::channel(64);
        let config = self.config.clone();
        self.session_task = Some(tokio::spawn(run_session(config, session, tx)));
        self.events = Some(rx);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        match self.events.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

/// negotiate 地址：`{hub}/negotiate?negotiateVersion=1`
pub fn negotiate_url(hub_url: &Url) -> Result<Url> {
    let mut url = hub_url.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| anyhow!("hub url cannot be a base: {}", hub_url))?;
        segments.pop_if_empty().push("negotiate");
    }
    url.query_pairs_mut().append_pair("negotiateVersion", "1");
    Ok(url)
}

/// websocket 地址：http→ws，https→wss，并附加连接 token
pub fn websocket_url(hub_url: &Url, connection_token: Option<&str>) -> Result<Url> {
    let mut url = hub_url.clone();
    let scheme = match hub_url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => bail!("unsupported hub url scheme: {}", other),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("cannot use scheme {} for {}", scheme, hub_url))?;
    if let Some(token) = connection_token {
        url.query_pairs_mut().append_pair("id", token);
    }
    Ok(url)
}

async fn negotiate(config: &WebSocketConfig) -> Result<String> {
    let url = negotiate_url(&config.hub_url)?;
    let client = reqwest::Client::builder()
        .timeout(config.connect_timeout)
        .build()?;

    let response: Value = client
        .post(url.clone())
        .send()
        .await
        .map_err(|e| anyhow!("negotiate request failed: {}", e))?
        .error_for_status()?
        .json()
        .await
        .map_err(|e| anyhow!("failed to parse negotiate response: {}", e))?;

    if let Some(error) = response.get("error").and_then(|v| v.as_str()) {
        bail!("negotiate rejected: {}", error);
    }
    response
        .get("connectionToken")
        .or_else(|| response.get("connectionId"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("negotiate response from {} has no connection token", url))
}

async fn open_session(config: &WebSocketConfig) -> Result<Session> {
    let token = if config.skip_negotiation {
        None
    } else {
        Some(negotiate(config).await?)
    };
    let url = websocket_url(&config.hub_url, token.as_deref())?;
    debug!(url = %url, "Opening hub websocket");

    let (mut ws, _response) = timeout(config.connect_timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| anyhow!("websocket connect timed out"))?
        .map_err(|e| anyhow!("websocket connect failed: {}", e))?;

    ws.send(Message::Text(handshake_request()))
        .await
        .map_err(|e| anyhow!("failed to send handshake: {}", e))?;

    let mut buffer = RecordBuffer::new();
    let deadline = Instant::now() + config.connect_timeout;
    loop {
        let message = tokio::time::timeout_at(deadline, ws.next())
            .await
            .map_err(|_| anyhow!("handshake timed out"))?
            .ok_or_else(|| anyhow!("connection closed during handshake"))?
            .map_err(|e| anyhow!("handshake failed: {}", e))?;

        let text = match message {
            Message::Text(text) => text,
            Message::Close(frame) => bail!("connection closed during handshake: {:?}", frame),
            _ => continue,
        };

        let mut records = buffer.push(&text).into_iter();
        if let Some(first) = records.next() {
            parse_handshake_response(&first)?;
            info!(hub = %config.hub_url, "Hub handshake complete");
            return Ok(Session {
                ws,
                buffer,
                backlog: records.collect(),
            });
        }
    }
}

async fn run_session(config: WebSocketConfig, mut session: Session, tx: mpsc::Sender<TransportEvent>) {
    loop {
        match read_until_disconnect(&config, &mut session, &tx).await {
            Disconnect::ClientGone => return,
            Disconnect::Closed(reason) => {
                let _ = session.ws.close(None).await;
                let _ = tx.send(TransportEvent::Closed(reason)).await;
                return;
            }
            Disconnect::Lost(reason) => {
                if tx.send(TransportEvent::Reconnecting(Some(reason))).await.is_err() {
                    return;
                }
                match reconnect(&config).await {
                    Some(next) => {
                        session = next;
                        if tx.send(TransportEvent::Reconnected).await.is_err() {
                            return;
                        }
                    }
                    None => {
                        let _ = tx
                            .send(TransportEvent::Closed(Some(
                                "automatic reconnect attempts exhausted".to_string(),
                            )))
                            .await;
                        return;
                    }
                }
            }
        }
    }
}

async fn reconnect(config: &WebSocketConfig) -> Option<Session> {
    for (attempt, delay) in config.reconnect_delays.iter().enumerate() {
        tokio::time::sleep(*delay).await;
        match open_session(config).await {
            Ok(session) => {
                info!(attempt = attempt + 1, "Hub reconnected");
                return Some(session);
            }
            Err(e) => warn!(attempt = attempt + 1, error = %e, "Reconnect attempt failed"),
        }
    }
    None
}

async fn read_until_disconnect(
    config: &WebSocketConfig,
    session: &mut Session,
    tx: &mpsc::Sender<TransportEvent>,
) -> Disconnect {
    for record in std::mem::take(&mut session.backlog) {
        if let Some(disconnect) = handle_record(&record, tx).await {
            return disconnect;
        }
    }

    let mut keep_alive = tokio::time::interval(config.keep_alive_interval);
    keep_alive.tick().await;
    let mut last_received = Instant::now();

    loop {
        tokio::select! {
            _ = keep_alive.tick() => {
                if let Err(e) = session.ws.send(Message::Text(ping_message())).await {
                    return Disconnect::Lost(format!("failed to send ping: {}", e));
                }
            }
            _ = tokio::time::sleep_until(last_received + config.server_timeout) => {
                return Disconnect::Lost("server timeout elapsed without receiving a message".to_string());
            }
            next = session.ws.next() => {
                last_received = Instant::now();
                let message = match next {
                    None => return Disconnect::Lost("websocket stream ended".to_string()),
                    Some(Err(e)) => return Disconnect::Lost(e.to_string()),
                    Some(Ok(message)) => message,
                };
                match message {
                    Message::Text(text) => {
                        for record in session.buffer.push(&text) {
                            if let Some(disconnect) = handle_record(&record, tx).await {
                                return disconnect;
                            }
                        }
                    }
                    Message::Close(frame) => {
                        return Disconnect::Lost(format!("websocket closed by server: {:?}", frame));
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn handle_record(record: &str, tx: &mpsc::Sender<TransportEvent>) -> Option<Disconnect> {
    let message = match parse_message(record) {
        Ok(message) => message,
        Err(e) => {
            warn!(error = %e, "Ignoring malformed hub message");
            return None;
        }
    };

    if let HubMessage::Close { error, allow_reconnect } = message {
        return Some(if allow_reconnect {
            Disconnect::Lost(error.unwrap_or_else(|| "server requested reconnect".to_string()))
        } else {
            Disconnect::Closed(error)
        });
    }

    let argument = message.notification_argument()?;
    match Notification::from_wire(argument.clone(), Utc::now()) {
        Ok(notification) => {
            if tx.send(TransportEvent::Notification(notification)).await.is_err() {
                return Some(Disconnect::ClientGone);
            }
        }
        Err(e) => warn!(error = %e, "Ignoring undecodable notification"),
    }
    None
}

//! 连接生命周期集成测试

use anyhow::{bail, Result};
use async_trait::async_trait;
use notification_hub::notification::sound::SilentAudioSink;
use notification_hub::{
    page, BadgeCounter, Category, CategoryUpdaters, ConnectionLifecycleController,
    ConnectionStatusIndicator, HubTransport, Notification, NotificationDispatcher,
    NotificationRenderer, Page, PageWidgets, RetryPolicy, SharedPage, SoundPlayer, TransportEvent,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// 按脚本发出事件，每次被读取时记录页面上的连接状态
struct ScriptedTransport {
    page: SharedPage,
    connect_failures: u32,
    events: VecDeque<TransportEvent>,
    observed: Vec<Option<bool>>,
}

impl ScriptedTransport {
    fn new(page: SharedPage, events: Vec<TransportEvent>) -> Self {
        Self {
            page,
            connect_failures: 0,
            events: events.into(),
            observed: Vec::new(),
        }
    }

    fn failing(mut self, failures: u32) -> Self {
        self.connect_failures = failures;
        self
    }
}

#[async_trait]
impl HubTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn connect(&mut self) -> Result<()> {
        self.observed.push(page::lock(&self.page).shows_connected());
        if self.connect_failures > 0 {
            self.connect_failures -= 1;
            bail!("connection refused");
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Option<TransportEvent> {
        self.observed.push(page::lock(&self.page).shows_connected());
        self.events.pop_front()
    }
}

fn dispatcher(page: &SharedPage) -> NotificationDispatcher {
    NotificationDispatcher::new(
        NotificationRenderer::new(page.clone()),
        BadgeCounter::new(page.clone()),
        SoundPlayer::new(Arc::new(SilentAudioSink)),
        CategoryUpdaters::new(Arc::new(PageWidgets::new(page.clone()))),
    )
}

fn order() -> Notification {
    Notification::new(Category::NewOrder, "Order #1", chrono::Utc::now())
}

#[tokio::test]
async fn test_indicator_follows_lifecycle() {
    let page = Page::new().into_shared();
    let transport = ScriptedTransport::new(
        page.clone(),
        vec![
            TransportEvent::Notification(order()),
            TransportEvent::Reconnecting(Some("socket reset".to_string())),
            TransportEvent::Reconnected,
            TransportEvent::Notification(order()),
            TransportEvent::Closed(None),
        ],
    );
    let mut controller = ConnectionLifecycleController::new(
        transport,
        ConnectionStatusIndicator::new(page.clone()),
        RetryPolicy::default(),
    );

    controller.run(&dispatcher(&page)).await.unwrap();

    // connect 之前是 connecting（false），之后每次读取事件前的状态
    assert_eq!(
        controller.transport().observed,
        vec![
            Some(false),
            Some(true),
            Some(true),
            Some(false),
            Some(true),
            Some(true),
        ]
    );
    assert!(!controller.is_connected());

    let page = page::lock(&page);
    assert_eq!(page.shows_connected(), Some(false));
    assert_eq!(page.counters.orders, 2);
    assert_eq!(page.toast_count(), 2);
}

#[tokio::test]
async fn test_initial_connect_retries_until_success() {
    let page = Page::new().into_shared();
    let transport = ScriptedTransport::new(page.clone(), vec![]).failing(2);
    let mut controller = ConnectionLifecycleController::new(
        transport,
        ConnectionStatusIndicator::new(page.clone()),
        RetryPolicy::fixed(Duration::from_millis(10)),
    );

    controller.start().await.unwrap();
    assert!(controller.is_connected());
    assert_eq!(controller.transport().observed, vec![Some(false); 3]);
    assert_eq!(page::lock(&page).shows_connected(), Some(true));
}

#[tokio::test]
async fn test_gives_up_after_max_attempts() {
    let page = Page::new().into_shared();
    let transport = ScriptedTransport::new(page.clone(), vec![]).failing(10);
    let mut controller = ConnectionLifecycleController::new(
        transport,
        ConnectionStatusIndicator::new(page.clone()),
        RetryPolicy::fixed(Duration::ZERO).with_max_attempts(3),
    );

    let err = controller.run(&dispatcher(&page)).await.unwrap_err();
    assert!(err.to_string().contains("after 3 attempts"));
    assert_eq!(controller.transport().observed.len(), 3);
    assert_eq!(page::lock(&page).shows_connected(), Some(false));
}

#[tokio::test]
async fn test_missing_indicator_is_harmless() {
    let page = Page::new().without_connection_status().into_shared();
    let transport = ScriptedTransport::new(
        page.clone(),
        vec![TransportEvent::Reconnecting(None), TransportEvent::Reconnected],
    );
    let mut controller = ConnectionLifecycleController::new(
        transport,
        ConnectionStatusIndicator::new(page.clone()),
        RetryPolicy::default(),
    );

    // 事件流结束等同于关闭
    controller.run(&dispatcher(&page)).await.unwrap();
    assert!(!controller.is_connected());
    assert!(page::lock(&page).connection_status.is_none());
}

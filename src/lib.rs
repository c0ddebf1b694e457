//! Notification Hub - 推送通知客户端
//!
//! 连接服务端的通知 hub，把推送的通知反映到页面上：toast、未读徽标、提示音、分类计数器，
//! 以及连接状态指示器。

pub mod best_effort;
pub mod config;
pub mod connection;
pub mod notification;
pub mod page;
pub mod tui;

pub use best_effort::{best_effort, guard};
pub use config::HubConfig;
pub use connection::{
    ConnectionLifecycleController, ConnectionStatusIndicator, HubTransport, LifecycleEvent,
    ReplayTransport, RetryPolicy, TransportEvent, WebSocketConfig, WebSocketHubTransport,
};
pub use notification::{
    BadgeCounter, Category, CategoryUpdaters, Notification, NotificationDispatcher,
    NotificationRenderer, PageWidgets, SoundPlayer, Stage, StageOutcome,
};
pub use page::{Page, SharedPage};

//! 页面模型 - 通知客户端写入的 UI 元素
//!
//! 每个元素都是 `Option`：元素缺失时所有写操作都应该是 no-op，而不是报错。

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// 连接状态指示器元素 id
pub const CONNECTION_STATUS_ID: &str = "connection-status";
/// 未读徽标选择器
pub const NOTIFICATION_BADGE_SELECTOR: &str = ".notification-badge";
/// Toast 容器元素 id
pub const TOAST_CONTAINER_ID: &str = "toast-container";

/// 共享页面句柄
pub type SharedPage = Arc<Mutex<Page>>;

/// 连接状态指示器
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusElement {
    pub class_name: String,
    pub title: String,
}

/// 未读徽标
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeElement {
    pub text: String,
    pub visible: bool,
}

impl BadgeElement {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visible: false,
        }
    }
}

/// Toast 标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToastId(pub u64);

/// 单个 toast 元素
#[derive(Debug, Clone, PartialEq)]
pub struct ToastElement {
    pub id: ToastId,
    pub icon: String,
    pub title: String,
    pub time_label: String,
    pub body: String,
    pub shown_at: Instant,
    pub lifetime: Duration,
}

impl ToastElement {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= self.lifetime
    }
}

/// Toast 容器
#[derive(Debug, Default)]
pub struct ToastContainer {
    toasts: Vec<ToastElement>,
    next_id: u64,
}

impl ToastContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 分配下一个 toast id
    pub fn next_id(&mut self) -> ToastId {
        self.next_id += 1;
        ToastId(self.next_id)
    }

    /// 追加到末尾（beforeend）
    pub fn append(&mut self, toast: ToastElement) {
        self.toasts.push(toast);
    }

    /// 移除指定 toast，只影响这一个元素
    pub fn remove(&mut self, id: ToastId) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|t| t.id != id);
        self.toasts.len() != before
    }

    /// 移除所有已过期的 toast，返回移除数量
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|t| !t.is_expired(now));
        before - self.toasts.len()
    }

    pub fn get(&self, id: ToastId) -> Option<&ToastElement> {
        self.toasts.iter().find(|t| t.id == id)
    }

    pub fn last(&self) -> Option<&ToastElement> {
        self.toasts.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToastElement> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

/// 各分类对应的页面计数器
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryCounters {
    pub orders: u64,
    pub pending_photos: u64,
    pub revenue: f64,
    pub users: u64,
}

/// 页面
#[derive(Debug, Default)]
pub struct Page {
    pub connection_status: Option<StatusElement>,
    pub badge: Option<BadgeElement>,
    pub toast_container: Option<ToastContainer>,
    pub counters: CategoryCounters,
}

impl Page {
    /// 包含所有元素的页面
    pub fn new() -> Self {
        Self {
            connection_status: Some(StatusElement::default()),
            badge: Some(BadgeElement::default()),
            toast_container: Some(ToastContainer::new()),
            counters: CategoryCounters::default(),
        }
    }

    /// 没有任何元素的页面
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_badge_text(mut self, text: impl Into<String>) -> Self {
        self.badge = Some(BadgeElement::with_text(text));
        self
    }

    pub fn without_connection_status(mut self) -> Self {
        self.connection_status = None;
        self
    }

    pub fn without_badge(mut self) -> Self {
        self.badge = None;
        self
    }

    pub fn without_toast_container(mut self) -> Self {
        self.toast_container = None;
        self
    }

    pub fn into_shared(self) -> SharedPage {
        Arc::new(Mutex::new(self))
    }

    /// 当前是否显示为已连接
    pub fn shows_connected(&self) -> Option<bool> {
        self.connection_status
            .as_ref()
            .map(|s| s.class_name == crate::connection::status::CONNECTED_CLASS)
    }

    pub fn toast_count(&self) -> usize {
        self.toast_container.as_ref().map_or(0, |c| c.len())
    }
}

/// 获取页面锁；前一个持有者 panic 时继续使用内部数据
pub fn lock(page: &SharedPage) -> MutexGuard<'_, Page> {
    page.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

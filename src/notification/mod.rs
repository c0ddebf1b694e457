//! 通知处理流水线 - 把推送通知反映到页面上
//!
//! # 流程
//! 1. 传输层收到通知，交给 `NotificationDispatcher`
//! 2. 分发器按固定顺序执行：`NotificationRenderer`（toast）→ `BadgeCounter`（徽标）
//!    → `SoundPlayer`（提示音）→ `CategoryUpdaters`（分类计数器）
//! 3. 每个阶段独立失败，互不影响
//!
//! # 使用示例
//! ```ignore
//! use notification_hub::notification::*;
//! use notification_hub::page::Page;
//!
//! let page = Page::new().into_shared();
//! let dispatcher = NotificationDispatcher::new(
//!     NotificationRenderer::new(page.clone()),
//!     BadgeCounter::new(page.clone()),
//!     SoundPlayer::new(sound::default_sink()),
//!     CategoryUpdaters::new(Arc::new(PageWidgets::new(page.clone()))),
//! );
//! dispatcher.on_notification(&notification);
//! ```

pub mod badge;
pub mod category;
pub mod dispatcher;
pub mod formatter;
pub mod payload;
pub mod renderer;
pub mod sound;
pub mod updaters;

pub use badge::{parse_badge_count, BadgeCounter};
pub use category::{get_title, Category, FALLBACK_TITLE};
pub use dispatcher::{NotificationDispatcher, NotificationStage, Stage, StageOutcome};
pub use formatter::{format_relative_time, format_relative_time_in, Clock, FixedClock, SystemClock};
pub use payload::{parse_timestamp, Notification};
pub use renderer::{NotificationRenderer, DEFAULT_TOAST_LIFETIME};
pub use sound::{AudioSink, SoundCue, SoundPlayer};
pub use updaters::{updater_for, CategoryUpdaters, CategoryWidgets, PageWidgets, Updater};

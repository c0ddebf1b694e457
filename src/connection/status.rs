//! 连接状态指示器

use crate::page::{self, SharedPage};

pub const CONNECTED_CLASS: &str = "text-success";
pub const DISCONNECTED_CLASS: &str = "text-danger";
pub const CONNECTED_TITLE: &str = "เชื่อมต่อแล้ว";
pub const DISCONNECTED_TITLE: &str = "ไม่ได้เชื่อมต่อ";

/// 把连接状态写入 `connection-status` 元素
#[derive(Clone)]
pub struct ConnectionStatusIndicator {
    page: SharedPage,
}

impl ConnectionStatusIndicator {
    pub fn new(page: SharedPage) -> Self {
        Self { page }
    }

    /// 更新指示器；元素不存在时返回 false
    pub fn update(&self, connected: bool) -> bool {
        let mut page = page::lock(&self.page);
        let Some(status) = page.connection_status.as_mut() else {
            return false;
        };
        let (class_name, title) = if connected {
            (CONNECTED_CLASS, CONNECTED_TITLE)
        } else {
            (DISCONNECTED_CLASS, DISCONNECTED_TITLE)
        };
        status.class_name = class_name.to_string();
        status.title = title.to_string();
        true
    }
}

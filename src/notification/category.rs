//! 通知分类
//!
//! 分类是封闭集合；服务端发来的未知字符串保存在 `Category::Unknown` 中，
//! 标题回退到通用标题，且不触发任何分类更新。

use serde::{Deserialize, Serialize};

/// 未知分类的通用标题
pub const FALLBACK_TITLE: &str = "แจ้งเตือน";

/// 通知分类
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    NewOrder,
    PhotoUploaded,
    PaymentReceived,
    UserRegistered,
    SystemAlert,
    Unknown(String),
}

impl Category {
    /// 所有已知分类，按线上分类表顺序
    pub const KNOWN: [Category; 5] = [
        Category::NewOrder,
        Category::PhotoUploaded,
        Category::PaymentReceived,
        Category::UserRegistered,
        Category::SystemAlert,
    ];

    /// 解析线上分类标签；服务端发送 kebab-case，精确匹配
    pub fn parse(tag: &str) -> Self {
        match tag {
            "new-order" => Category::NewOrder,
            "photo-uploaded" => Category::PhotoUploaded,
            "payment-received" => Category::PaymentReceived,
            "user-registered" => Category::UserRegistered,
            "system-alert" => Category::SystemAlert,
            other => Category::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::NewOrder => "new-order",
            Category::PhotoUploaded => "photo-uploaded",
            Category::PaymentReceived => "payment-received",
            Category::UserRegistered => "user-registered",
            Category::SystemAlert => "system-alert",
            Category::Unknown(tag) => tag,
        }
    }

    /// Toast 标题（泰语）
    pub fn title(&self) -> &'static str {
        match self {
            Category::NewOrder => "คำสั่งซื้อใหม่",
            Category::PhotoUploaded => "อัพโหลดรูปภาพ",
            Category::PaymentReceived => "รับชำระเงิน",
            Category::UserRegistered => "ผู้ใช้ใหม่",
            Category::SystemAlert => "แจ้งเตือนระบบ",
            Category::Unknown(_) => FALLBACK_TITLE,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unknown(_))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for Category {
    fn from(tag: String) -> Self {
        Category::parse(&tag)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

/// 根据分类字符串取标题
pub fn get_title(category: &str) -> &'static str {
    Category::parse(category).title()
}

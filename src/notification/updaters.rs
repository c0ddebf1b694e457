//! 分类更新器 - 每个分类最多对应一个页面小部件更新

use super::category::Category;
use super::dispatcher::{NotificationStage, StageOutcome};
use super::payload::Notification;
use crate::page::{self, SharedPage};
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// 分类相关的页面小部件
pub trait CategoryWidgets: Send + Sync {
    fn update_order_counter(&self) -> Result<()>;

    fn update_pending_photo_count(&self) -> Result<()>;

    fn update_revenue_display(&self, data: Option<&Value>) -> Result<()>;

    fn update_user_count(&self) -> Result<()>;
}

/// 更新器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Updater {
    OrderCounter,
    PendingPhotoCount,
    RevenueDisplay,
    UserCount,
}

impl Updater {
    pub fn name(&self) -> &'static str {
        match self {
            Updater::OrderCounter => "update_order_counter",
            Updater::PendingPhotoCount => "update_pending_photo_count",
            Updater::RevenueDisplay => "update_revenue_display",
            Updater::UserCount => "update_user_count",
        }
    }

    pub fn apply(&self, widgets: &dyn CategoryWidgets, notification: &Notification) -> Result<()> {
        match self {
            Updater::OrderCounter => widgets.update_order_counter(),
            Updater::PendingPhotoCount => widgets.update_pending_photo_count(),
            Updater::RevenueDisplay => widgets.update_revenue_display(notification.data.as_ref()),
            Updater::UserCount => widgets.update_user_count(),
        }
    }
}

/// 分类 -> 更新器映射表；system-alert 和未知分类没有更新器
pub fn updater_for(category: &Category) -> Option<Updater> {
    match category {
        Category::NewOrder => Some(Updater::OrderCounter),
        Category::PhotoUploaded => Some(Updater::PendingPhotoCount),
        Category::PaymentReceived => Some(Updater::RevenueDisplay),
        Category::UserRegistered => Some(Updater::UserCount),
        Category::SystemAlert | Category::Unknown(_) => None,
    }
}

/// 分类更新分发
pub struct CategoryUpdaters {
    widgets: Arc<dyn CategoryWidgets>,
}

impl CategoryUpdaters {
    pub fn new(widgets: Arc<dyn CategoryWidgets>) -> Self {
        Self { widgets }
    }

    /// 执行匹配的更新器，返回执行了哪一个
    pub fn dispatch(&self, notification: &Notification) -> Result<Option<Updater>> {
        let Some(updater) = updater_for(&notification.category) else {
            debug!(category = %notification.category, "No category updater");
            return Ok(None);
        };
        updater.apply(self.widgets.as_ref(), notification)?;
        debug!(updater = updater.name(), "Category updater fired");
        Ok(Some(updater))
    }
}

impl NotificationStage for CategoryUpdaters {
    fn handle(&self, notification: &Notification) -> Result<StageOutcome> {
        Ok(match self.dispatch(notification)? {
            Some(_) => StageOutcome::Done,
            None => StageOutcome::Skipped(format!(
                "no updater for category '{}'",
                notification.category
            )),
        })
    }
}

/// 页面上的分类计数器
pub struct PageWidgets {
    page: SharedPage,
}

impl PageWidgets {
    pub fn new(page: SharedPage) -> Self {
        Self { page }
    }
}

impl CategoryWidgets for PageWidgets {
    fn update_order_counter(&self) -> Result<()> {
        page::lock(&self.page).counters.orders += 1;
        Ok(())
    }

    fn update_pending_photo_count(&self) -> Result<()> {
        page::lock(&self.page).counters.pending_photos += 1;
        Ok(())
    }

    fn update_revenue_display(&self, data: Option<&Value>) -> Result<()> {
        let Some(data) = data else {
            warn!("payment-received without data, revenue unchanged");
            return Ok(());
        };
        let amount = extract_amount(data)
            .ok_or_else(|| anyhow!("payment data has no numeric amount: {}", data))?;
        page::lock(&self.page).counters.revenue += amount;
        Ok(())
    }

    fn update_user_count(&self) -> Result<()> {
        page::lock(&self.page).counters.users += 1;
        Ok(())
    }
}

/// 从 `{amount: 500}` / `{"Amount": "500.25"}` / `500` 中取金额
pub fn extract_amount(data: &Value) -> Option<f64> {
    let raw = match data {
        Value::Object(map) => map.get("amount").or_else(|| map.get("Amount"))?,
        other => other,
    };
    let amount = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    // "NaN" / "inf" 也能解析为 f64，不计入收入
    amount.filter(|a| a.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Page;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;

    /// 记录调用的 mock 小部件
    #[derive(Default)]
    struct RecordingWidgets {
        calls: Mutex<Vec<(String, Option<Value>)>>,
    }

    impl RecordingWidgets {
        fn record(&self, name: &str, data: Option<&Value>) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((name.to_string(), data.cloned()));
            Ok(())
        }

        fn calls(&self) -> Vec<(String, Option<Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CategoryWidgets for RecordingWidgets {
        fn update_order_counter(&self) -> Result<()> {
            self.record("update_order_counter", None)
        }

        fn update_pending_photo_count(&self) -> Result<()> {
            self.record("update_pending_photo_count", None)
        }

        fn update_revenue_display(&self, data: Option<&Value>) -> Result<()> {
            self.record("update_revenue_display", data)
        }

        fn update_user_count(&self) -> Result<()> {
            self.record("update_user_count", None)
        }
    }

    fn notification(category: Category) -> Notification {
        Notification::new(category, "m", Utc::now())
    }

    #[test]
    fn test_updater_table() {
        assert_eq!(updater_for(&Category::NewOrder), Some(Updater::OrderCounter));
        assert_eq!(updater_for(&Category::PhotoUploaded), Some(Updater::PendingPhotoCount));
        assert_eq!(updater_for(&Category::PaymentReceived), Some(Updater::RevenueDisplay));
        assert_eq!(updater_for(&Category::UserRegistered), Some(Updater::UserCount));
        assert_eq!(updater_for(&Category::SystemAlert), None);
        assert_eq!(updater_for(&Category::parse("other")), None);
    }

    #[test]
    fn test_payment_fires_only_revenue_with_data() {
        let widgets = Arc::new(RecordingWidgets::default());
        let updaters = CategoryUpdaters::new(widgets.clone());

        let n = notification(Category::PaymentReceived).with_data(json!({"amount": 500}));
        assert_eq!(updaters.dispatch(&n).unwrap(), Some(Updater::RevenueDisplay));

        assert_eq!(
            widgets.calls(),
            vec![("update_revenue_display".to_string(), Some(json!({"amount": 500})))]
        );
    }

    #[test]
    fn test_each_known_category_fires_exactly_one() {
        let widgets = Arc::new(RecordingWidgets::default());
        let updaters = CategoryUpdaters::new(widgets.clone());

        for category in [
            Category::NewOrder,
            Category::PhotoUploaded,
            Category::UserRegistered,
        ] {
            updaters.dispatch(&notification(category)).unwrap();
        }

        let names: Vec<String> = widgets.calls().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["update_order_counter", "update_pending_photo_count", "update_user_count"]
        );
    }

    #[test]
    fn test_system_alert_fires_nothing() {
        let widgets = Arc::new(RecordingWidgets::default());
        let updaters = CategoryUpdaters::new(widgets.clone());

        let outcome = updaters.handle(&notification(Category::SystemAlert)).unwrap();
        assert!(matches!(outcome, StageOutcome::Skipped(_)));
        assert!(widgets.calls().is_empty());
    }

    #[test]
    fn test_page_widgets_update_counters() {
        let page = Page::new().into_shared();
        let updaters = CategoryUpdaters::new(Arc::new(PageWidgets::new(page.clone())));

        updaters.dispatch(&notification(Category::NewOrder)).unwrap();
        updaters.dispatch(&notification(Category::NewOrder)).unwrap();
        updaters.dispatch(&notification(Category::PhotoUploaded)).unwrap();
        updaters.dispatch(&notification(Category::UserRegistered)).unwrap();
        updaters
            .dispatch(&notification(Category::PaymentReceived).with_data(json!({"amount": 500})))
            .unwrap();
        updaters
            .dispatch(&notification(Category::PaymentReceived).with_data(json!({"Amount": "120.5"})))
            .unwrap();

        let counters = page::lock(&page).counters.clone();
        assert_eq!(counters.orders, 2);
        assert_eq!(counters.pending_photos, 1);
        assert_eq!(counters.users, 1);
        assert_eq!(counters.revenue, 620.5);
    }

    #[test]
    fn test_revenue_without_amount() {
        let page = Page::new().into_shared();
        let widgets = PageWidgets::new(page.clone());

        assert!(widgets.update_revenue_display(None).is_ok());
        assert!(widgets.update_revenue_display(Some(&json!({"currency": "THB"}))).is_err());
        assert_eq!(page::lock(&page).counters.revenue, 0.0);
    }

    #[test]
    fn test_extract_amount() {
        assert_eq!(extract_amount(&json!({"amount": 500})), Some(500.0));
        assert_eq!(extract_amount(&json!({"Amount": " 12.5 "})), Some(12.5));
        assert_eq!(extract_amount(&json!(42)), Some(42.0));
        assert_eq!(extract_amount(&json!({"amount": true})), None);
        assert_eq!(extract_amount(&json!({"amount": "NaN"})), None);
        assert_eq!(extract_amount(&json!({"amount": "inf"})), None);
        assert_eq!(extract_amount(&json!({"Amount": "-infinity"})), None);
    }

    #[test]
    fn test_non_finite_amount_leaves_revenue_intact() {
        let page = Page::new().into_shared();
        let updaters = CategoryUpdaters::new(Arc::new(PageWidgets::new(page.clone())));

        let nan = notification(Category::PaymentReceived).with_data(json!({"amount": "NaN"}));
        assert!(updaters.dispatch(&nan).is_err());
        updaters
            .dispatch(&notification(Category::PaymentReceived).with_data(json!({"amount": 500})))
            .unwrap();

        assert_eq!(page::lock(&page).counters.revenue, 500.0);
    }
}

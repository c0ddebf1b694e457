//! TUI 渲染模块

use crate::connection::status::CONNECTED_CLASS;
use crate::page::{self, Page};
use crate::tui::App;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// 每个 toast 占用的行数（标题行 + 正文行）
const TOAST_LINES: u16 = 2;

/// 渲染主界面
pub fn render(app: &App, frame: &mut Frame) {
    let page = page::lock(&app.page);
    let area = frame.area();

    // 垂直分割: 状态栏 | 主区域 | 底部栏
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // 状态栏
            Constraint::Min(6),    // 主区域
            Constraint::Length(1), // 底部栏
        ])
        .split(area);

    frame.render_widget(status_bar(app, &page), vertical[0]);

    // 主区域: 计数器 | toast
    let main_area = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(vertical[1]);

    render_counters(&page, frame, main_area[0]);
    render_toasts(&page, frame, main_area[1]);

    let help = if app.is_finished() {
        " 连接已结束  [q] quit "
    } else {
        " [x] 关闭最新 toast  [q] quit "
    };
    let help_bar = Paragraph::new(help).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(help_bar, vertical[2]);
}

/// 状态栏：来源 │ 连接状态 │ 未读徽标
fn status_bar<'a>(app: &App, page: &Page) -> Paragraph<'a> {
    let mut spans = vec![Span::raw(format!(" nhub │ {} │ ", app.source))];

    match &page.connection_status {
        Some(status) => {
            let color = if status.class_name == CONNECTED_CLASS {
                Color::Green
            } else {
                Color::Red
            };
            let label = if status.title.is_empty() { "…" } else { status.title.as_str() };
            spans.push(Span::styled(format!("● {}", label), Style::default().fg(color)));
        }
        None => spans.push(Span::raw("—")),
    }

    if let Some(badge) = page.badge.as_ref().filter(|b| b.visible) {
        spans.push(Span::raw(" │ "));
        spans.push(Span::styled(
            format!("🔔 {}", badge.text),
            Style::default().fg(Color::White).bg(Color::Red),
        ));
    }

    Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Blue).fg(Color::White))
}

/// 分类计数器
fn render_counters(page: &Page, frame: &mut Frame, area: Rect) {
    let counters = &page.counters;
    let text = vec![
        Line::from(format!(" คำสั่งซื้อ      {}", counters.orders)),
        Line::from(format!(" รูปรอตรวจ      {}", counters.pending_photos)),
        Line::from(format!(" รายได้         ฿{:.2}", counters.revenue)),
        Line::from(format!(" ผู้ใช้          {}", counters.users)),
    ];
    let panel = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(" Counters "));
    frame.render_widget(panel, area);
}

/// Toast 列表，最新的在最下方
fn render_toasts(page: &Page, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Notifications ");

    let Some(container) = page.toast_container.as_ref() else {
        frame.render_widget(Paragraph::new(" (no toast container)").block(block), area);
        return;
    };

    let capacity = (area.height.saturating_sub(2) / TOAST_LINES) as usize;
    let skip = container.len().saturating_sub(capacity);

    let items: Vec<ListItem> = container
        .iter()
        .skip(skip)
        .map(|toast| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(format!("{} ", toast.icon)),
                    Span::styled(toast.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", toast.time_label), Style::default().fg(Color::DarkGray)),
                ]),
                Line::from(format!("   {}", toast.body)),
            ])
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

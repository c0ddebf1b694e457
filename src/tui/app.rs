//! TUI 应用状态和主循环

use crate::page::{self, SharedPage};
use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type AppResult<T> = Result<T>;
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

const TICK_RATE: Duration = Duration::from_millis(200);

/// TUI 应用状态
pub struct App {
    pub page: SharedPage,
    /// 标题栏显示的 hub 地址或回放来源
    pub source: String,
    pub should_quit: bool,
    pub tick: usize,
    /// 连接控制器已退出
    pub finished: Arc<AtomicBool>,
}

impl App {
    pub fn new(page: SharedPage, source: impl Into<String>) -> Self {
        Self {
            page,
            source: source.into(),
            should_quit: false,
            tick: 0,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn on_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        // 没有 runtime 定时器的 toast 在这里过期
        if let Some(container) = page::lock(&self.page).toast_container.as_mut() {
            container.sweep_expired(Instant::now());
        }
    }

    /// 关闭最新的 toast
    pub fn dismiss_latest_toast(&mut self) -> bool {
        let latest = page::lock(&self.page)
            .toast_container
            .as_ref()
            .and_then(|c| c.last().map(|t| t.id));
        match latest {
            Some(id) => crate::notification::renderer::dismiss(&self.page, id),
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// 初始化终端
pub fn init_terminal() -> AppResult<Tui> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(io::stdout()))?)
}

/// 恢复终端
pub fn restore_terminal(terminal: &mut Tui) -> AppResult<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// 运行 TUI 直到用户退出
pub fn run(mut app: App) -> AppResult<()> {
    let mut terminal = init_terminal()?;
    let result = run_loop(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;
    result
}

fn run_loop(terminal: &mut Tui, app: &mut App) -> AppResult<()> {
    let mut last_tick = Instant::now();
    while !app.should_quit {
        terminal.draw(|frame| super::ui::render(app, frame))?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if let Some(super::TuiEvent::Key(key)) = super::poll_event(timeout)? {
            super::handle_key(app, key);
        }
        if last_tick.elapsed() >= TICK_RATE {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
    Ok(())
}

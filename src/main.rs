//! Notification Hub CLI
//!
//! 连接通知 hub 并在终端仪表盘上显示推送通知

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use notification_hub::{
    notification::{
        format_relative_time, parse_timestamp,
        sound::{default_sink, AudioSink, SilentAudioSink},
    },
    page,
    tui::{self, App},
    BadgeCounter, CategoryUpdaters, ConnectionLifecycleController, ConnectionStatusIndicator,
    HubConfig, HubTransport, NotificationDispatcher, NotificationRenderer, Page, PageWidgets,
    ReplayTransport, RetryPolicy, SharedPage, SoundPlayer, WebSocketHubTransport,
};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "nhub")]
#[command(about = "Notification Hub - 推送通知客户端")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 连接 hub 并显示推送通知
    Listen {
        /// Hub 地址（覆盖配置文件）
        #[arg(long)]
        url: Option<String>,
        /// 跳过 negotiate，直接建立 websocket
        #[arg(long)]
        skip_negotiation: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// 从 JSON lines 文件回放通知（`-` 表示 stdin）
    Replay {
        /// 文件路径或 `-`
        source: String,
        /// 每条通知之间的间隔（毫秒）
        #[arg(long, default_value = "0")]
        interval_ms: u64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// 把时间戳格式化为相对时间
    FormatTime {
        /// RFC 3339、ISO 8601 或 epoch 秒/毫秒
        timestamp: String,
        /// 作为 "现在" 的时间戳（默认当前时间）
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Args)]
struct OutputArgs {
    /// 不启动仪表盘，只输出日志
    #[arg(long)]
    no_tui: bool,
    /// 不播放提示音
    #[arg(long)]
    no_sound: bool,
    /// 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let tui_mode = match &cli.command {
        Commands::Listen { output, .. } | Commands::Replay { output, .. } => !output.no_tui,
        Commands::FormatTime { .. } => false,
    };
    init_tracing(tui_mode)?;

    match cli.command {
        Commands::Listen {
            url,
            skip_negotiation,
            output,
        } => {
            let mut config = HubConfig::load(output.config.as_deref())?;
            if let Some(url) = url {
                config.hub_url = url;
            }
            config.skip_negotiation |= skip_negotiation;
            config.validate()?;

            let transport = WebSocketHubTransport::new(config.websocket_config()?);
            let source = config.hub_url.clone();
            let retry = config.retry.clone();
            run_client(transport, retry, &config, &output, source).await?;
        }
        Commands::Replay {
            source,
            interval_ms,
            output,
        } => {
            let config = HubConfig::load(output.config.as_deref())?;
            let transport =
                ReplayTransport::from_arg(&source).with_interval(Duration::from_millis(interval_ms));
            // 文件打不开时重试没有意义
            let retry = RetryPolicy::default().with_max_attempts(1);
            run_client(transport, retry, &config, &output, format!("replay:{}", source)).await?;
        }
        Commands::FormatTime { timestamp, now } => {
            let timestamp = parse_timestamp(&timestamp)
                .ok_or_else(|| anyhow!("Cannot parse timestamp: {}", timestamp))?;
            let now = match now {
                Some(raw) => parse_timestamp(&raw).ok_or_else(|| anyhow!("Cannot parse --now: {}", raw))?,
                None => Utc::now(),
            };
            println!("{}", format_relative_time(timestamp, now));
        }
    }

    Ok(())
}

/// 初始化 tracing 日志系统
///
/// 通过 RUST_LOG 环境变量控制日志级别，默认为 info。
/// 仪表盘模式下写入数据目录中的日志文件，避免破坏终端画面。
fn init_tracing(tui_mode: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("notification_hub=info,nhub=info"));

    if tui_mode {
        let dir = HubConfig::data_dir();
        fs::create_dir_all(&dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("nhub.log"))?;
        fmt()
            .with_writer(Mutex::new(file))
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .init();
    } else {
        fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .init();
    }
    Ok(())
}

/// 组装四个处理阶段
fn build_dispatcher(page: &SharedPage, config: &HubConfig, no_sound: bool) -> NotificationDispatcher {
    let sink: Arc<dyn AudioSink> = if no_sound || !config.sound_enabled {
        Arc::new(SilentAudioSink)
    } else {
        default_sink()
    };

    NotificationDispatcher::new(
        NotificationRenderer::new(page.clone()).with_lifetime(config.toast_lifetime()),
        BadgeCounter::new(page.clone()),
        SoundPlayer::new(sink)
            .with_path(config.sound_path.clone())
            .with_volume(config.sound_volume),
        CategoryUpdaters::new(Arc::new(PageWidgets::new(page.clone()))),
    )
}

async fn run_client<T: HubTransport + 'static>(
    transport: T,
    retry: RetryPolicy,
    config: &HubConfig,
    output: &OutputArgs,
    source: String,
) -> Result<()> {
    let page = Page::new().with_badge_text("0").into_shared();
    let dispatcher = build_dispatcher(&page, config, output.no_sound);
    let indicator = ConnectionStatusIndicator::new(page.clone());
    let mut controller = ConnectionLifecycleController::new(transport, indicator, retry);

    if output.no_tui {
        tokio::select! {
            result = controller.run(&dispatcher) => result?,
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        }
        print_summary(&page);
        return Ok(());
    }

    let app = App::new(page.clone(), source);
    let finished = app.finished.clone();
    let client = tokio::spawn(async move {
        let result = controller.run(&dispatcher).await;
        if let Err(e) = &result {
            error!(error = %e, "Hub client stopped");
        }
        finished.store(true, Ordering::SeqCst);
        result
    });

    tokio::task::spawn_blocking(move || tui::run(app)).await??;

    if client.is_finished() {
        client.await??;
    } else {
        client.abort();
    }
    Ok(())
}

fn print_summary(page: &SharedPage) {
    let page = page::lock(page);
    let counters = &page.counters;
    let badge = page.badge.as_ref().map_or("0", |b| b.text.as_str());
    println!("通知: {}", badge);
    println!("  orders: {}", counters.orders);
    println!("  pending photos: {}", counters.pending_photos);
    println!("  revenue: {:.2}", counters.revenue);
    println!("  users: {}", counters.users);
}

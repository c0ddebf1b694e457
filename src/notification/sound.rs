//! 通知提示音
//!
//! 播放是 best-effort：找不到播放器、文件缺失、进程启动失败都只记录日志。

use super::category::Category;
use super::dispatcher::{NotificationStage, StageOutcome};
use super::payload::Notification;
use crate::best_effort::best_effort;
use anyhow::{bail, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info};

/// 固定音量（最大值的一半）
pub const DEFAULT_VOLUME: f32 = 0.5;
/// 默认提示音路径
pub const DEFAULT_SOUND_PATH: &str = "assets/sounds/notification.mp3";

/// 一次播放请求
#[derive(Debug, Clone, PartialEq)]
pub struct SoundCue {
    pub path: PathBuf,
    pub volume: f32,
    pub category: Category,
}

/// 音频输出 trait
pub trait AudioSink: Send + Sync {
    /// 输出名称（用于日志）
    fn name(&self) -> &str;

    /// 开始播放；不等待播放结束
    fn play(&self, cue: &SoundCue) -> Result<()>;
}

/// 提示音播放器
pub struct SoundPlayer {
    sink: Arc<dyn AudioSink>,
    path: PathBuf,
    volume: f32,
}

impl SoundPlayer {
    pub fn new(sink: Arc<dyn AudioSink>) -> Self {
        Self {
            sink,
            path: PathBuf::from(DEFAULT_SOUND_PATH),
            volume: DEFAULT_VOLUME,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// 播放提示音，返回是否成功启动；失败不会传播
    pub fn play(&self, category: &Category) -> bool {
        let cue = SoundCue {
            path: self.path.clone(),
            volume: self.volume,
            category: category.clone(),
        };
        best_effort("play_sound", || self.sink.play(&cue)).is_some()
    }
}

impl NotificationStage for SoundPlayer {
    fn handle(&self, notification: &Notification) -> Result<StageOutcome> {
        Ok(if self.play(&notification.category) {
            StageOutcome::Done
        } else {
            StageOutcome::Skipped("could not play notification sound".to_string())
        })
    }
}

/// 已知的命令行播放器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    Afplay,
    Paplay,
    Ffplay,
    Aplay,
}

impl PlayerKind {
    const ALL: [PlayerKind; 4] = [
        PlayerKind::Afplay,
        PlayerKind::Paplay,
        PlayerKind::Ffplay,
        PlayerKind::Aplay,
    ];

    pub fn binary(&self) -> &'static str {
        match self {
            PlayerKind::Afplay => "afplay",
            PlayerKind::Paplay => "paplay",
            PlayerKind::Ffplay => "ffplay",
            PlayerKind::Aplay => "aplay",
        }
    }

    /// 构造播放参数
    pub fn args(&self, path: &Path, volume: f32) -> Vec<String> {
        let file = path.display().to_string();
        match self {
            PlayerKind::Afplay => vec!["-v".to_string(), format!("{:.2}", volume), file],
            // paplay 音量范围 0..=65536
            PlayerKind::Paplay => vec![format!("--volume={}", (volume * 65536.0).round() as u32), file],
            PlayerKind::Ffplay => vec![
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
                "-volume".to_string(),
                ((volume * 100.0).round() as u32).to_string(),
                file,
            ],
            // aplay 不支持音量
            PlayerKind::Aplay => vec!["-q".to_string(), file],
        }
    }
}

/// 通过外部播放器命令播放
pub struct CommandAudioSink {
    kind: PlayerKind,
    program: PathBuf,
}

impl CommandAudioSink {
    /// 在 PATH 中查找可用播放器
    pub fn detect() -> Option<Self> {
        PlayerKind::ALL.iter().find_map(|kind| {
            which::which(kind.binary()).ok().map(|program| {
                info!(player = kind.binary(), path = %program.display(), "Audio player found");
                Self { kind: *kind, program }
            })
        })
    }

    pub fn kind(&self) -> PlayerKind {
        self.kind
    }
}

impl AudioSink for CommandAudioSink {
    fn name(&self) -> &str {
        self.kind.binary()
    }

    fn play(&self, cue: &SoundCue) -> Result<()> {
        if !cue.path.exists() {
            bail!("sound file not found: {}", cue.path.display());
        }

        let mut child = Command::new(&self.program)
            .args(self.kind.args(&cue.path, cue.volume))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // 回收子进程，不阻塞调用方
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        debug!(player = self.name(), category = %cue.category, "Notification sound started");
        Ok(())
    }
}

/// 终端响铃
#[derive(Debug, Default)]
pub struct BellAudioSink;

impl AudioSink for BellAudioSink {
    fn name(&self) -> &str {
        "bell"
    }

    fn play(&self, _cue: &SoundCue) -> Result<()> {
        let mut stderr = std::io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

/// 静音
#[derive(Debug, Default)]
pub struct SilentAudioSink;

impl AudioSink for SilentAudioSink {
    fn name(&self) -> &str {
        "silent"
    }

    fn play(&self, _cue: &SoundCue) -> Result<()> {
        Ok(())
    }
}

/// 选择默认输出：外部播放器，找不到时用终端响铃
pub fn default_sink() -> Arc<dyn AudioSink> {
    match CommandAudioSink::detect() {
        Some(sink) => Arc::new(sink),
        None => {
            info!("No audio player on PATH, using terminal bell");
            Arc::new(BellAudioSink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// 记录播放请求的 mock 输出
    #[derive(Default)]
    struct RecordingSink {
        cues: Mutex<Vec<SoundCue>>,
    }

    impl AudioSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn play(&self, cue: &SoundCue) -> Result<()> {
            self.cues.lock().unwrap().push(cue.clone());
            Ok(())
        }
    }

    struct BlockedSink;

    impl AudioSink for BlockedSink {
        fn name(&self) -> &str {
            "blocked"
        }

        fn play(&self, _cue: &SoundCue) -> Result<()> {
            bail!("play() failed because the user didn't interact with the document first")
        }
    }

    struct PanickingSink;

    impl AudioSink for PanickingSink {
        fn name(&self) -> &str {
            "panicking"
        }

        fn play(&self, _cue: &SoundCue) -> Result<()> {
            panic!("audio device vanished")
        }
    }

    #[test]
    fn test_play_uses_fixed_volume_and_path() {
        let sink = Arc::new(RecordingSink::default());
        let player = SoundPlayer::new(sink.clone());

        assert!(player.play(&Category::NewOrder));

        let cues = sink.cues.lock().unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].volume, DEFAULT_VOLUME);
        assert_eq!(cues[0].path, PathBuf::from(DEFAULT_SOUND_PATH));
        assert_eq!(cues[0].category, Category::NewOrder);
    }

    #[test]
    fn test_play_failure_is_swallowed() {
        let player = SoundPlayer::new(Arc::new(BlockedSink));
        assert!(!player.play(&Category::SystemAlert));

        let outcome = player
            .handle(&Notification::new(Category::SystemAlert, "x", chrono::Utc::now()))
            .unwrap();
        assert!(matches!(outcome, StageOutcome::Skipped(_)));
    }

    #[test]
    fn test_play_panic_is_swallowed() {
        let player = SoundPlayer::new(Arc::new(PanickingSink));
        assert!(!player.play(&Category::NewOrder));
    }

    #[test]
    fn test_volume_is_clamped() {
        let sink = Arc::new(RecordingSink::default());
        let player = SoundPlayer::new(sink.clone()).with_volume(3.0);
        player.play(&Category::NewOrder);
        assert_eq!(sink.cues.lock().unwrap()[0].volume, 1.0);
    }

    #[test]
    fn test_player_args() {
        let path = Path::new("/tmp/ding.mp3");
        assert_eq!(
            PlayerKind::Afplay.args(path, 0.5),
            vec!["-v", "0.50", "/tmp/ding.mp3"]
        );
        assert_eq!(
            PlayerKind::Paplay.args(path, 0.5),
            vec!["--volume=32768", "/tmp/ding.mp3"]
        );
        assert!(PlayerKind::Ffplay.args(path, 0.5).contains(&"50".to_string()));
        assert_eq!(PlayerKind::Aplay.args(path, 0.5), vec!["-q", "/tmp/ding.mp3"]);
    }

    #[test]
    fn test_command_sink_missing_file_fails() {
        let sink = CommandAudioSink {
            kind: PlayerKind::Aplay,
            program: PathBuf::from("aplay"),
        };
        let cue = SoundCue {
            path: PathBuf::from("/definitely/not/here.mp3"),
            volume: DEFAULT_VOLUME,
            category: Category::NewOrder,
        };
        assert!(sink.play(&cue).is_err());
    }
}

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use gesture_link::camera::OpenCvCameraProvider;
use gesture_link::config::Config;
use gesture_link::detector::{SubprocessFaceClassifier, SubprocessHandClassifier};
use gesture_link::processor::FrameProcessor;
use gesture_link::render::{Canvas, CanvasOverlay, PreviewWindow};
use gesture_link::session::{DetectionSession, SessionState};
use gesture_link::telemetry::{DevicePathSelector, TelemetrySink};

const CONFIG_PATH: &str = "config.toml";
const PREVIEW_INTERVAL: Duration = Duration::from_millis(33);

fn print_menu() {
    println!("コマンド:");
    println!("  c - カメラ開始/停止");
    println!("  d - 検出開始/停止");
    println!("  t - マイコンに接続 (送信要求)");
    println!("  s - 現在の状態を表示");
    println!("  q - 終了");
    println!();
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

async fn print_status(session: &DetectionSession) {
    let processor = session.processor();
    let display = processor.display();
    let counts = processor.hand_counts();

    println!("状態: {:?}", session.state());
    if let Some((w, h)) = session.resolution() {
        println!("  解像度: {}x{}", w, h);
    }
    println!("  Emoción: {}", display.emotion);
    println!("  Edad/Género: {}", display.traits);
    println!("  Dedos: {}", display.fingers);
    println!("  指数 (生ラベル): left={} right={}", counts.left, counts.right);
    println!(
        "  テレメトリ: {}",
        if processor.telemetry_requested().await { "要求中" } else { "停止" }
    );
}

fn toggle_camera(session: &mut DetectionSession) {
    if session.state() == SessionState::Idle {
        match session.start_camera() {
            Ok(()) => println!("カメラを開始しました"),
            Err(e) => println!("{}", e),
        }
    } else {
        session.stop_camera();
        println!("カメラを停止しました");
    }
}

async fn toggle_detection(session: &mut DetectionSession) {
    if session.state() == SessionState::Detecting {
        session.stop_detection();
        println!("検出を停止しました");
        return;
    }

    println!("モデルを読み込み中...");
    match session.start_detection().await {
        Ok(()) => println!("検出を開始しました"),
        Err(e) => println!("{}", e),
    }
}

/// カメラ映像とオーバーレイをプレビューに描く
struct Preview {
    window: Option<PreviewWindow>,
    disabled: bool,
}

impl Preview {
    fn refresh(&mut self, session: &mut DetectionSession) {
        let Some((width, height)) = session.resolution() else {
            self.window = None;
            return;
        };
        if self.disabled {
            return;
        }

        if self.window.is_none() {
            match PreviewWindow::new("Gesture Link", width as usize, height as usize) {
                Ok(window) => self.window = Some(window),
                Err(e) => {
                    log::warn!("Preview window unavailable: {}", e);
                    self.disabled = true;
                    return;
                }
            }
        }
        let Some(window) = self.window.as_mut() else {
            return;
        };

        if !window.is_open() {
            self.window = None;
            session.stop_camera();
            println!("ウィンドウが閉じられたためカメラを停止しました");
            return;
        }

        let mut canvas = match session.latest_frame() {
            Some(frame) => Canvas::from_frame(&frame),
            None => Canvas::new(width as usize, height as usize),
        };
        session.processor().with_overlay(|overlay| overlay.compose_onto(&mut canvas));
        if let Err(e) = window.show(&canvas) {
            log::warn!("Preview update failed: {}", e);
            self.window = None;
            self.disabled = true;
        }
    }
}

/// コマンドを1つ処理する。終了なら false
async fn handle_command(command: &str, session: &mut DetectionSession) -> bool {
    match command {
        "" => {}
        "c" => toggle_camera(session),
        "d" => toggle_detection(session).await,
        "t" => {
            session.processor().request_telemetry().await;
            println!("次の顔検出でシリアルポートに接続します");
        }
        "s" => print_status(session).await,
        "q" => return false,
        other => {
            println!("不明なコマンド: {}", other);
            print_menu();
        }
    }
    true
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load_or_default(CONFIG_PATH);

    println!("=== Gesture Link ({}) ===", env!("GIT_VERSION"));
    println!("カメラ: index={} {}x{}@{}fps", config.camera.index, config.camera.width, config.camera.height, config.camera.fps);
    println!("シリアル候補: {:?}", config.telemetry.ports);
    println!();
    print_menu();

    let face = Arc::new(SubprocessFaceClassifier::new(&config.models.python, &config.models.face_script));
    let hands = Arc::new(SubprocessHandClassifier::new(&config.models.python, &config.models.hand_script));

    let sink = TelemetrySink::new(
        config.telemetry.min_interval(),
        Box::new(DevicePathSelector::new(config.telemetry.ports.iter())),
    );
    let processor = Arc::new(FrameProcessor::new(Box::new(CanvasOverlay::default()), sink));
    if config.telemetry.enabled {
        processor.request_telemetry().await;
    }

    let mut session = DetectionSession::new(
        Box::new(OpenCvCameraProvider::new(config.camera.clone())),
        face,
        hands,
        processor.clone(),
        config.detection.clone(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut preview = Preview {
        window: None,
        disabled: false,
    };
    let mut refresh = tokio::time::interval(PREVIEW_INTERVAL);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);

    prompt()?;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if !handle_command(line.trim(), &mut session).await {
                    break;
                }
                prompt()?;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            _ = refresh.tick() => {
                preview.refresh(&mut session);
            }
        }
    }

    println!("終了中...");
    session.stop_camera();
    processor.close_telemetry().await;

    Ok(())
}

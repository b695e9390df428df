use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;

use crate::camera::Frame;
use crate::detector::{DetectedHand, FaceClassifier, HandClassifier};
use crate::face::FaceDetection;
use crate::hand::{count_extended_fingers, display_label, Handedness};
use crate::render::Overlay;
use crate::telemetry::{SendOutcome, TelemetrySink, TelemetrySnapshot};

/// 検出していないときの表示
pub const PLACEHOLDER: &str = "-";
/// 顔が見つからなかったときの表示
pub const NOT_DETECTED: &str = "No detectado";
/// 分類器が失敗したときの表示
pub const ERROR_TEXT: &str = "Error";

/// 画面に出す3つの結果欄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    pub emotion: String,
    pub traits: String,
    pub fingers: String,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            emotion: PLACEHOLDER.to_string(),
            traits: PLACEHOLDER.to_string(),
            fingers: PLACEHOLDER.to_string(),
        }
    }
}

/// 生ラベルごとの最新の指数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HandCounts {
    pub left: u8,
    pub right: u8,
}

/// 1本の手の解釈結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandReading {
    pub handedness: Handedness,
    pub label: &'static str,
    pub fingers: u8,
}

/// 分類器の結果を表示・オーバーレイ・テレメトリへ振り分ける。
/// 顔と手の両ポーリングから共有される
pub struct FrameProcessor {
    active: AtomicBool,
    display: Mutex<DisplayState>,
    hands: Mutex<HandCounts>,
    overlay: Mutex<Box<dyn Overlay>>,
    telemetry: tokio::sync::Mutex<TelemetrySink>,
}

impl FrameProcessor {
    pub fn new(overlay: Box<dyn Overlay>, telemetry: TelemetrySink) -> Self {
        Self {
            active: AtomicBool::new(false),
            display: Mutex::new(DisplayState::default()),
            hands: Mutex::new(HandCounts::default()),
            overlay: Mutex::new(overlay),
            telemetry: tokio::sync::Mutex::new(telemetry),
        }
    }

    /// 結果の反映を始める
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// 反映を止め、オーバーレイ・表示・指数を初期状態に戻す
    pub fn reset(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.lock_overlay().clear();
        *self.lock_display() = DisplayState::default();
        *self.lock_hands() = HandCounts::default();
    }

    /// オーバーレイをカメラ解像度に合わせる
    pub fn resize(&self, width: u32, height: u32) {
        self.lock_overlay().resize(width, height);
    }

    pub fn display(&self) -> DisplayState {
        self.lock_display().clone()
    }

    pub fn hand_counts(&self) -> HandCounts {
        *self.lock_hands()
    }

    /// オーバーレイを参照する
    pub fn with_overlay<R>(&self, f: impl FnOnce(&mut dyn Overlay) -> R) -> R {
        let mut overlay = self.lock_overlay();
        f(&mut **overlay)
    }

    pub async fn request_telemetry(&self) {
        self.telemetry.lock().await.request();
    }

    pub async fn telemetry_requested(&self) -> bool {
        self.telemetry.lock().await.is_requested()
    }

    pub async fn close_telemetry(&self) {
        self.telemetry.lock().await.close().await;
    }

    /// 顔ポーリングの1ティック
    pub async fn process_face(&self, classifier: &dyn FaceClassifier, frame: &Frame) {
        let result = classifier.detect(frame).await;
        if !self.is_active() {
            return;
        }

        if let Some(snapshot) = self.apply_face(result) {
            let outcome = self.telemetry.lock().await.offer(&snapshot, Instant::now()).await;
            if outcome == SendOutcome::Failed {
                log::debug!("Telemetry snapshot dropped");
            }
        }
    }

    /// 手ポーリングの1ティック
    pub async fn process_hands(&self, classifier: &dyn HandClassifier, frame: &Frame) {
        let result = classifier.detect(frame).await;
        if !self.is_active() {
            return;
        }
        self.apply_hands(result);
    }

    /// 顔の結果を反映し、顔があれば送信用スナップショットを返す
    pub fn apply_face(&self, result: Result<Option<FaceDetection>>) -> Option<TelemetrySnapshot> {
        match result {
            Err(e) => {
                log::warn!("Face detection failed: {:#}", e);
                let mut display = self.lock_display();
                display.emotion = ERROR_TEXT.to_string();
                display.traits = ERROR_TEXT.to_string();
                None
            }
            Ok(None) => {
                self.lock_overlay().clear_face();
                let mut display = self.lock_display();
                display.emotion = NOT_DETECTED.to_string();
                display.traits = NOT_DETECTED.to_string();
                None
            }
            Ok(Some(face)) => {
                self.lock_overlay().draw_face(&face);
                {
                    let mut display = self.lock_display();
                    display.emotion = face.emotion_text();
                    display.traits = face.traits_text();
                }

                let counts = self.hand_counts();
                let (expression, score) = face.dominant_expression();
                log::debug!(
                    "Face: {} ({:.2}), age={:.1}, gender={}",
                    expression.name(), score, face.age, face.gender
                );

                Some(TelemetrySnapshot {
                    emotion: expression.name().to_string(),
                    age: face.rounded_age(),
                    gender: face.gender.clone(),
                    left_hand_fingers: counts.left,
                    right_hand_fingers: counts.right,
                })
            }
        }
    }

    /// 手の結果を反映し、手ごとの解釈を返す
    pub fn apply_hands(&self, result: Result<Vec<DetectedHand>>) -> Vec<HandReading> {
        let hands = match result {
            Ok(hands) => hands,
            Err(e) => {
                log::warn!("Hand detection failed: {:#}", e);
                self.lock_display().fingers = ERROR_TEXT.to_string();
                return Vec::new();
            }
        };

        let mut counts = HandCounts::default();
        let mut readings = Vec::with_capacity(hands.len());
        {
            let mut overlay = self.lock_overlay();
            overlay.clear_hands();

            for hand in &hands {
                overlay.draw_hand(&hand.landmarks);

                // 指カウントは生ラベル、表示は反転ラベル
                let fingers = count_extended_fingers(&hand.landmarks, hand.handedness);
                match hand.handedness {
                    Handedness::Left => counts.left = fingers,
                    Handedness::Right => counts.right = fingers,
                    Handedness::Unknown => {}
                }
                readings.push(HandReading {
                    handedness: hand.handedness,
                    label: display_label(hand.handedness),
                    fingers,
                });
            }
        }

        *self.lock_hands() = counts;

        let text = if readings.is_empty() {
            PLACEHOLDER.to_string()
        } else {
            readings
                .iter()
                .map(|r| format!("{} ({})", r.fingers, r.label))
                .collect::<Vec<_>>()
                .join(" y ")
        };
        log::debug!("Hands: {}", text);
        self.lock_display().fingers = text;

        readings
    }

    fn lock_display(&self) -> std::sync::MutexGuard<'_, DisplayState> {
        self.display.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_hands(&self) -> std::sync::MutexGuard<'_, HandCounts> {
        self.hands.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_overlay(&self) -> std::sync::MutexGuard<'_, Box<dyn Overlay>> {
        self.overlay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

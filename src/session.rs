//! カメラと検出のライフサイクル
//!
//! Idle → CameraOn → Detecting の3状態。検出中は顔と手の2つの
//! ポーリングタスクが最新フレームを分類器に渡し続ける。

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::camera::{CameraProvider, Frame, FrameSource};
use crate::config::DetectionConfig;
use crate::detector::{FaceClassifier, HandClassifier};
use crate::error::{CameraError, DetectionError};
use crate::processor::FrameProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    CameraOn,
    Detecting,
}

pub struct DetectionSession {
    provider: Box<dyn CameraProvider>,
    face: Arc<dyn FaceClassifier>,
    hands: Arc<dyn HandClassifier>,
    processor: Arc<FrameProcessor>,
    config: DetectionConfig,
    camera: Option<Arc<dyn FrameSource>>,
    polls: Vec<JoinHandle<()>>,
    models_loaded: bool,
}

impl DetectionSession {
    pub fn new(
        provider: Box<dyn CameraProvider>,
        face: Arc<dyn FaceClassifier>,
        hands: Arc<dyn HandClassifier>,
        processor: Arc<FrameProcessor>,
        config: DetectionConfig,
    ) -> Self {
        Self {
            provider,
            face,
            hands,
            processor,
            config,
            camera: None,
            polls: Vec::new(),
            models_loaded: false,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.camera, self.polls.is_empty()) {
            (None, _) => SessionState::Idle,
            (Some(_), true) => SessionState::CameraOn,
            (Some(_), false) => SessionState::Detecting,
        }
    }

    pub fn processor(&self) -> &Arc<FrameProcessor> {
        &self.processor
    }

    /// 起動中のカメラ解像度
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.camera.as_ref().map(|c| c.resolution())
    }

    /// 準備済みカメラの最新フレーム
    pub fn latest_frame(&self) -> Option<Frame> {
        self.camera.as_ref().and_then(|camera| ready_frame(camera.as_ref()))
    }

    /// カメラを開き、オーバーレイを解像度に合わせる。Idle 以外では何もしない
    pub fn start_camera(&mut self) -> Result<(), CameraError> {
        if self.camera.is_some() {
            return Ok(());
        }

        let camera = self.provider.open()?;
        let (width, height) = camera.resolution();
        self.processor.resize(width, height);
        log::info!("Camera started: {}x{}", width, height);

        self.camera = Some(camera);
        Ok(())
    }

    /// 検出中なら先に止めてからカメラを解放する
    pub fn stop_camera(&mut self) {
        self.stop_detection();

        if let Some(camera) = self.camera.take() {
            camera.release();
            log::info!("Camera stopped");
        }
    }

    /// モデルを読み込み、顔と手のポーリングを始める
    pub async fn start_detection(&mut self) -> Result<(), DetectionError> {
        let Some(camera) = self.camera.clone() else {
            return Err(DetectionError::CameraInactive);
        };
        if !self.polls.is_empty() {
            return Ok(());
        }

        if !self.models_loaded {
            let options = self.config.hand_options();
            log::info!(
                "Loading models (max_num_hands={}, model_complexity={}, min_detection_confidence={})",
                options.max_num_hands, options.model_complexity, options.min_detection_confidence
            );
            futures::future::try_join(self.face.load(), self.hands.load(&options)).await?;
            self.models_loaded = true;
        }

        self.processor.activate();
        self.polls.push(spawn_face_poll(
            self.config.face_interval(),
            camera.clone(),
            self.face.clone(),
            self.processor.clone(),
        ));
        self.polls.push(spawn_hand_poll(
            self.config.hand_interval(),
            camera,
            self.hands.clone(),
            self.processor.clone(),
        ));

        log::info!(
            "Detection started (face every {:?}, hands every {:?})",
            self.config.face_interval(), self.config.hand_interval()
        );
        Ok(())
    }

    /// ポーリングを止め、表示と指数を初期化する。検出中でなければ何もしない
    pub fn stop_detection(&mut self) {
        if self.polls.is_empty() {
            return;
        }

        for poll in self.polls.drain(..) {
            poll.abort();
        }
        self.processor.reset();
        log::info!("Detection stopped");
    }
}

impl Drop for DetectionSession {
    fn drop(&mut self) {
        self.stop_camera();
    }
}

/// 準備ができていれば最新フレームを返す
fn ready_frame(camera: &dyn FrameSource) -> Option<Frame> {
    if !camera.is_ready() {
        return None;
    }
    camera.latest_frame()
}

fn poll_interval(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

fn spawn_face_poll(
    period: Duration,
    camera: Arc<dyn FrameSource>,
    classifier: Arc<dyn FaceClassifier>,
    processor: Arc<FrameProcessor>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = poll_interval(period);
        loop {
            interval.tick().await;
            let Some(frame) = ready_frame(camera.as_ref()) else {
                continue;
            };
            processor.process_face(classifier.as_ref(), &frame).await;
        }
    })
}

fn spawn_hand_poll(
    period: Duration,
    camera: Arc<dyn FrameSource>,
    classifier: Arc<dyn HandClassifier>,
    processor: Arc<FrameProcessor>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = poll_interval(period);
        loop {
            interval.tick().await;
            let Some(frame) = ready_frame(camera.as_ref()) else {
                continue;
            };
            processor.process_hands(classifier.as_ref(), &frame).await;
        }
    })
}

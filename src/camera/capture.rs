use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use super::{CameraProvider, Frame, FrameSource};
use crate::config::CameraConfig;
use crate::error::CameraError;

/// 別スレッドでキャプチャし、最新フレームを保持するカメラ
pub struct OpenCvCamera {
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    width: u32,
    height: u32,
}

impl OpenCvCamera {
    /// 設定に従ってカメラを開き、キャプチャスレッドを起動する
    pub fn start(config: &CameraConfig) -> Result<Self, CameraError> {
        let mut capture = VideoCapture::new(config.index, VideoCaptureAPIs::CAP_ANY as i32)
            .map_err(|e| CameraError::Other(e.to_string()))?;

        if !capture.is_opened().unwrap_or(false) {
            return Err(CameraError::NotFound);
        }

        // 解像度を設定
        let apply = |capture: &mut VideoCapture| -> opencv::Result<()> {
            capture.set(videoio::CAP_PROP_FRAME_WIDTH, config.width as f64)?;
            capture.set(videoio::CAP_PROP_FRAME_HEIGHT, config.height as f64)?;
            capture.set(videoio::CAP_PROP_FPS, config.fps as f64)?;
            capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;
            Ok(())
        };
        apply(&mut capture).map_err(|e| CameraError::Other(e.to_string()))?;

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32;
        if width < config.min_width || height < config.min_height {
            log::warn!(
                "Camera {} gave {}x{}, below minimum {}x{}",
                config.index, width, height, config.min_width, config.min_height
            );
            return Err(CameraError::Overconstrained);
        }

        // 最初のフレームが読めなければ他のアプリが使用中とみなす
        let first = read_frame(&mut capture).map_err(|e| {
            log::warn!("Camera {} opened but not readable: {:#}", config.index, e);
            CameraError::Busy
        })?;

        log::info!("Camera {} opened ({}x{})", config.index, width, height);

        let latest = Arc::new(Mutex::new(Some(first)));
        let latest_ref = latest.clone();
        let running = Arc::new(AtomicBool::new(true));
        let running_ref = running.clone();
        let index = config.index;

        thread::spawn(move || {
            while running_ref.load(Ordering::Relaxed) {
                match read_frame(&mut capture) {
                    Ok(frame) => {
                        *latest_ref.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
                    }
                    Err(e) => {
                        log::warn!("Camera {} read error: {:#}", index, e);
                        thread::sleep(Duration::from_millis(100));
                    }
                }
            }
            if let Err(e) = capture.release() {
                log::warn!("Camera {} release failed: {}", index, e);
            }
            log::info!("Camera {} thread stopped", index);
        });

        Ok(Self {
            latest,
            running,
            width,
            height,
        })
    }
}

/// フレームを読み込んで BGR の Frame に変換
fn read_frame(capture: &mut VideoCapture) -> Result<Frame> {
    let mut mat = Mat::default();
    capture.read(&mut mat).context("Failed to read frame")?;

    if mat.empty() {
        anyhow::bail!("Empty frame received");
    }

    let mat = if mat.is_continuous() { mat } else { mat.try_clone()? };
    let data = mat.data_bytes().context("Frame is not readable")?.to_vec();

    Ok(Frame::new(
        mat.cols() as u32,
        mat.rows() as u32,
        mat.channels() as u32,
        data,
    ))
}

impl FrameSource for OpenCvCamera {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn is_ready(&self) -> bool {
        self.running.load(Ordering::Relaxed)
            && self.latest.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn latest_frame(&self) -> Option<Frame> {
        if !self.running.load(Ordering::Relaxed) {
            return None;
        }
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn release(&self) {
        self.running.store(false, Ordering::Relaxed);
        self.latest.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// 設定からカメラを開くプロバイダ
pub struct OpenCvCameraProvider {
    config: CameraConfig,
}

impl OpenCvCameraProvider {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }
}

impl CameraProvider for OpenCvCameraProvider {
    fn open(&mut self) -> Result<Arc<dyn FrameSource>, CameraError> {
        let camera = OpenCvCamera::start(&self.config)?;
        Ok(Arc::new(camera))
    }
}

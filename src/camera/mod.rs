#[cfg(feature = "desktop")]
pub mod capture;

#[cfg(feature = "desktop")]
pub use capture::{OpenCvCamera, OpenCvCameraProvider};

use std::sync::Arc;

use crate::error::CameraError;

/// カメラの1フレーム (BGR, 行優先)
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> Self {
        Self { width, height, channels, data }
    }

    /// 黒一色のフレーム
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, 3, vec![0; (width * height * 3) as usize])
    }
}

/// 起動済みカメラ
pub trait FrameSource: Send + Sync {
    /// 実際の解像度
    fn resolution(&self) -> (u32, u32);

    /// 推論に使える程度にフレームが届いているか
    fn is_ready(&self) -> bool;

    /// 最新フレーム。到着前は None
    fn latest_frame(&self) -> Option<Frame>;

    /// デバイスを解放する。解放済みでも失敗しない
    fn release(&self);
}

/// カメラを開く側
pub trait CameraProvider: Send {
    fn open(&mut self) -> Result<Arc<dyn FrameSource>, CameraError>;
}

//! 外部の顔・手分類器とのインターフェース
//!
//! 推論そのものは外部モデルに任せる。ここでは呼び出し契約だけを定義し、
//! テストでは偽の分類器に差し替えられるようにしている。

pub mod subprocess;

pub use subprocess::{SubprocessFaceClassifier, SubprocessHandClassifier};

use anyhow::Result;
use futures::future::BoxFuture;

use crate::camera::Frame;
use crate::error::ModelLoadError;
use crate::face::FaceDetection;
use crate::hand::{HandLandmarks, Handedness};

/// ハンドトラッカーの固定オプション
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandTrackerOptions {
    pub max_num_hands: u32,
    pub model_complexity: u32,
    pub min_detection_confidence: f32,
}

impl Default for HandTrackerOptions {
    fn default() -> Self {
        Self {
            max_num_hands: 2,
            model_complexity: 0,
            min_detection_confidence: 0.6,
        }
    }
}

/// ハンドモデルが返す1本の手
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHand {
    pub landmarks: HandLandmarks,
    /// モデルの生ラベル (鏡像)
    pub handedness: Handedness,
    pub confidence: f32,
}

/// 顔・表情・年齢・性別の分類器。最も目立つ顔を高々1つ返す
pub trait FaceClassifier: Send + Sync {
    /// モデルを読み込む。読み込み済みなら何もしない
    fn load(&self) -> BoxFuture<'_, Result<(), ModelLoadError>>;

    fn detect<'a>(&'a self, frame: &'a Frame) -> BoxFuture<'a, Result<Option<FaceDetection>>>;
}

/// 手のランドマーク分類器。0本以上の手を返す
pub trait HandClassifier: Send + Sync {
    fn load<'a>(&'a self, options: &'a HandTrackerOptions) -> BoxFuture<'a, Result<(), ModelLoadError>>;

    fn detect<'a>(&'a self, frame: &'a Frame) -> BoxFuture<'a, Result<Vec<DetectedHand>>>;
}

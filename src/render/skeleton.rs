use crate::hand::HandLandmarkIndex;

use HandLandmarkIndex::*;

/// 手の骨格の接続定義 (開始ランドマーク, 終了ランドマーク)
pub const HAND_CONNECTIONS: [(HandLandmarkIndex, HandLandmarkIndex); 23] = [
    // 親指
    (Wrist, ThumbCmc),
    (ThumbCmc, ThumbMcp),
    (ThumbMcp, ThumbIp),
    (ThumbIp, ThumbTip),
    // 人差し指
    (Wrist, IndexMcp),
    (IndexMcp, IndexPip),
    (IndexPip, IndexDip),
    (IndexDip, IndexTip),
    // 中指
    (Wrist, MiddleMcp),
    (MiddleMcp, MiddlePip),
    (MiddlePip, MiddleDip),
    (MiddleDip, MiddleTip),
    // 薬指
    (Wrist, RingMcp),
    (RingMcp, RingPip),
    (RingPip, RingDip),
    (RingDip, RingTip),
    // 小指
    (Wrist, PinkyMcp),
    (PinkyMcp, PinkyPip),
    (PinkyPip, PinkyDip),
    (PinkyDip, PinkyTip),
    // 指の付け根
    (IndexMcp, MiddleMcp),
    (MiddleMcp, RingMcp),
    (RingMcp, PinkyMcp),
];

/// 骨格線の色 (RGB)
pub const HAND_CONNECTION_COLOR: u32 = 0x00FF00; // 緑

/// ランドマークの色 (RGB)
pub const HAND_LANDMARK_COLOR: u32 = 0xFF0000; // 赤

/// ランドマークの半径 (px)
pub const HAND_LANDMARK_RADIUS: i32 = 4;

/// 顔の外接矩形の色 (RGB)
pub const FACE_BOX_COLOR: u32 = 0x00BFFF;

/// 顔ランドマークの色 (RGB)
pub const FACE_LANDMARK_COLOR: u32 = 0xFFFF00; // 黄色

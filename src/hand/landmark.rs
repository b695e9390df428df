/// MediaPipe Hands の 21 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum HandLandmarkIndex {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexMcp = 5,
    IndexPip = 6,
    IndexDip = 7,
    IndexTip = 8,
    MiddleMcp = 9,
    MiddlePip = 10,
    MiddleDip = 11,
    MiddleTip = 12,
    RingMcp = 13,
    RingPip = 14,
    RingDip = 15,
    RingTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmarkIndex {
    pub const COUNT: usize = 21;

    pub fn from_index(index: usize) -> Option<Self> {
        use HandLandmarkIndex::*;
        let all = [
            Wrist, ThumbCmc, ThumbMcp, ThumbIp, ThumbTip, IndexMcp, IndexPip, IndexDip, IndexTip,
            MiddleMcp, MiddlePip, MiddleDip, MiddleTip, RingMcp, RingPip, RingDip, RingTip,
            PinkyMcp, PinkyPip, PinkyDip, PinkyTip,
        ];
        all.get(index).copied()
    }
}

/// 単一ランドマーク
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    /// 正規化されたX座標 (0.0〜1.0)
    pub x: f32,
    /// 正規化されたY座標 (0.0〜1.0, 下向きが正)
    pub y: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// ピクセル座標に変換
    pub fn to_pixel(&self, width: u32, height: u32) -> (i32, i32) {
        let px = (self.x * width as f32) as i32;
        let py = (self.y * height as f32) as i32;
        (px, py)
    }
}

/// 21ランドマークからなる片手
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    pub points: [Landmark; HandLandmarkIndex::COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; HandLandmarkIndex::COUNT]) -> Self {
        Self { points }
    }

    /// ちょうど21点のときだけ構築できる
    pub fn from_slice(points: &[Landmark]) -> Option<Self> {
        let points: [Landmark; HandLandmarkIndex::COUNT] = points.try_into().ok()?;
        Some(Self { points })
    }

    /// インデックスでランドマークを取得
    pub fn get(&self, index: HandLandmarkIndex) -> &Landmark {
        &self.points[index as usize]
    }

    pub fn set(&mut self, index: HandLandmarkIndex, landmark: Landmark) {
        self.points[index as usize] = landmark;
    }
}

impl Default for HandLandmarks {
    fn default() -> Self {
        Self {
            points: [Landmark::default(); HandLandmarkIndex::COUNT],
        }
    }
}

use super::expression::{Expression, ExpressionScores};

/// 顔の外接矩形 (フレームのピクセル座標)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }
}

/// 顔分類器の1回分の結果
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    /// 顔ランドマーク (ピクセル座標)。分類器によっては空
    pub landmarks: Vec<(f32, f32)>,
    pub expressions: ExpressionScores,
    pub age: f32,
    pub gender: String,
}

impl FaceDetection {
    pub fn dominant_expression(&self) -> (Expression, f32) {
        self.expressions.dominant()
    }

    /// 表示用の年齢 (四捨五入)
    pub fn rounded_age(&self) -> i32 {
        self.age.round() as i32
    }

    /// "Feliz (87%)" 形式
    pub fn emotion_text(&self) -> String {
        let (expr, score) = self.dominant_expression();
        format!("{} ({}%)", expr.display_name(), (score * 100.0).round() as i32)
    }

    /// "31 años, male" 形式
    pub fn traits_text(&self) -> String {
        format!("{} años, {}", self.rounded_age(), self.gender)
    }
}

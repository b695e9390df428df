pub mod canvas;
pub mod skeleton;
#[cfg(feature = "desktop")]
pub mod window;

pub use canvas::Canvas;
pub use skeleton::HAND_CONNECTIONS;
#[cfg(feature = "desktop")]
pub use window::PreviewWindow;

use crate::face::FaceDetection;
use crate::hand::HandLandmarks;

/// 検出結果の重ね描き先
pub trait Overlay: Send {
    /// カメラ解像度に合わせる
    fn resize(&mut self, width: u32, height: u32);

    fn draw_face(&mut self, face: &FaceDetection);

    fn clear_face(&mut self);

    fn draw_hand(&mut self, hand: &HandLandmarks);

    fn clear_hands(&mut self);

    /// 全レイヤーを消す
    fn clear(&mut self) {
        self.clear_face();
        self.clear_hands();
    }

    /// 下地に重ねる。画面を持たない実装は何もしない
    fn compose_onto(&self, _base: &mut Canvas) {}
}

/// 顔レイヤーと手レイヤーを持つソフトウェアオーバーレイ
pub struct CanvasOverlay {
    pub face: Canvas,
    pub hands: Canvas,
}

impl CanvasOverlay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            face: Canvas::new(width as usize, height as usize),
            hands: Canvas::new(width as usize, height as usize),
        }
    }
}

impl Default for CanvasOverlay {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl Overlay for CanvasOverlay {
    fn resize(&mut self, width: u32, height: u32) {
        self.face.resize(width as usize, height as usize);
        self.hands.resize(width as usize, height as usize);
    }

    fn draw_face(&mut self, face: &FaceDetection) {
        self.face.clear();
        self.face.draw_face(face);
    }

    fn clear_face(&mut self) {
        self.face.clear();
    }

    fn draw_hand(&mut self, hand: &HandLandmarks) {
        self.hands.draw_hand(hand);
    }

    fn clear_hands(&mut self) {
        self.hands.clear();
    }

    fn compose_onto(&self, base: &mut Canvas) {
        base.overlay(&self.face);
        base.overlay(&self.hands);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::Landmark;

    #[test]
    fn test_overlay_clear_resets_both_layers() {
        let mut overlay = CanvasOverlay::new(20, 20);
        overlay.draw_hand(&HandLandmarks::new([Landmark::new(0.5, 0.5); 21]));
        overlay.face.draw_circle(5, 5, 1, 0xFFFFFF);
        assert!(overlay.hands.painted() > 0);
        assert!(overlay.face.painted() > 0);

        overlay.clear();
        assert_eq!(overlay.hands.painted(), 0);
        assert_eq!(overlay.face.painted(), 0);
    }

    #[test]
    fn test_compose_onto_frame() {
        let mut overlay = CanvasOverlay::new(10, 10);
        overlay.draw_hand(&HandLandmarks::new([Landmark::new(0.5, 0.5); 21]));

        let mut base = Canvas::new(10, 10);
        overlay.compose_onto(&mut base);
        assert_eq!(base.pixel(5, 5), Some(skeleton::HAND_LANDMARK_COLOR));
    }

    #[test]
    fn test_overlay_resize() {
        let mut overlay = CanvasOverlay::default();
        overlay.resize(64, 48);
        assert_eq!(overlay.face.size(), (64, 48));
        assert_eq!(overlay.hands.size(), (64, 48));
    }
}

use crate::camera::Frame;
use crate::face::FaceDetection;
use crate::hand::HandLandmarks;
use crate::render::skeleton::{
    FACE_BOX_COLOR, FACE_LANDMARK_COLOR, HAND_CONNECTIONS, HAND_CONNECTION_COLOR,
    HAND_LANDMARK_COLOR, HAND_LANDMARK_RADIUS,
};

/// 透明 (何も描かれていない)
pub const TRANSPARENT: u32 = 0;

/// 0x00RRGGBB のピクセルバッファ。0 は透明
pub struct Canvas {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            buffer: vec![TRANSPARENT; width * height],
            width,
            height,
        }
    }

    /// BGR フレームをキャンバスに変換 (サイズはフレームに合わせる)
    pub fn from_frame(frame: &Frame) -> Self {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let channels = frame.channels.max(1) as usize;
        let mut canvas = Self::new(width, height);

        for (dst, px) in canvas.buffer.iter_mut().zip(frame.data.chunks_exact(channels)) {
            // BGR -> RGB -> u32
            let (r, g, b) = if channels >= 3 {
                (px[2] as u32, px[1] as u32, px[0] as u32)
            } else {
                (px[0] as u32, px[0] as u32, px[0] as u32)
            };
            *dst = (r << 16) | (g << 8) | b;
        }

        canvas
    }

    /// 透明でないピクセルだけを上書きする。はみ出た部分は無視
    pub fn overlay(&mut self, top: &Canvas) {
        for y in 0..self.height.min(top.height) {
            for x in 0..self.width.min(top.width) {
                let color = top.buffer[y * top.width + x];
                if color != TRANSPARENT {
                    self.buffer[y * self.width + x] = color;
                }
            }
        }
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// サイズを変えて内容を消す
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.buffer = vec![TRANSPARENT; width * height];
    }

    pub fn clear(&mut self) {
        self.buffer.fill(TRANSPARENT);
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.buffer[y * self.width + x])
        } else {
            None
        }
    }

    /// 描画済みピクセル数
    pub fn painted(&self) -> usize {
        self.buffer.iter().filter(|&&p| p != TRANSPARENT).count()
    }

    /// 手の骨格とランドマークを描画 (正規化座標)
    pub fn draw_hand(&mut self, hand: &HandLandmarks) {
        let w = self.width as u32;
        let h = self.height as u32;

        for (start_idx, end_idx) in HAND_CONNECTIONS.iter() {
            let (x1, y1) = hand.get(*start_idx).to_pixel(w, h);
            let (x2, y2) = hand.get(*end_idx).to_pixel(w, h);
            self.draw_line(x1, y1, x2, y2, HAND_CONNECTION_COLOR);
        }

        for lm in hand.points.iter() {
            let (px, py) = lm.to_pixel(w, h);
            self.draw_circle(px, py, HAND_LANDMARK_RADIUS, HAND_LANDMARK_COLOR);
        }
    }

    /// 顔の外接矩形とランドマークを描画 (ピクセル座標)
    pub fn draw_face(&mut self, face: &FaceDetection) {
        let b = &face.bbox;
        let x0 = b.x as i32;
        let y0 = b.y as i32;
        let x1 = (b.x + b.width) as i32;
        let y1 = (b.y + b.height) as i32;
        self.draw_line(x0, y0, x1, y0, FACE_BOX_COLOR);
        self.draw_line(x1, y0, x1, y1, FACE_BOX_COLOR);
        self.draw_line(x1, y1, x0, y1, FACE_BOX_COLOR);
        self.draw_line(x0, y1, x0, y0, FACE_BOX_COLOR);

        for &(x, y) in &face.landmarks {
            self.draw_circle(x as i32, y as i32, 1, FACE_LANDMARK_COLOR);
        }
    }

    /// Bresenhamのアルゴリズムで線を描画
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u32) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 円を描画（塗りつぶし）
    pub fn draw_circle(&mut self, cx: i32, cy: i32, radius: i32, color: u32) {
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// ピクセルをセット（境界チェック付き）
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }
}

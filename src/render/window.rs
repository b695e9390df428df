use anyhow::Result;
use minifb::{Key, Window, WindowOptions};

use crate::render::canvas::Canvas;

/// minifbを使用したプレビューウィンドウ
pub struct PreviewWindow {
    window: Window,
    width: usize,
    height: usize,
}

impl PreviewWindow {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let mut window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(30);

        Ok(Self {
            window,
            width,
            height,
        })
    }

    /// ウィンドウが開いているか
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// キャンバスを表示。サイズが違う場合はクロップ/パディング
    pub fn show(&mut self, canvas: &Canvas) -> Result<()> {
        let mut screen = Canvas::new(self.width, self.height);
        screen.overlay(canvas);
        self.window
            .update_with_buffer(screen.buffer(), self.width, self.height)?;
        Ok(())
    }
}

//! 手の左右判定ラベル
//!
//! ハンドモデルはフロントカメラの鏡像として左右を報告する。
//! 指カウント ([`crate::hand::fingers`]) は生ラベルで較正されているので
//! 反転は表示用ラベルでのみ行う。二つは経験的な調整で結びついているため、
//! このマッピングを変えるときは親指判定も再検証すること。

use std::fmt;

/// ハンドモデルが報告する左右 (鏡像のまま)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

impl Handedness {
    /// モデルのラベル文字列を解釈する。"Left" / "Right" 以外は Unknown
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Left" => Handedness::Left,
            "Right" => Handedness::Right,
            _ => Handedness::Unknown,
        }
    }

    /// モデルが出力する形式のラベル
    pub fn as_label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
            Handedness::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Handedness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

pub const LEFT_HAND_TEXT: &str = "Izquierda";
pub const RIGHT_HAND_TEXT: &str = "Derecha";
pub const UNKNOWN_HAND_TEXT: &str = "Desconocida";

/// 画面表示用ラベル。生ラベルを反転して本人から見た左右にする
pub fn display_label(raw: Handedness) -> &'static str {
    match raw {
        Handedness::Right => LEFT_HAND_TEXT,
        Handedness::Left => RIGHT_HAND_TEXT,
        Handedness::Unknown => UNKNOWN_HAND_TEXT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(Handedness::from_label("Left"), Handedness::Left);
        assert_eq!(Handedness::from_label("Right"), Handedness::Right);
        assert_eq!(Handedness::from_label(" Right\n"), Handedness::Right);
        assert_eq!(Handedness::from_label("right"), Handedness::Unknown);
        assert_eq!(Handedness::from_label(""), Handedness::Unknown);
    }

    #[test]
    fn test_display_label_is_mirrored() {
        assert_eq!(display_label(Handedness::Right), LEFT_HAND_TEXT);
        assert_eq!(display_label(Handedness::Left), RIGHT_HAND_TEXT);
    }

    #[test]
    fn test_display_label_unknown() {
        assert_eq!(display_label(Handedness::Unknown), UNKNOWN_HAND_TEXT);
    }

    #[test]
    fn test_display_roundtrip_label() {
        for h in [Handedness::Left, Handedness::Right, Handedness::Unknown] {
            assert_eq!(Handedness::from_label(h.as_label()), h);
        }
    }
}

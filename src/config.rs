use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::detector::HandTrackerOptions;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラ番号
    #[serde(default = "default_camera_index")]
    pub index: i32,
    /// 希望解像度
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
    /// これ未満の解像度しか得られなければ Overconstrained
    #[serde(default = "default_camera_min_width")]
    pub min_width: u32,
    #[serde(default = "default_camera_min_height")]
    pub min_height: u32,
}

fn default_camera_index() -> i32 { 0 }
fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }
fn default_camera_fps() -> u32 { 30 }
fn default_camera_min_width() -> u32 { 320 }
fn default_camera_min_height() -> u32 { 240 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: default_camera_index(),
            width: default_camera_width(),
            height: default_camera_height(),
            fps: default_camera_fps(),
            min_width: default_camera_min_width(),
            min_height: default_camera_min_height(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// 顔検出の周期 (ms)
    #[serde(default = "default_face_interval_ms")]
    pub face_interval_ms: u64,
    /// 手検出の周期 (ms)。指カウントの応答性のため顔より短い
    #[serde(default = "default_hand_interval_ms")]
    pub hand_interval_ms: u64,
    #[serde(default = "default_max_num_hands")]
    pub max_num_hands: u32,
    #[serde(default = "default_model_complexity")]
    pub model_complexity: u32,
    #[serde(default = "default_min_detection_confidence")]
    pub min_detection_confidence: f32,
}

fn default_face_interval_ms() -> u64 { 300 }
fn default_hand_interval_ms() -> u64 { 150 }
fn default_max_num_hands() -> u32 { 2 }
fn default_model_complexity() -> u32 { 0 }
fn default_min_detection_confidence() -> f32 { 0.6 }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            face_interval_ms: default_face_interval_ms(),
            hand_interval_ms: default_hand_interval_ms(),
            max_num_hands: default_max_num_hands(),
            model_complexity: default_model_complexity(),
            min_detection_confidence: default_min_detection_confidence(),
        }
    }
}

impl DetectionConfig {
    pub fn face_interval(&self) -> Duration {
        Duration::from_millis(self.face_interval_ms.max(1))
    }

    pub fn hand_interval(&self) -> Duration {
        Duration::from_millis(self.hand_interval_ms.max(1))
    }

    pub fn hand_options(&self) -> HandTrackerOptions {
        HandTrackerOptions {
            max_num_hands: self.max_num_hands,
            model_complexity: self.model_complexity,
            min_detection_confidence: self.min_detection_confidence,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelsConfig {
    /// ワーカースクリプトを実行するインタプリタ
    #[serde(default = "default_python")]
    pub python: String,
    #[serde(default = "default_face_script")]
    pub face_script: String,
    #[serde(default = "default_hand_script")]
    pub hand_script: String,
}

fn default_python() -> String { ".venv/bin/python".to_string() }
fn default_face_script() -> String { "scripts/face_detect.py".to_string() }
fn default_hand_script() -> String { "scripts/hand_detect.py".to_string() }

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            python: default_python(),
            face_script: default_face_script(),
            hand_script: default_hand_script(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// 起動時から送信を要求するか
    #[serde(default)]
    pub enabled: bool,
    /// 候補のシリアルデバイス (先頭から順に試す)
    #[serde(default = "default_ports")]
    pub ports: Vec<String>,
    /// 送信の最小間隔 (ms)
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

fn default_ports() -> Vec<String> {
    vec!["/dev/ttyACM0".to_string(), "/dev/ttyUSB0".to_string()]
}
fn default_min_interval_ms() -> u64 { 500 }

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ports: default_ports(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

impl TelemetryConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// 読めなければデフォルト設定
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Using default config ({}: {})", path.display(), e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.detection.face_interval(), Duration::from_millis(300));
        assert_eq!(config.detection.hand_interval(), Duration::from_millis(150));
        assert_eq!(config.telemetry.min_interval(), Duration::from_millis(500));
        assert!(!config.telemetry.enabled);
        assert_eq!(config.camera.width, 640);
    }

    #[test]
    fn test_default_hand_options() {
        let options = Config::default().detection.hand_options();
        assert_eq!(options.max_num_hands, 2);
        assert_eq!(options.model_complexity, 0);
        assert!((options.min_detection_confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.detection.face_interval_ms, 300);
        assert_eq!(config.telemetry.ports, default_ports());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
            [detection]
            hand_interval_ms = 100

            [telemetry]
            enabled = true
            ports = ["/dev/ttyS3"]
            "#,
        )
        .unwrap();
        assert_eq!(config.detection.hand_interval_ms, 100);
        assert_eq!(config.detection.face_interval_ms, 300);
        assert!(config.telemetry.enabled);
        assert_eq!(config.telemetry.ports, vec!["/dev/ttyS3".to_string()]);
        assert_eq!(config.telemetry.min_interval_ms, 500);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::parse("[detection\nface_interval_ms = ").is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("does/not/exist.toml");
        assert_eq!(config.camera.index, 0);
    }
}

use thiserror::Error;

/// カメラ取得の失敗。表示文字列はそのままユーザーに見せる
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Error al acceder a la cámara: Permiso denegado. Por favor permite el acceso a la cámara.")]
    PermissionDenied,

    #[error("Error al acceder a la cámara: No se encontró cámara. Conecta una cámara e intenta de nuevo.")]
    NotFound,

    #[error("Error al acceder a la cámara: Configuración no compatible. Intenta con otro dispositivo.")]
    Overconstrained,

    #[error("Error al acceder a la cámara: La cámara está siendo usada por otra aplicación.")]
    Busy,

    #[error("Error al acceder a la cámara: Este sistema no soporta acceso a la cámara.")]
    Unsupported,

    #[error("Error al acceder a la cámara: {0}")]
    Other(String),
}

impl CameraError {
    /// デバイスAPIのエラー名から分類する
    pub fn classify(code: &str, detail: &str) -> Self {
        match code {
            "NotAllowedError" | "SecurityError" => CameraError::PermissionDenied,
            "NotFoundError" => CameraError::NotFound,
            "OverconstrainedError" => CameraError::Overconstrained,
            "NotReadableError" | "AbortError" => CameraError::Busy,
            "NotSupportedError" => CameraError::Unsupported,
            _ => CameraError::Other(detail.to_string()),
        }
    }
}

/// モデル読み込みの失敗
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("Error al iniciar detección: Modelos no encontrados. Verifica la carpeta \"models\" ({0})")]
    AssetsMissing(String),

    #[error("Error al iniciar detección: Ver registro para detalles ({0})")]
    Other(String),
}

impl From<anyhow::Error> for ModelLoadError {
    fn from(e: anyhow::Error) -> Self {
        ModelLoadError::Other(format!("{:#}", e))
    }
}

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("La cámara no está activa")]
    CameraInactive,

    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("No compatible serial port available")]
    NoPort,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

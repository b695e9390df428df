//! 外部プロセスで動くモデルワーカーを使う分類器
//!
//! ワーカーはモデル読み込み後に標準出力へ `READY` を1行出す。
//! 以降はリクエストごとに width, height, channels (各 u32 LE) のヘッダと
//! BGR の生データを標準入力へ書き、JSON を1行読む。応答を待っている間に
//! 中断されたワーカーは破棄し、次のリクエストで起動し直す。
//!
//! 手: `{"hands":[{"handedness":"Left","score":0.9,"landmarks":[{"x":0.1,"y":0.2}, ...]}],"error":null}`
//!
//! 顔: `{"face":{"box":{...},"landmarks":[...],"expressions":{"happy":0.9},"age":31.0,"gender":"male"},"error":null}`

use anyhow::{bail, Context, Result};
use bytes::{BufMut, BytesMut};
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio_util::codec::{Encoder, FramedRead, FramedWrite, LinesCodec};

use super::{DetectedHand, FaceClassifier, HandClassifier, HandTrackerOptions};
use crate::camera::Frame;
use crate::error::ModelLoadError;
use crate::face::{BoundingBox, ExpressionScores, FaceDetection};
use crate::hand::{HandLandmarks, Handedness, Landmark};

/// 応答1行の上限
const MAX_RESPONSE_LENGTH: usize = 1024 * 1024;

/// リクエストのフレーミング: width, height, channels (u32 LE) + 生データ
struct FrameEncoder;

impl<'a> Encoder<&'a Frame> for FrameEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, frame: &'a Frame, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        dst.reserve(12 + frame.data.len());
        dst.put_u32_le(frame.width);
        dst.put_u32_le(frame.height);
        dst.put_u32_le(frame.channels);
        dst.put_slice(&frame.data);
        Ok(())
    }
}

type WorkerReader = Box<dyn AsyncRead + Send + Unpin>;
type WorkerWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// 起動済みワーカーとの入出力
struct WorkerIo {
    // kill_on_drop のために保持する
    _child: Option<Child>,
    requests: FramedWrite<WorkerWriter, FrameEncoder>,
    responses: FramedRead<WorkerReader, LinesCodec>,
}

impl WorkerIo {
    fn new(child: Option<Child>, reader: WorkerReader, writer: WorkerWriter) -> Self {
        Self {
            _child: child,
            requests: FramedWrite::new(writer, FrameEncoder),
            responses: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_RESPONSE_LENGTH)),
        }
    }

    async fn next_line(&mut self) -> Result<String> {
        match self.responses.next().await {
            Some(line) => Ok(line?),
            None => bail!("worker exited"),
        }
    }

    async fn exchange(&mut self, frame: &Frame) -> Result<String> {
        self.requests.send(frame).await?;
        self.next_line().await
    }
}

/// ワーカーを起動する側
trait WorkerLauncher: Send + Sync {
    /// ログ用の名前
    fn name(&self) -> String;

    fn launch<'a>(&'a self, args: &'a [String]) -> BoxFuture<'a, Result<WorkerIo, ModelLoadError>>;
}

/// インタプリタでスクリプトを子プロセスとして動かす
struct ScriptLauncher {
    interpreter: PathBuf,
    script: PathBuf,
}

impl WorkerLauncher for ScriptLauncher {
    fn name(&self) -> String {
        self.script.display().to_string()
    }

    fn launch<'a>(&'a self, args: &'a [String]) -> BoxFuture<'a, Result<WorkerIo, ModelLoadError>> {
        Box::pin(async move {
            if !self.script.exists() {
                return Err(ModelLoadError::AssetsMissing(self.script.display().to_string()));
            }

            let mut child = Command::new(&self.interpreter)
                .arg(&self.script)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => {
                        ModelLoadError::AssetsMissing(self.interpreter.display().to_string())
                    }
                    _ => ModelLoadError::Other(format!(
                        "failed to start {}: {}",
                        self.interpreter.display(),
                        e
                    )),
                })?;

            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| ModelLoadError::Other("worker stdin unavailable".into()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| ModelLoadError::Other("worker stdout unavailable".into()))?;

            Ok(WorkerIo::new(Some(child), Box::new(stdout), Box::new(stdin)))
        })
    }
}

/// 1つのモデルワーカー。落ちたり中断されたりしたら次のリクエストで起動し直す
struct ScriptWorker {
    launcher: Box<dyn WorkerLauncher>,
    io: tokio::sync::Mutex<Option<WorkerIo>>,
    // 最後に起動したときの引数
    args: Mutex<Option<Vec<String>>>,
}

impl ScriptWorker {
    fn new(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self::with_launcher(Box::new(ScriptLauncher {
            interpreter: interpreter.into(),
            script: script.into(),
        }))
    }

    fn with_launcher(launcher: Box<dyn WorkerLauncher>) -> Self {
        Self {
            launcher,
            io: tokio::sync::Mutex::new(None),
            args: Mutex::new(None),
        }
    }

    /// ワーカーを起動して READY を待つ。起動済みなら何もしない
    async fn start(&self, args: &[String]) -> Result<(), ModelLoadError> {
        let mut slot = self.io.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        *slot = Some(self.open(args).await?);
        *self.args.lock().unwrap_or_else(PoisonError::into_inner) = Some(args.to_vec());
        Ok(())
    }

    async fn open(&self, args: &[String]) -> Result<WorkerIo, ModelLoadError> {
        let name = self.launcher.name();
        log::info!("Starting model worker {}", name);

        let mut io = self.launcher.launch(args).await?;
        let ready = io
            .next_line()
            .await
            .map_err(|e| ModelLoadError::Other(format!("{}: {:#}", name, e)))?;
        if ready.trim() != "READY" {
            return Err(ModelLoadError::Other(format!(
                "{} did not signal ready, got: {:?}",
                name,
                ready.trim()
            )));
        }

        log::info!("Model worker {} ready", name);
        Ok(io)
    }

    /// フレームを送り、応答の JSON 行を返す
    async fn request(&self, frame: &Frame) -> Result<String> {
        let mut slot = self.io.lock().await;

        // 応答を読み終えるまでスロットには戻さない。
        // 途中で中断・失敗したワーカーはここで破棄される
        let mut io = match slot.take() {
            Some(io) => io,
            None => {
                let args = self.args.lock().unwrap_or_else(PoisonError::into_inner).clone();
                let Some(args) = args else {
                    bail!("{} is not running", self.launcher.name());
                };
                log::info!("Restarting model worker {}", self.launcher.name());
                self.open(&args).await?
            }
        };

        let line = io
            .exchange(frame)
            .await
            .with_context(|| format!("{} exchange failed", self.launcher.name()))?;
        *slot = Some(io);
        Ok(line)
    }
}

#[derive(Deserialize, Debug)]
struct PointJson {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    handedness: String,
    score: f32,
    landmarks: Vec<PointJson>,
}

#[derive(Deserialize, Debug)]
struct HandsResponse {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct BoxJson {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

#[derive(Deserialize, Debug)]
struct FaceJson {
    #[serde(rename = "box")]
    bbox: BoxJson,
    #[serde(default)]
    landmarks: Vec<PointJson>,
    expressions: HashMap<String, f32>,
    age: f32,
    gender: String,
}

#[derive(Deserialize, Debug)]
struct FaceResponse {
    #[serde(default)]
    face: Option<FaceJson>,
    #[serde(default)]
    error: Option<String>,
}

/// 手ワーカーの応答を解釈する
pub fn parse_hands_response(line: &str, options: &HandTrackerOptions) -> Result<Vec<DetectedHand>> {
    let response: HandsResponse = serde_json::from_str(line)
        .with_context(|| format!("Failed to parse hand response: {}", line.trim()))?;

    if let Some(error) = response.error {
        bail!("hand worker error: {}", error);
    }

    let mut hands = Vec::new();
    for hand in response.hands {
        if hands.len() >= options.max_num_hands as usize {
            break;
        }
        if hand.score < options.min_detection_confidence {
            continue;
        }

        let points: Vec<Landmark> = hand.landmarks.iter().map(|p| Landmark::new(p.x, p.y)).collect();
        let Some(landmarks) = HandLandmarks::from_slice(&points) else {
            log::warn!("Expected 21 landmarks, got {}", points.len());
            continue;
        };

        hands.push(DetectedHand {
            landmarks,
            handedness: Handedness::from_label(&hand.handedness),
            confidence: hand.score,
        });
    }

    Ok(hands)
}

/// 顔ワーカーの応答を解釈する
pub fn parse_face_response(line: &str) -> Result<Option<FaceDetection>> {
    let response: FaceResponse = serde_json::from_str(line)
        .with_context(|| format!("Failed to parse face response: {}", line.trim()))?;

    if let Some(error) = response.error {
        bail!("face worker error: {}", error);
    }

    Ok(response.face.map(|face| FaceDetection {
        bbox: BoundingBox::new(face.bbox.x, face.bbox.y, face.bbox.width, face.bbox.height),
        landmarks: face.landmarks.iter().map(|p| (p.x, p.y)).collect(),
        expressions: ExpressionScores::from_pairs(
            face.expressions.iter().map(|(name, score)| (name.as_str(), *score)),
        ),
        age: face.age,
        gender: face.gender,
    }))
}

/// MediaPipe Hands をワーカーで動かす分類器
pub struct SubprocessHandClassifier {
    worker: ScriptWorker,
    options: Mutex<HandTrackerOptions>,
}

impl SubprocessHandClassifier {
    pub fn new<P: AsRef<Path>, S: AsRef<Path>>(interpreter: P, script: S) -> Self {
        Self {
            worker: ScriptWorker::new(interpreter.as_ref(), script.as_ref()),
            options: Mutex::new(HandTrackerOptions::default()),
        }
    }
}

impl HandClassifier for SubprocessHandClassifier {
    fn load<'a>(&'a self, options: &'a HandTrackerOptions) -> BoxFuture<'a, Result<(), ModelLoadError>> {
        Box::pin(async move {
            *self.options.lock().unwrap_or_else(PoisonError::into_inner) = *options;
            let args = vec![
                "--max-num-hands".to_string(),
                options.max_num_hands.to_string(),
                "--model-complexity".to_string(),
                options.model_complexity.to_string(),
                "--min-detection-confidence".to_string(),
                options.min_detection_confidence.to_string(),
            ];
            self.worker.start(&args).await
        })
    }

    fn detect<'a>(&'a self, frame: &'a Frame) -> BoxFuture<'a, Result<Vec<DetectedHand>>> {
        Box::pin(async move {
            let line = self.worker.request(frame).await?;
            let options = *self.options.lock().unwrap_or_else(PoisonError::into_inner);
            let hands = parse_hands_response(&line, &options)?;
            log::debug!("{} hand(s) detected", hands.len());
            Ok(hands)
        })
    }
}

/// 顔・表情・年齢・性別をワーカーで推定する分類器
pub struct SubprocessFaceClassifier {
    worker: ScriptWorker,
}

impl SubprocessFaceClassifier {
    pub fn new<P: AsRef<Path>, S: AsRef<Path>>(interpreter: P, script: S) -> Self {
        Self {
            worker: ScriptWorker::new(interpreter.as_ref(), script.as_ref()),
        }
    }
}

impl FaceClassifier for SubprocessFaceClassifier {
    fn load(&self) -> BoxFuture<'_, Result<(), ModelLoadError>> {
        Box::pin(async move { self.worker.start(&[]).await })
    }

    fn detect<'a>(&'a self, frame: &'a Frame) -> BoxFuture<'a, Result<Option<FaceDetection>>> {
        Box::pin(async move {
            let line = self.worker.request(frame).await?;
            parse_face_response(&line)
        })
    }
}

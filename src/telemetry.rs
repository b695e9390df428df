//! マイコン向けのシリアル送信
//!
//! 1メッセージは5行: emotion, age, gender, 左の指数, 右の指数。
//! 各行は `\n` で終わる。ACK もチェックサムもない。

use bytes::{BufMut, BytesMut};
use futures::future::BoxFuture;
use futures::SinkExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::time::Instant;
use tokio_util::codec::{Encoder, FramedWrite};

use crate::error::TelemetryError;

/// 送信の最小間隔
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// 1回分の送信内容
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    /// 表情のキー名 (例: "happy")
    pub emotion: String,
    pub age: i32,
    pub gender: String,
    /// 生ラベル Left の手の指数
    pub left_hand_fingers: u8,
    /// 生ラベル Right の手の指数
    pub right_hand_fingers: u8,
}

/// フィールド内の改行は取り除く
fn sanitize(field: &str) -> String {
    field.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// スナップショットをワイヤ形式の文字列にする
pub fn encode_snapshot(snapshot: &TelemetrySnapshot) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n",
        sanitize(&snapshot.emotion),
        snapshot.age,
        sanitize(&snapshot.gender),
        snapshot.left_hand_fingers,
        snapshot.right_hand_fingers
    )
}

/// 改行区切りのエンコーダ
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryCodec;

impl Encoder<TelemetrySnapshot> for TelemetryCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: TelemetrySnapshot, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = encode_snapshot(&item);
        dst.reserve(line.len());
        dst.put_slice(line.as_bytes());
        Ok(())
    }
}

pub type TelemetryPort = Box<dyn AsyncWrite + Send + Unpin>;

/// 送信先デバイスの選択
pub trait PortSelector: Send {
    /// Ok(None) はユーザーによるキャンセル
    fn select(&mut self) -> BoxFuture<'_, Result<Option<TelemetryPort>, TelemetryError>>;
}

/// 設定されたデバイスパスを先頭から順に開く
pub struct DevicePathSelector {
    paths: Vec<PathBuf>,
}

impl DevicePathSelector {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl PortSelector for DevicePathSelector {
    fn select(&mut self) -> BoxFuture<'_, Result<Option<TelemetryPort>, TelemetryError>> {
        Box::pin(async move {
            for path in &self.paths {
                match tokio::fs::OpenOptions::new().write(true).open(path).await {
                    Ok(file) => {
                        log::info!("Serial port {} opened", path.display());
                        return Ok(Some(Box::new(file) as TelemetryPort));
                    }
                    Err(e) => log::debug!("Serial port {} unavailable: {}", path.display(), e),
                }
            }
            Err(TelemetryError::NoPort)
        })
    }
}

/// `offer` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// 送信が要求されていない
    NotRequested,
    /// 前回の試行から間隔が足りない
    Throttled,
    Sent,
    /// ポートを選べなかったので無効化した
    Unavailable,
    /// 書き込みに失敗したので接続を捨てた
    Failed,
}

/// 間引き付きのシリアル送信
pub struct TelemetrySink {
    min_interval: Duration,
    requested: bool,
    last_attempt: Option<Instant>,
    selector: Box<dyn PortSelector>,
    port: Option<FramedWrite<TelemetryPort, TelemetryCodec>>,
}

impl TelemetrySink {
    pub fn new(min_interval: Duration, selector: Box<dyn PortSelector>) -> Self {
        Self {
            min_interval,
            requested: false,
            last_attempt: None,
            selector,
            port: None,
        }
    }

    /// ユーザーが送信を要求した。接続は次の送信時に行う
    pub fn request(&mut self) {
        if !self.requested {
            log::info!("Telemetry requested");
        }
        self.requested = true;
    }

    pub fn is_requested(&self) -> bool {
        self.requested
    }

    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// スナップショットを送る。間隔内の呼び出しは捨てる
    pub async fn offer(&mut self, snapshot: &TelemetrySnapshot, now: Instant) -> SendOutcome {
        if !self.requested {
            return SendOutcome::NotRequested;
        }

        if let Some(last) = self.last_attempt {
            if now.saturating_duration_since(last) < self.min_interval {
                return SendOutcome::Throttled;
            }
        }
        self.last_attempt = Some(now);

        if self.port.is_none() {
            match self.selector.select().await {
                Ok(Some(port)) => {
                    self.port = Some(FramedWrite::new(port, TelemetryCodec));
                }
                Ok(None) => {
                    log::info!("Serial port selection cancelled, telemetry disabled");
                    self.requested = false;
                    return SendOutcome::Unavailable;
                }
                Err(e) => {
                    log::warn!("Telemetry disabled: {}", e);
                    self.requested = false;
                    return SendOutcome::Unavailable;
                }
            }
        }

        let Some(port) = self.port.as_mut() else {
            return SendOutcome::Unavailable;
        };

        match port.send(snapshot.clone()).await {
            Ok(()) => {
                log::debug!("Telemetry sent: {:?}", snapshot);
                SendOutcome::Sent
            }
            Err(e) => {
                log::warn!("Telemetry write failed, will reconnect: {}", e);
                self.port = None;
                SendOutcome::Failed
            }
        }
    }

    /// 接続を閉じて送信要求を取り消す。失敗は無視する
    pub async fn close(&mut self) {
        self.requested = false;
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.close().await {
                log::debug!("Telemetry close failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::io::{AsyncReadExt, DuplexStream};

    /// 用意したポートを順に返し、尽きたらキャンセル扱い
    struct QueueSelector {
        ports: VecDeque<DuplexStream>,
    }

    impl QueueSelector {
        fn new(ports: Vec<DuplexStream>) -> Self {
            Self { ports: ports.into() }
        }
    }

    impl PortSelector for QueueSelector {
        fn select(&mut self) -> BoxFuture<'_, Result<Option<TelemetryPort>, TelemetryError>> {
            let port = self.ports.pop_front();
            Box::pin(async move { Ok(port.map(|p| Box::new(p) as TelemetryPort)) })
        }
    }

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            emotion: "happy".to_string(),
            age: 27,
            gender: "female".to_string(),
            left_hand_fingers: 2,
            right_hand_fingers: 5,
        }
    }

    async fn read_all(mut server: DuplexStream) -> String {
        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        out
    }

    #[test]
    fn test_encode_snapshot() {
        assert_eq!(encode_snapshot(&snapshot()), "happy\n27\nfemale\n2\n5\n");
    }

    #[test]
    fn test_encode_strips_newlines_in_fields() {
        let mut s = snapshot();
        s.gender = "fe\nmale\r".to_string();
        assert_eq!(encode_snapshot(&s), "happy\n27\nfemale\n2\n5\n");
    }

    #[test]
    fn test_codec_appends() {
        let mut buf = BytesMut::new();
        let mut codec = TelemetryCodec;
        codec.encode(snapshot(), &mut buf).unwrap();
        codec.encode(snapshot(), &mut buf).unwrap();
        assert_eq!(buf.iter().filter(|&&b| b == b'\n').count(), 10);
    }

    #[tokio::test]
    async fn test_not_requested_does_nothing() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut sink = TelemetrySink::new(DEFAULT_MIN_INTERVAL, Box::new(QueueSelector::new(vec![client])));
        let outcome = sink.offer(&snapshot(), Instant::now()).await;
        assert_eq!(outcome, SendOutcome::NotRequested);
        assert!(!sink.is_connected());
    }

    #[tokio::test]
    async fn test_throttle() {
        let (client, server) = tokio::io::duplex(4096);
        let mut sink = TelemetrySink::new(DEFAULT_MIN_INTERVAL, Box::new(QueueSelector::new(vec![client])));
        sink.request();

        let t0 = Instant::now();
        let mut outcomes = Vec::new();
        for ms in [0, 100, 400, 600] {
            outcomes.push(sink.offer(&snapshot(), t0 + Duration::from_millis(ms)).await);
        }
        assert_eq!(
            outcomes,
            vec![
                SendOutcome::Sent,
                SendOutcome::Throttled,
                SendOutcome::Throttled,
                SendOutcome::Sent
            ]
        );

        drop(sink);
        let written = read_all(server).await;
        assert_eq!(written, "happy\n27\nfemale\n2\n5\n".repeat(2));
    }

    #[tokio::test]
    async fn test_lazy_connect() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut sink = TelemetrySink::new(DEFAULT_MIN_INTERVAL, Box::new(QueueSelector::new(vec![client])));
        sink.request();
        assert!(!sink.is_connected());
        sink.offer(&snapshot(), Instant::now()).await;
        assert!(sink.is_connected());
    }

    #[tokio::test]
    async fn test_cancelled_selection_disables() {
        let mut sink = TelemetrySink::new(DEFAULT_MIN_INTERVAL, Box::new(QueueSelector::new(vec![])));
        sink.request();

        let t0 = Instant::now();
        assert_eq!(sink.offer(&snapshot(), t0).await, SendOutcome::Unavailable);
        assert!(!sink.is_requested());
        assert_eq!(
            sink.offer(&snapshot(), t0 + Duration::from_secs(5)).await,
            SendOutcome::NotRequested
        );
    }

    #[tokio::test]
    async fn test_write_failure_reconnects_lazily() {
        let (dead_client, dead_server) = tokio::io::duplex(64);
        drop(dead_server);
        let (client, server) = tokio::io::duplex(1024);
        let mut sink = TelemetrySink::new(
            DEFAULT_MIN_INTERVAL,
            Box::new(QueueSelector::new(vec![dead_client, client])),
        );
        sink.request();

        let t0 = Instant::now();
        assert_eq!(sink.offer(&snapshot(), t0).await, SendOutcome::Failed);
        assert!(!sink.is_connected());
        assert!(sink.is_requested());

        // 直後は再試行しない
        assert_eq!(
            sink.offer(&snapshot(), t0 + Duration::from_millis(10)).await,
            SendOutcome::Throttled
        );

        assert_eq!(
            sink.offer(&snapshot(), t0 + Duration::from_millis(500)).await,
            SendOutcome::Sent
        );

        drop(sink);
        assert_eq!(read_all(server).await, "happy\n27\nfemale\n2\n5\n");
    }

    #[tokio::test]
    async fn test_close_releases_port() {
        let (client, server) = tokio::io::duplex(1024);
        let mut sink = TelemetrySink::new(DEFAULT_MIN_INTERVAL, Box::new(QueueSelector::new(vec![client])));
        sink.request();
        sink.offer(&snapshot(), Instant::now()).await;

        sink.close().await;
        assert!(!sink.is_connected());
        assert!(!sink.is_requested());
        // 書き込み側が閉じたので読み切れる
        assert_eq!(read_all(server).await, "happy\n27\nfemale\n2\n5\n");
    }

    #[tokio::test]
    async fn test_device_path_selector_without_devices() {
        let mut selector = DevicePathSelector::new(["/definitely/not/a/tty"]);
        assert!(matches!(selector.select().await, Err(TelemetryError::NoPort)));
    }
}

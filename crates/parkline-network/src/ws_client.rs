//! WebSocket 클라이언트.
//!
//! `tokio-tungstenite` 기반 실시간 채널. `ChannelTransport` 포트 구현.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parkline_core::error::CoreError;
use parkline_core::ports::channel::{ChannelMessage, ChannelSender, ChannelTransport, OpenChannel};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::TokenManager;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 수신 버퍼 크기
const INBOUND_BUFFER: usize = 64;

/// WebSocket 클라이언트: `ChannelTransport` 포트 구현
pub struct WsClient {
    ws_url: String,
    token_manager: Arc<TokenManager>,
}

impl WsClient {
    /// 새 WebSocket 클라이언트 생성
    pub fn new(ws_url: &str, token_manager: Arc<TokenManager>) -> Self {
        Self {
            ws_url: ws_url.trim_end_matches('/').to_string(),
            token_manager,
        }
    }

    /// 토큰 쿼리가 붙은 접속 URL
    fn endpoint(&self, token: &str) -> Result<Url, CoreError> {
        let mut url = Url::parse(&self.ws_url)
            .map_err(|e| CoreError::Config(format!("WebSocket URL 오류 '{}': {e}", self.ws_url)))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(CoreError::Config(format!(
                    "WebSocket URL 스킴 오류: {other}"
                )))
            }
        }
        url.query_pairs_mut().append_pair("token", token);
        Ok(url)
    }

    /// 수신 루프
    ///
    /// 스트림이 끝나면 `tx`가 drop되어 수신 측이 연결 종료를 알게 된다.
    async fn read_loop(mut read: SplitStream<WsStream>, tx: mpsc::Sender<ChannelMessage>) {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if tx.send(ChannelMessage::Text(text.to_string())).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(data)) => {
                    if tx.send(ChannelMessage::Binary(data.to_vec())).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(frame)) => {
                    debug!("WebSocket 종료 프레임 수신: {frame:?}");
                    let _ = tx.send(ChannelMessage::Close).await;
                    break;
                }
                Ok(_) => {} // Ping/Pong은 자동 처리
                Err(e) => {
                    warn!("WebSocket 수신 에러: {e}");
                    break;
                }
            }
        }
        debug!("WebSocket 수신 루프 종료");
    }
}

#[async_trait]
impl ChannelTransport for WsClient {
    async fn open(&self) -> Result<OpenChannel, CoreError> {
        let token = self.token_manager.get_token().await?;
        let url = self.endpoint(&token)?;

        info!("WebSocket 연결: {}", self.ws_url);

        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 연결 실패: {e}")))?;

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);

        tokio::spawn(Self::read_loop(read, tx));

        Ok(OpenChannel {
            sender: Arc::new(WsSender {
                write: tokio::sync::Mutex::new(write),
            }),
            inbound: rx,
        })
    }
}

/// WebSocket 송신기
pub struct WsSender {
    write: tokio::sync::Mutex<SplitSink<WsStream, Message>>,
}

#[async_trait]
impl ChannelSender for WsSender {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::text(text))
            .await
            .map_err(|e| CoreError::Channel(format!("WebSocket 전송 실패: {e}")))
    }

    async fn close(&self) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Close(None))
            .await
            .map_err(|e| CoreError::Channel(format!("WebSocket 종료 실패: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parkline_core::config::AuthConfig;

    fn client(url: &str) -> WsClient {
        WsClient::new(url, Arc::new(TokenManager::new(&AuthConfig::default())))
    }

    #[test]
    fn endpoint_appends_token_query() {
        let ws = client("wss://ws.example.com/prod/");
        let url = ws.endpoint("abc.def").unwrap();
        assert_eq!(url.as_str(), "wss://ws.example.com/prod?token=abc.def");
    }

    #[test]
    fn endpoint_rejects_http_scheme() {
        let ws = client("http://ws.example.com");
        assert!(matches!(ws.endpoint("t"), Err(CoreError::Config(_))));
    }

    #[tokio::test]
    async fn open_without_session_fails() {
        let ws = client("ws://127.0.0.1:1");
        let err = ws.open().await.err().unwrap();
        assert!(err.requires_login());
    }
}

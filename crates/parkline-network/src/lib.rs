//! # parkline-network
//!
//! 네트워크 어댑터.
//! REST API(reqwest), 실시간 채널(tokio-tungstenite WebSocket), OAuth 토큰 관리,
//! 실시간 채널의 연결 상태 머신(재연결/하트비트/watchdog)을 담당한다.
//!
//! ## 모듈
//! - `auth`: 인가 코드 교환, id 토큰 클레임 (`IdentityProvider` 구현)
//! - `http_client`: REST 클라이언트 (`ApiClient` 구현)
//! - `ws_client`: WebSocket 전송 (`ChannelTransport` 구현)
//! - `connection`: 연결 관리자

pub mod auth;
pub mod connection;
pub mod http_client;
pub mod ws_client;

//! PARKLINE 도메인 모델.
//!
//! 서버-클라이언트 간 공유하는 데이터 구조체를 정의한다.
//! 서버 와이어 포맷(camelCase)에 맞춰 `serde` Serialize/Deserialize를 구현한다.

pub mod chart;
pub mod frame;
pub mod occupancy;
pub mod reservation;
pub mod session;

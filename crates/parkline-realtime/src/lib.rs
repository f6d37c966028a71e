//! # parkline-realtime
//!
//! 실시간 상태 조정 계층.
//! 실시간 채널에서 받은 프레임을 분류해 점유 현황(안티 플리커 + 이력)과
//! 예약 캐시(겹침 검사 + 재조회 합치기)에 반영하고, 통계 차트 데이터를 준비한다.
//!
//! ## 모듈
//! - `reconciler`: 점유 현황 조정기
//! - `history`: 점유 이력 (최신순, 크기 제한)
//! - `directory`: 예약 디렉토리 + 재조회 대기열
//! - `dispatcher`: 프레임 디스패처
//! - `charts`: 차트 로더

pub mod charts;
pub mod directory;
pub mod dispatcher;
pub mod history;
pub mod reconciler;

#[cfg(test)]
pub(crate) mod testing;

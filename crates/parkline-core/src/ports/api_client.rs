//! REST API 클라이언트 포트.
//!
//! 구현: `parkline-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::chart::{ChartType, HistoricalData};
use crate::models::occupancy::OccupancySnapshot;
use crate::models::reservation::{ConfirmationRequest, CreateReservationRequest, Reservation};

/// 주차 관리 백엔드 REST 클라이언트
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// 현재 사용자의 예약 전체 조회 (`GET /reservations`)
    async fn list_reservations(&self) -> Result<Vec<Reservation>, CoreError>;

    /// 예약 생성 (`POST /reservations`)
    ///
    /// 서버가 발급한 `reservationId`를 포함한 예약을 돌려준다.
    async fn create_reservation(
        &self,
        request: &CreateReservationRequest,
    ) -> Result<Reservation, CoreError>;

    /// 예약 취소 (`DELETE /reservations/{id}`)
    async fn cancel_reservation(&self, reservation_id: &str) -> Result<(), CoreError>;

    /// 예약 확인 메일 요청 (`POST /confirmation`)
    async fn send_confirmation(&self, request: &ConfirmationRequest) -> Result<(), CoreError>;

    /// 통계 조회 (`GET /historical?type=...`)
    async fn fetch_historical(&self, chart_type: ChartType) -> Result<HistoricalData, CoreError>;

    /// 현재 점유 현황 조회 (`GET /status`)
    async fn fetch_status(&self) -> Result<OccupancySnapshot, CoreError>;
}

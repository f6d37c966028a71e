//! 예약 모델.
//!
//! REST로 생성/조회/취소하는 주차 예약과, 제출 전 시간대 검증 규칙.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 최소 예약 시간 (포함)
pub const MIN_RESERVATION_HOURS: i64 = 1;

/// 최대 예약 시간 (미포함)
pub const MAX_RESERVATION_HOURS: i64 = 24;

/// 예약 상태
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    /// 시간대를 점유하는 상태인지 (충돌 검사 대상)
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Confirmed)
    }
}

/// 주차 예약
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// 예약 고유 ID
    pub reservation_id: String,
    /// 사용자 ID (토큰 `sub`)
    #[serde(default)]
    pub user_id: String,
    /// 시작 시각
    pub start_time: DateTime<Utc>,
    /// 종료 시각 (시작 시각 이후)
    pub end_time: DateTime<Utc>,
    /// 예약 상태
    pub status: ReservationStatus,
    /// 배정된 주차면 번호
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_number: Option<u32>,
}

impl Reservation {
    /// 반열린 구간 `[start, end)`와 겹치는지 (맞닿기만 하면 겹치지 않음)
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end_time && end > self.start_time
    }
}

/// 예약 생성 요청 (클라이언트 → 서버)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl CreateReservationRequest {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
        }
    }

    /// 예약 시간대 사전 검증
    ///
    /// 시작 시각은 과거일 수 없고, 종료는 시작 이후, 기간은 1시간 이상 24시간 미만.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if self.start_time < now {
            return Err(CoreError::validation(
                "startTime",
                "시작 시각이 과거입니다",
            ));
        }
        if self.end_time <= self.start_time {
            return Err(CoreError::validation(
                "endTime",
                "종료 시각은 시작 시각 이후여야 합니다",
            ));
        }

        let duration = self.end_time - self.start_time;
        if duration < Duration::hours(MIN_RESERVATION_HOURS) {
            return Err(CoreError::validation(
                "duration",
                format!("최소 {MIN_RESERVATION_HOURS}시간 이상 예약해야 합니다"),
            ));
        }
        if duration >= Duration::hours(MAX_RESERVATION_HOURS) {
            return Err(CoreError::validation(
                "duration",
                format!("{MAX_RESERVATION_HOURS}시간 미만으로 예약해야 합니다"),
            ));
        }
        Ok(())
    }
}

/// 예약 확인 메일 요청
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequest {
    pub reservation_id: String,
    pub user_email: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl ConfirmationRequest {
    pub fn for_reservation(reservation: &Reservation, user_email: &str) -> Self {
        Self {
            reservation_id: reservation.reservation_id.clone(),
            user_email: user_email.to_string(),
            start_time: reservation.start_time,
            end_time: reservation.end_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 20, hour, 0, 0).unwrap()
    }

    fn reservation(start: u32, end: u32) -> Reservation {
        Reservation {
            reservation_id: "r1".to_string(),
            user_id: "u1".to_string(),
            start_time: at(start),
            end_time: at(end),
            status: ReservationStatus::Confirmed,
            spot_number: Some(3),
        }
    }

    #[test]
    fn overlap_is_strict() {
        let existing = reservation(10, 12);
        assert!(existing.overlaps(at(11), at(13)));
        assert!(existing.overlaps(at(9), at(11)));
        assert!(existing.overlaps(at(10), at(12)));
        // 맞닿는 구간은 충돌 아님
        assert!(!existing.overlaps(at(12), at(13)));
        assert!(!existing.overlaps(at(8), at(10)));
    }

    #[test]
    fn validate_accepts_normal_window() {
        let req = CreateReservationRequest::new(at(10), at(12));
        assert!(req.validate(at(9)).is_ok());
    }

    #[test]
    fn validate_rejects_past_start() {
        let req = CreateReservationRequest::new(at(8), at(10));
        let err = req.validate(at(9)).unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "startTime"));
    }

    #[test]
    fn validate_rejects_end_before_start() {
        let req = CreateReservationRequest::new(at(12), at(10));
        let err = req.validate(at(9)).unwrap_err();
        assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "endTime"));
    }

    #[test]
    fn validate_duration_bounds() {
        let now = at(0);
        let short = CreateReservationRequest::new(at(10), at(10) + Duration::minutes(59));
        assert!(short.validate(now).is_err());

        let one_hour = CreateReservationRequest::new(at(10), at(11));
        assert!(one_hour.validate(now).is_ok());

        let just_under_day =
            CreateReservationRequest::new(at(1), at(1) + Duration::hours(24) - Duration::minutes(1));
        assert!(just_under_day.validate(now).is_ok());

        let full_day = CreateReservationRequest::new(at(1), at(1) + Duration::hours(24));
        assert!(full_day.validate(now).is_err());
    }

    #[test]
    fn reservation_wire_format() {
        let json = r#"{
            "reservationId": "res-42",
            "userId": "sub-1",
            "startTime": "2026-10-20T10:00:00Z",
            "endTime": "2026-10-20T12:00:00Z",
            "status": "PENDING"
        }"#;
        let r: Reservation = serde_json::from_str(json).unwrap();
        assert_eq!(r.reservation_id, "res-42");
        assert_eq!(r.status, ReservationStatus::Pending);
        assert!(r.spot_number.is_none());
        assert!(r.status.is_active());
        assert!(!ReservationStatus::Cancelled.is_active());
    }
}

//! 주차장 점유 모델.
//!
//! 서버가 실시간 채널 또는 REST로 내려주는 점유 스냅샷과, 수락된 스냅샷의 이력 항목.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// 주차장 혼잡 상태
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkingStatus {
    /// 여유
    Available,
    /// 혼잡
    Limited,
    /// 만차
    Full,
}

impl std::fmt::Display for ParkingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParkingStatus::Available => write!(f, "AVAILABLE"),
            ParkingStatus::Limited => write!(f, "LIMITED"),
            ParkingStatus::Full => write!(f, "FULL"),
        }
    }
}

/// 점유 스냅샷 (서버 → 클라이언트)
///
/// `last_analysis`가 있으면 이미지 분석에서 나온 스냅샷, 없으면 하트비트성 스냅샷이다.
/// 스냅샷은 제자리에서 수정하지 않고 통째로 교체한다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySnapshot {
    /// 빈 면수
    pub available_spaces: u32,
    /// 점유 면수
    pub occupied_spaces: u32,
    /// 점유율 (0 ~ 100)
    pub occupancy_rate: f64,
    /// 혼잡 상태
    #[serde(default)]
    pub parking_status: Option<ParkingStatus>,
    /// 서버 측 갱신 시각
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// 주차장 식별자
    #[serde(default)]
    pub lot_id: String,
    /// 이미지 분석 마커 (내용은 해석하지 않음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_analysis: Option<serde_json::Value>,
}

/// 점유 관련 필드 묶음: 안티 플리커 규칙이 덮어쓰는 단위
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occupancy {
    pub available_spaces: u32,
    pub occupied_spaces: u32,
    pub occupancy_rate: f64,
}

impl OccupancySnapshot {
    /// 시드용 초기 스냅샷 (모든 면이 빈 상태)
    ///
    /// 이미지 분석과 동등한 것으로 표시되므로 안티 플리커 규칙에 걸리지 않는다.
    pub fn initial(lot_id: &str, total_spaces: u32, now: DateTime<Utc>) -> Self {
        Self {
            available_spaces: total_spaces,
            occupied_spaces: 0,
            occupancy_rate: 0.0,
            parking_status: Some(ParkingStatus::Available),
            last_updated: Some(now),
            lot_id: lot_id.to_string(),
            last_analysis: Some(serde_json::json!({ "source": "initial_load" })),
        }
    }

    /// 이미지 분석에서 나온 스냅샷인지
    pub fn is_image_derived(&self) -> bool {
        self.last_analysis.is_some()
    }

    /// 점유 필드만 추출
    pub fn occupancy(&self) -> Occupancy {
        Occupancy {
            available_spaces: self.available_spaces,
            occupied_spaces: self.occupied_spaces,
            occupancy_rate: self.occupancy_rate,
        }
    }

    /// 점유 필드만 교체한 새 스냅샷
    pub fn with_occupancy(mut self, occupancy: Occupancy) -> Self {
        self.available_spaces = occupancy.available_spaces;
        self.occupied_spaces = occupancy.occupied_spaces;
        self.occupancy_rate = occupancy.occupancy_rate;
        self
    }

    /// 이력 테이블에 넣을 수 있는 구조인지 검사
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.last_updated.is_none() {
            return Err(CoreError::validation("lastUpdated", "타임스탬프 없음"));
        }
        if !self.occupancy_rate.is_finite() || !(0.0..=100.0).contains(&self.occupancy_rate) {
            return Err(CoreError::validation(
                "occupancyRate",
                format!("범위 밖의 점유율: {}", self.occupancy_rate),
            ));
        }
        if self.parking_status.is_none() {
            return Err(CoreError::validation("parkingStatus", "상태 없음"));
        }
        Ok(())
    }
}

/// 이력 항목 (수락된 이미지 분석 스냅샷 1건)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// 스냅샷 시각
    pub timestamp: DateTime<Utc>,
    pub available_spaces: u32,
    pub occupied_spaces: u32,
    pub occupancy_rate: f64,
    pub parking_status: ParkingStatus,
}

impl HistoryEntry {
    /// 검증된 스냅샷에서 이력 항목 생성
    pub fn from_snapshot(snapshot: &OccupancySnapshot) -> Result<Self, CoreError> {
        snapshot.validate()?;
        match (snapshot.last_updated, snapshot.parking_status) {
            (Some(timestamp), Some(parking_status)) => Ok(Self {
                timestamp,
                available_spaces: snapshot.available_spaces,
                occupied_spaces: snapshot.occupied_spaces,
                occupancy_rate: snapshot.occupancy_rate,
                parking_status,
            }),
            _ => Err(CoreError::validation("snapshot", "필수 필드 없음")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_snapshot_json() -> &'static str {
        r#"{
            "availableSpaces": 2,
            "occupiedSpaces": 4,
            "occupancyRate": 66.7,
            "parkingStatus": "LIMITED",
            "lastUpdated": "2026-10-18T09:00:00Z",
            "lotId": "main",
            "lastAnalysis": {"imageKey": "cam1/0900.jpg"}
        }"#
    }

    #[test]
    fn deserialize_image_snapshot() {
        let snap: OccupancySnapshot = serde_json::from_str(image_snapshot_json()).unwrap();
        assert!(snap.is_image_derived());
        assert_eq!(snap.parking_status, Some(ParkingStatus::Limited));
        assert_eq!(snap.available_spaces + snap.occupied_spaces, 6);
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn heartbeat_snapshot_has_no_marker() {
        let json = r#"{"availableSpaces": 6, "occupiedSpaces": 0, "occupancyRate": 0}"#;
        let snap: OccupancySnapshot = serde_json::from_str(json).unwrap();
        assert!(!snap.is_image_derived());
        assert!(snap.lot_id.is_empty());
        // 타임스탬프/상태가 없으면 이력에 넣을 수 없음
        assert!(snap.validate().is_err());
    }

    #[test]
    fn non_numeric_counts_fail_to_parse() {
        let json = r#"{"availableSpaces": "six", "occupiedSpaces": 0, "occupancyRate": 0}"#;
        assert!(serde_json::from_str::<OccupancySnapshot>(json).is_err());
    }

    #[test]
    fn initial_snapshot_is_image_equivalent() {
        let snap = OccupancySnapshot::initial("main", 6, Utc::now());
        assert!(snap.is_image_derived());
        assert_eq!(snap.available_spaces, 6);
        assert_eq!(snap.occupied_spaces, 0);
        assert!(snap.validate().is_ok());
    }

    #[test]
    fn with_occupancy_keeps_other_fields() {
        let snap: OccupancySnapshot = serde_json::from_str(image_snapshot_json()).unwrap();
        let replaced = snap.clone().with_occupancy(Occupancy {
            available_spaces: 1,
            occupied_spaces: 5,
            occupancy_rate: 83.3,
        });
        assert_eq!(replaced.occupied_spaces, 5);
        assert_eq!(replaced.last_updated, snap.last_updated);
        assert_eq!(replaced.lot_id, snap.lot_id);
    }

    #[test]
    fn out_of_range_rate_rejected() {
        let mut snap = OccupancySnapshot::initial("main", 6, Utc::now());
        snap.occupancy_rate = 140.0;
        assert!(HistoryEntry::from_snapshot(&snap).is_err());
        snap.occupancy_rate = f64::NAN;
        assert!(HistoryEntry::from_snapshot(&snap).is_err());
    }
}

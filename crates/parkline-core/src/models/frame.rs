//! 실시간 채널 프레임.
//!
//! 수신 프레임은 `type` 태그로 분류하고, 송신 프레임은 하트비트 하나뿐이다.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::occupancy::OccupancySnapshot;

/// 예약 변경 알림의 동작 종류
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationAction {
    Created,
    Cancelled,
    Updated,
    Other(String),
}

impl ReservationAction {
    /// 서버 문자열 → 동작 (시제/철자 변형 허용)
    pub fn from_wire(action: &str) -> Self {
        match action.to_ascii_lowercase().as_str() {
            "create" | "created" => Self::Created,
            "cancel" | "cancelled" | "canceled" | "delete" | "deleted" => Self::Cancelled,
            "update" | "updated" => Self::Updated,
            other => Self::Other(other.to_string()),
        }
    }

    /// 점유 현황까지 새로 받아야 하는 동작인지
    pub fn affects_occupancy(&self) -> bool {
        matches!(self, Self::Created | Self::Cancelled)
    }
}

/// 예약 변경 알림
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationChange {
    pub action: ReservationAction,
    pub reservation_id: Option<String>,
}

/// 수신 프레임
#[derive(Debug, Clone, PartialEq)]
pub enum LiveFrame {
    /// `status_update`: 점유 스냅샷
    StatusUpdate(OccupancySnapshot),
    /// `reservation_update`: 예약 변경
    ReservationUpdate(ReservationChange),
    /// 알 수 없는 타입 (무시 대상)
    Unknown(String),
}

/// `status_update` 페이로드: `data` 아래 또는 최상위에 평탄하게 온다
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusPayload {
    Nested { data: OccupancySnapshot },
    Flat(OccupancySnapshot),
}

/// `reservation_update`의 `action`, `reservationId` (최상위 또는 `data` 아래)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReservationFields {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    reservation_id: Option<String>,
}

#[derive(Deserialize)]
struct ReservationPayload {
    #[serde(flatten)]
    top: ReservationFields,
    #[serde(default)]
    data: Option<ReservationFields>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedFrame {
    StatusUpdate(StatusPayload),
    ReservationUpdate(ReservationPayload),
}

impl TaggedFrame {
    /// 태그 이름 (모르는 타입과 구분용)
    const KNOWN: [&'static str; 2] = ["status_update", "reservation_update"];
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireFrame {
    Known(TaggedFrame),
    Other {
        #[serde(rename = "type")]
        frame_type: String,
    },
}

impl LiveFrame {
    /// 원문 JSON 파싱
    ///
    /// JSON이 아니거나 필수 필드가 빠진 경우 에러. 모르는 `type`은 `Unknown`으로 돌려준다.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match serde_json::from_str::<WireFrame>(raw)? {
            WireFrame::Known(frame) => Self::from_tagged(frame),
            WireFrame::Other { frame_type } if TaggedFrame::KNOWN.contains(&frame_type.as_str()) => {
                // 아는 타입인데 페이로드가 맞지 않음. 태그 enum으로 다시 읽어 원인을 남긴다
                match serde_json::from_str::<TaggedFrame>(raw) {
                    Err(e) => Err(e.into()),
                    Ok(frame) => Self::from_tagged(frame),
                }
            }
            WireFrame::Other { frame_type } => Ok(Self::Unknown(frame_type)),
        }
    }

    fn from_tagged(frame: TaggedFrame) -> Result<Self, CoreError> {
        match frame {
            TaggedFrame::StatusUpdate(StatusPayload::Nested { data })
            | TaggedFrame::StatusUpdate(StatusPayload::Flat(data)) => Ok(Self::StatusUpdate(data)),
            TaggedFrame::ReservationUpdate(payload) => {
                let data = payload.data.unwrap_or_default();
                let action = payload
                    .top
                    .action
                    .or(data.action)
                    .ok_or_else(|| CoreError::validation("action", "예약 변경 동작 없음"))?;
                Ok(Self::ReservationUpdate(ReservationChange {
                    action: ReservationAction::from_wire(&action),
                    reservation_id: payload.top.reservation_id.or(data.reservation_id),
                }))
            }
        }
    }
}

/// 송신 프레임
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum OutboundFrame {
    /// 연결 유지용 하트비트
    Heartbeat,
}

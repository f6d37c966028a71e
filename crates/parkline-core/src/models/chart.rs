//! 통계 차트 모델.
//!
//! `GET /historical?type=daily|weekly` 응답과 렌더러에 넘기는 `(labels, series)` 쌍.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 차트 종류
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    /// 시간대별 (오늘)
    Daily,
    /// 요일별 (최근 1주)
    Weekly,
}

impl ChartType {
    /// 쿼리 파라미터 값
    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Daily => "daily",
            ChartType::Weekly => "weekly",
        }
    }
}

impl std::str::FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(ChartType::Daily),
            "weekly" => Ok(ChartType::Weekly),
            other => Err(format!("알 수 없는 차트 종류: {other}")),
        }
    }
}

/// 피크/비피크 평균 점유율
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PeakSplit {
    #[serde(default)]
    pub peak: f64,
    #[serde(default)]
    pub off_peak: f64,
}

impl PeakSplit {
    /// 두 막대짜리 차트 입력
    pub fn to_series(&self) -> ChartSeries {
        ChartSeries {
            labels: vec!["peak".to_string(), "offPeak".to_string()],
            series: vec![self.peak, self.off_peak],
        }
    }
}

/// 통계 응답
///
/// daily 요청이면 `hourly`(시 → 점유율), weekly 요청이면 `daily`(요일 → 점유율)가 채워진다.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HistoricalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily: Option<BTreeMap<String, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<PeakSplit>,
}

/// 렌더러 입력: 라벨과 값 배열
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub series: Vec<f64>,
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

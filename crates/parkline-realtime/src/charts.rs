//! 통계 차트 로더.
//!
//! `GET /historical` 응답을 차트 캐시(1시간 TTL)에 두고, 렌더러가 쓰는 `(labels, series)`로 변환한다.

use parkline_core::error::CoreError;
use parkline_core::models::chart::{ChartSeries, ChartType, HistoricalData};
use parkline_core::ports::api_client::ApiClient;
use parkline_core::ports::presenter::StatusPresenter;
use parkline_storage::{keys, KeyValueStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const WEEKDAYS: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];

/// 차트 로더
pub struct ChartLoader {
    api: Arc<dyn ApiClient>,
    store: Arc<KeyValueStore>,
    presenter: Arc<dyn StatusPresenter>,
    cache_ttl: Duration,
}

impl ChartLoader {
    pub fn new(
        api: Arc<dyn ApiClient>,
        store: Arc<KeyValueStore>,
        presenter: Arc<dyn StatusPresenter>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            api,
            store,
            presenter,
            cache_ttl,
        }
    }

    /// 마지막으로 본 차트 종류 (없으면 daily)
    pub fn last_chart_type(&self) -> ChartType {
        self.store
            .get(keys::LAST_CHART_TYPE)
            .unwrap_or(ChartType::Daily)
    }

    /// 차트 데이터 로드 + 렌더링
    ///
    /// 만료되지 않은 캐시가 있으면 서버에 묻지 않는다.
    /// 응답에 피크/비피크 평균이 있으면 따로 렌더링한다.
    pub async fn load(&self, chart_type: ChartType) -> Result<ChartSeries, CoreError> {
        if let Err(e) = self.store.put(keys::LAST_CHART_TYPE, &chart_type) {
            warn!("차트 종류 저장 실패: {e}");
        }

        let cache_key = keys::chart_cache(chart_type);
        let data = match self.store.get::<HistoricalData>(&cache_key) {
            Some(cached) => {
                debug!("차트 캐시 사용: {cache_key}");
                cached
            }
            None => {
                let fetched = self.api.fetch_historical(chart_type).await?;
                if let Err(e) = self
                    .store
                    .put_with_expiry(&cache_key, &fetched, self.cache_ttl)
                {
                    warn!("차트 캐시 저장 실패: {e}");
                }
                fetched
            }
        };

        let series = to_series(chart_type, &data);
        if series.is_empty() {
            warn!("{} 차트 데이터 없음", chart_type.as_str());
        }
        self.presenter.render_chart(chart_type, &series);
        if let Some(peak) = data.peak {
            self.presenter.render_peak_split(chart_type, &peak.to_series());
        }
        Ok(series)
    }
}

/// 통계 응답 → 차트 입력
///
/// daily는 시(0~23) 순서로 `"HH:00"` 라벨, weekly는 월요일부터 요일 순서.
pub fn to_series(chart_type: ChartType, data: &HistoricalData) -> ChartSeries {
    match chart_type {
        ChartType::Daily => data.hourly.as_ref().map(hourly_series).unwrap_or_default(),
        ChartType::Weekly => data.daily.as_ref().map(weekly_series).unwrap_or_default(),
    }
}

fn hourly_series(hourly: &BTreeMap<String, f64>) -> ChartSeries {
    let mut points: Vec<(u32, f64)> = hourly
        .iter()
        .filter_map(|(hour, value)| match hour.trim().parse::<u32>() {
            Ok(h) if h < 24 => Some((h, *value)),
            _ => {
                debug!("시간 키 무시: {hour}");
                None
            }
        })
        .collect();
    points.sort_by_key(|(h, _)| *h);

    ChartSeries {
        labels: points.iter().map(|(h, _)| format!("{h:02}:00")).collect(),
        series: points.iter().map(|(_, v)| *v).collect(),
    }
}

fn weekday_index(key: &str) -> Option<usize> {
    let key = key.trim().to_ascii_lowercase();
    WEEKDAYS.iter().position(|day| key.starts_with(day))
}

fn weekly_series(daily: &BTreeMap<String, f64>) -> ChartSeries {
    // 요일 이름이면 월~일 순서, 아니면(날짜 등) 키 순서 그대로 뒤에 붙인다
    let mut points: Vec<(&String, f64)> = daily.iter().map(|(k, v)| (k, *v)).collect();
    points.sort_by_key(|(key, _)| weekday_index(key).unwrap_or(WEEKDAYS.len()));

    ChartSeries {
        labels: points.iter().map(|(k, _)| (*k).clone()).collect(),
        series: points.iter().map(|(_, v)| *v).collect(),
    }
}

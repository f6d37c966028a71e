//! 렌더링 출력 포트.
//!
//! 코어 컴포넌트는 화면을 직접 만지지 않고 순수 데이터만 넘긴다.

use crate::models::chart::{ChartSeries, ChartType};
use crate::models::occupancy::{HistoryEntry, OccupancySnapshot};
use crate::models::reservation::Reservation;
use crate::models::session::ConnectionState;

/// 상태/이력/차트 렌더러
///
/// 반환값이 없다. 렌더러는 받은 데이터를 그릴 뿐 코어로 아무것도 돌려주지 않는다.
pub trait StatusPresenter: Send + Sync {
    /// 현재 점유 현황
    fn render_status(&self, snapshot: &OccupancySnapshot);

    /// 이력 테이블 (최신순)
    fn render_history(&self, history: &[HistoryEntry]);

    /// 연결 상태 표시
    fn render_connection(&self, state: ConnectionState);

    /// 내 예약 목록
    fn render_reservations(&self, reservations: &[Reservation]);

    /// 통계 차트
    fn render_chart(&self, chart_type: ChartType, series: &ChartSeries);

    /// 피크/비피크 평균 점유율 (라벨 `peak`, `offPeak`)
    fn render_peak_split(&self, chart_type: ChartType, split: &ChartSeries);
}

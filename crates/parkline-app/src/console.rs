//! 콘솔 출력 어댑터.
//!
//! `StatusPresenter`, `Notifier` 포트 구현. 터미널에 한 줄씩 출력한다.

use async_trait::async_trait;
use parking_lot::Mutex;
use parkline_core::error::CoreError;
use parkline_core::models::chart::{ChartSeries, ChartType};
use parkline_core::models::occupancy::{HistoryEntry, OccupancySnapshot};
use parkline_core::models::reservation::Reservation;
use parkline_core::models::session::ConnectionState;
use parkline_core::ports::notifier::Notifier;
use parkline_core::ports::presenter::StatusPresenter;
use std::io::Write;
use tracing::{debug, warn};

/// 차트 막대 최대 길이
const BAR_WIDTH: f64 = 40.0;

/// 이력 테이블에 보여줄 행 수
const HISTORY_ROWS: usize = 10;

/// 콘솔 렌더러
pub struct ConsolePresenter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsolePresenter {
    /// 표준 출력 렌더러
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, lines: &[String]) {
        let mut out = self.out.lock();
        for line in lines {
            if let Err(e) = writeln!(out, "{line}") {
                warn!("콘솔 출력 실패: {e}");
                return;
            }
        }
        let _ = out.flush();
    }
}

pub fn status_line(snapshot: &OccupancySnapshot) -> String {
    let status = snapshot
        .parking_status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".to_string());
    let updated = snapshot
        .last_updated
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    format!(
        "[현황] 빈자리 {} / 점유 {} ({:.1}%) {status} @ {updated}",
        snapshot.available_spaces, snapshot.occupied_spaces, snapshot.occupancy_rate
    )
}

pub fn reservation_line(reservation: &Reservation) -> String {
    let spot = reservation
        .spot_number
        .map(|n| format!(" #{n}"))
        .unwrap_or_default();
    format!(
        "  {} {} ~ {} {:?}{spot}",
        reservation.reservation_id,
        reservation.start_time.format("%Y-%m-%d %H:%M"),
        reservation.end_time.format("%Y-%m-%d %H:%M"),
        reservation.status,
    )
}

fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH).round() as usize;
    "█".repeat(len.max(1))
}

impl StatusPresenter for ConsolePresenter {
    fn render_status(&self, snapshot: &OccupancySnapshot) {
        self.emit(&[status_line(snapshot)]);
    }

    fn render_history(&self, history: &[HistoryEntry]) {
        let mut lines = vec![format!("[이력] 최근 {}건", history.len())];
        lines.extend(history.iter().take(HISTORY_ROWS).map(|entry| {
            format!(
                "  {} 빈자리 {:>3} 점유 {:>3} {:>5.1}% {}",
                entry.timestamp.format("%m-%d %H:%M:%S"),
                entry.available_spaces,
                entry.occupied_spaces,
                entry.occupancy_rate,
                entry.parking_status,
            )
        }));
        self.emit(&lines);
    }

    fn render_connection(&self, state: ConnectionState) {
        self.emit(&[format!("[연결] {state}")]);
    }

    fn render_reservations(&self, reservations: &[Reservation]) {
        if reservations.is_empty() {
            self.emit(&["[예약] 없음".to_string()]);
            return;
        }
        let mut lines = vec![format!("[예약] {}건", reservations.len())];
        lines.extend(reservations.iter().map(reservation_line));
        self.emit(&lines);
    }

    fn render_chart(&self, chart_type: ChartType, series: &ChartSeries) {
        let max = series.series.iter().copied().fold(0.0_f64, f64::max);
        let mut lines = Vec::with_capacity(series.len() + 1);
        lines.push(format!("[차트] {}", chart_type.as_str()));
        lines.extend(
            series
                .labels
                .iter()
                .zip(&series.series)
                .map(|(label, value)| format!("  {label:>9} {value:>5.1} {}", bar(*value, max))),
        );
        self.emit(&lines);
    }

    fn render_peak_split(&self, chart_type: ChartType, split: &ChartSeries) {
        let parts: Vec<String> = split
            .labels
            .iter()
            .zip(&split.series)
            .map(|(label, value)| format!("{label} {value:.1}%"))
            .collect();
        self.emit(&[format!("[피크] {} {}", chart_type.as_str(), parts.join(" / "))]);
    }
}

/// 콘솔 알림
///
/// 알림은 stderr로 내보내 현황 출력과 섞이지 않게 한다.
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), CoreError> {
        debug!("알림: {title}");
        eprintln!("🔔 {title}: {body}");
        Ok(())
    }

    async fn show_error(&self, message: &str) -> Result<(), CoreError> {
        warn!("에러 알림: {message}");
        eprintln!("❌ {message}");
        Ok(())
    }
}

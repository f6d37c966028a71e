//! 테스트용 가짜 포트 구현.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use parkline_core::error::CoreError;
use parkline_core::models::chart::{ChartSeries, ChartType, HistoricalData};
use parkline_core::models::occupancy::{HistoryEntry, OccupancySnapshot, ParkingStatus};
use parkline_core::models::reservation::{
    ConfirmationRequest, CreateReservationRequest, Reservation, ReservationStatus,
};
use parkline_core::models::session::{ConnectionState, UserClaims};
use parkline_core::ports::api_client::ApiClient;
use parkline_core::ports::identity::IdentityProvider;
use parkline_core::ports::notifier::Notifier;
use parkline_core::ports::presenter::StatusPresenter;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn at_hour(hour: i64) -> DateTime<Utc> {
    "2030-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap() + Duration::hours(hour)
}

pub fn reservation(id: &str, start: i64, end: i64, status: ReservationStatus) -> Reservation {
    Reservation {
        reservation_id: id.to_string(),
        user_id: "user-1".to_string(),
        start_time: at_hour(start),
        end_time: at_hour(end),
        status,
        spot_number: None,
    }
}

pub fn image_snapshot(available: u32, occupied: u32) -> OccupancySnapshot {
    let total = (available + occupied).max(1);
    OccupancySnapshot {
        available_spaces: available,
        occupied_spaces: occupied,
        occupancy_rate: f64::from(occupied) * 100.0 / f64::from(total),
        parking_status: Some(ParkingStatus::Limited),
        last_updated: Some(Utc::now()),
        lot_id: "main".to_string(),
        last_analysis: Some(serde_json::json!({ "frame": 1 })),
    }
}

pub fn heartbeat_snapshot(available: u32, occupied: u32) -> OccupancySnapshot {
    OccupancySnapshot {
        last_analysis: None,
        parking_status: Some(ParkingStatus::Available),
        ..image_snapshot(available, occupied)
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub statuses: Mutex<Vec<OccupancySnapshot>>,
    pub histories: Mutex<Vec<Vec<HistoryEntry>>>,
    pub reservations: Mutex<Vec<Vec<Reservation>>>,
    pub charts: Mutex<Vec<(ChartType, ChartSeries)>>,
    pub peaks: Mutex<Vec<(ChartType, ChartSeries)>>,
}

impl StatusPresenter for RecordingPresenter {
    fn render_status(&self, snapshot: &OccupancySnapshot) {
        self.statuses.lock().push(snapshot.clone());
    }

    fn render_history(&self, history: &[HistoryEntry]) {
        self.histories.lock().push(history.to_vec());
    }

    fn render_connection(&self, _state: ConnectionState) {}

    fn render_reservations(&self, reservations: &[Reservation]) {
        self.reservations.lock().push(reservations.to_vec());
    }

    fn render_chart(&self, chart_type: ChartType, series: &ChartSeries) {
        self.charts.lock().push((chart_type, series.clone()));
    }

    fn render_peak_split(&self, chart_type: ChartType, split: &ChartSeries) {
        self.peaks.lock().push((chart_type, split.clone()));
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_notification(&self, title: &str, _body: &str) -> Result<(), CoreError> {
        self.notifications.lock().push(title.to_string());
        Ok(())
    }

    async fn show_error(&self, message: &str) -> Result<(), CoreError> {
        self.errors.lock().push(message.to_string());
        Ok(())
    }
}

pub struct FixedIdentity(pub Option<UserClaims>);

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn current_user(&self) -> Option<UserClaims> {
        self.0.clone()
    }
}

pub fn signed_in() -> FixedIdentity {
    FixedIdentity(Some(UserClaims {
        sub: "user-1".to_string(),
        email: "driver@example.com".to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp(),
    }))
}

/// 응답을 미리 정해두는 API
#[derive(Default)]
pub struct FakeApi {
    pub reservations: Mutex<Option<Vec<Reservation>>>,
    pub created: Mutex<Option<Reservation>>,
    pub cancel_fails: Mutex<bool>,
    pub status: Mutex<Option<OccupancySnapshot>>,
    pub historical: Mutex<Option<HistoricalData>>,
    pub list_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub cancel_calls: AtomicUsize,
    pub historical_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub confirmations: Mutex<Vec<ConfirmationRequest>>,
}

impl FakeApi {
    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn unavailable() -> CoreError {
    CoreError::Network("backend unreachable".to_string())
}

#[async_trait]
impl ApiClient for FakeApi {
    async fn list_reservations(&self) -> Result<Vec<Reservation>, CoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.reservations.lock().clone().ok_or_else(unavailable)
    }

    async fn create_reservation(
        &self,
        _request: &CreateReservationRequest,
    ) -> Result<Reservation, CoreError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.created.lock().clone().ok_or_else(unavailable)
    }

    async fn cancel_reservation(&self, _reservation_id: &str) -> Result<(), CoreError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if *self.cancel_fails.lock() {
            return Err(unavailable());
        }
        Ok(())
    }

    async fn send_confirmation(&self, request: &ConfirmationRequest) -> Result<(), CoreError> {
        self.confirmations.lock().push(request.clone());
        Ok(())
    }

    async fn fetch_historical(&self, _chart_type: ChartType) -> Result<HistoricalData, CoreError> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        self.historical.lock().clone().ok_or_else(unavailable)
    }

    async fn fetch_status(&self) -> Result<OccupancySnapshot, CoreError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.status.lock().clone().ok_or_else(unavailable)
    }
}

//! HTTP REST API 클라이언트.
//!
//! `ApiClient` 포트 구현. Bearer 인증 헤더 자동 주입 + 재시도 로직.

use async_trait::async_trait;
use parkline_core::error::CoreError;
use parkline_core::models::chart::{ChartType, HistoricalData};
use parkline_core::models::occupancy::OccupancySnapshot;
use parkline_core::models::reservation::{
    ConfirmationRequest, CreateReservationRequest, Reservation,
};
use parkline_core::ports::api_client::ApiClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::TokenManager;

/// 기본 재시도 횟수
const DEFAULT_MAX_RETRIES: u32 = 2;

/// Retry-After 헤더가 없을 때 대기 시간 (초)
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 재시도 가능한 에러인지 판별
fn is_retryable(error: &CoreError) -> bool {
    matches!(
        error,
        CoreError::Network(_) | CoreError::ServiceUnavailable(_) | CoreError::RateLimit { .. }
    )
}

/// `GET /reservations` 응답: 배열 또는 `{"reservations": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ReservationList {
    Bare(Vec<Reservation>),
    Wrapped { reservations: Vec<Reservation> },
}

impl ReservationList {
    fn into_vec(self) -> Vec<Reservation> {
        match self {
            ReservationList::Bare(list) => list,
            ReservationList::Wrapped { reservations } => reservations,
        }
    }
}

/// REST API 클라이언트: `ApiClient` 포트 구현
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    token_manager: Arc<TokenManager>,
    max_retries: u32,
}

impl HttpApiClient {
    /// 새 HTTP API 클라이언트 생성
    pub fn new(
        base_url: &str,
        token_manager: Arc<TokenManager>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_manager,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// 재시도 횟수 설정
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Authorization 헤더가 포함된 요청 빌더 반환
    async fn authorized_request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, CoreError> {
        let token = self.token_manager.get_token().await?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        &self,
        resp: reqwest::Response,
        resource: &str,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status.as_u16() {
            401 => Err(CoreError::Auth(format!("인증 실패: {text}"))),
            404 => Err(CoreError::NotFound {
                resource_type: resource.to_string(),
                id: text,
            }),
            409 => Err(CoreError::Conflict(text)),
            429 => Err(CoreError::RateLimit {
                retry_after_secs: retry_after,
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
        }
    }

    /// 재시도가 포함된 요청 실행
    ///
    /// exponential backoff: 1s → 2s → 4s
    async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut last_error = CoreError::Internal("요청 실패".to_string());
        let mut delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable(&e) || attempt == self.max_retries {
                        return Err(e);
                    }

                    // RateLimit의 경우 서버 지정 대기 시간 사용
                    if let CoreError::RateLimit { retry_after_secs } = &e {
                        delay = Duration::from_secs(*retry_after_secs);
                    }

                    warn!(
                        "요청 실패 (시도 {}/{}): {e}, {delay:?} 후 재시도",
                        attempt + 1,
                        self.max_retries + 1
                    );

                    last_error = e;
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(Duration::from_secs(30));
                }
            }
        }

        Err(last_error)
    }

    /// 요청 전송 + 상태 확인
    async fn send(
        &self,
        req: reqwest::RequestBuilder,
        resource: &str,
    ) -> Result<reqwest::Response, CoreError> {
        let resp = req
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("{resource} 요청 실패: {e}")))?;
        self.check_response(resp, resource).await
    }

    async fn parse<T: DeserializeOwned>(
        resp: reqwest::Response,
        resource: &str,
    ) -> Result<T, CoreError> {
        resp.json()
            .await
            .map_err(|e| CoreError::Internal(format!("{resource} 응답 파싱 실패: {e}")))
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn list_reservations(&self) -> Result<Vec<Reservation>, CoreError> {
        self.execute_with_retry(|| async {
            let req = self
                .authorized_request(reqwest::Method::GET, "/reservations")
                .await?;
            let resp = self.send(req, "reservations").await?;
            let list: ReservationList = Self::parse(resp, "reservations").await?;
            let list = list.into_vec();

            debug!("예약 목록 수신: {}건", list.len());
            Ok(list)
        })
        .await
    }

    async fn create_reservation(
        &self,
        request: &CreateReservationRequest,
    ) -> Result<Reservation, CoreError> {
        debug!(
            "예약 생성 요청: {} ~ {}",
            request.start_time, request.end_time
        );

        // 생성은 멱등이 아니므로 재시도하지 않는다
        let req = self
            .authorized_request(reqwest::Method::POST, "/reservations")
            .await?
            .json(request);
        let resp = self.send(req, "reservation").await?;
        let reservation: Reservation = Self::parse(resp, "reservation").await?;

        debug!("예약 생성 성공: {}", reservation.reservation_id);
        Ok(reservation)
    }

    async fn cancel_reservation(&self, reservation_id: &str) -> Result<(), CoreError> {
        debug!("예약 취소 요청: {reservation_id}");

        self.execute_with_retry(|| async {
            let path = format!("/reservations/{reservation_id}");
            let req = self
                .authorized_request(reqwest::Method::DELETE, &path)
                .await?;
            self.send(req, "reservation").await?;
            Ok(())
        })
        .await
    }

    async fn send_confirmation(&self, request: &ConfirmationRequest) -> Result<(), CoreError> {
        debug!("예약 확인 메일 요청: {}", request.reservation_id);

        let req = self
            .authorized_request(reqwest::Method::POST, "/confirmation")
            .await?
            .json(request);
        self.send(req, "confirmation").await?;
        Ok(())
    }

    async fn fetch_historical(&self, chart_type: ChartType) -> Result<HistoricalData, CoreError> {
        self.execute_with_retry(|| async {
            let req = self
                .authorized_request(reqwest::Method::GET, "/historical")
                .await?
                .query(&[("type", chart_type.as_str())]);
            let resp = self.send(req, "historical").await?;
            Self::parse(resp, "historical").await
        })
        .await
    }

    async fn fetch_status(&self) -> Result<OccupancySnapshot, CoreError> {
        self.execute_with_retry(|| async {
            let req = self
                .authorized_request(reqwest::Method::GET, "/status")
                .await?;
            let resp = self.send(req, "status").await?;
            Self::parse(resp, "status").await
        })
        .await
    }
}

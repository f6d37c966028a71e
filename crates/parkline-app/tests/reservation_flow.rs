//! 예약 흐름 통합 테스트.
//!
//! REST 목 서버 + 토큰 관리자 + HTTP 클라이언트 + 예약 디렉토리:
//! 조회 → 겹침 거부 → 생성/확인 메일 → 취소 → 재조회.

mod common;

use chrono::{DateTime, Utc};
use common::{reservation_json, signed_in_tokens, RecordingNotifier, RecordingPresenter};
use mockito::Matcher;
use parkline_core::error::CoreError;
use parkline_core::models::reservation::{CreateReservationRequest, ReservationStatus};
use parkline_network::http_client::HttpApiClient;
use parkline_realtime::directory::ReservationDirectory;
use std::sync::Arc;
use std::time::Duration;

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

#[tokio::test]
async fn create_and_cancel_against_backend() {
    let mut server = mockito::Server::new_async().await;

    let list_mock = server
        .mock("GET", "/reservations")
        .match_header("authorization", "Bearer access-1")
        .with_status(200)
        .with_body(
            serde_json::json!([reservation_json(
                "res_a",
                "2030-05-01T10:00:00Z",
                "2030-05-01T12:00:00Z",
                "CONFIRMED"
            )])
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let create_mock = server
        .mock("POST", "/reservations")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "startTime": "2030-05-01T12:00:00Z",
            "endTime": "2030-05-01T14:00:00Z"
        })))
        .with_status(201)
        .with_body(
            reservation_json("res_b", "2030-05-01T12:00:00Z", "2030-05-01T14:00:00Z", "PENDING")
                .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let confirm_mock = server
        .mock("POST", "/confirmation")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "reservationId": "res_b",
            "userEmail": "driver@example.com"
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let cancel_mock = server
        .mock("DELETE", "/reservations/res_b")
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let tokens = signed_in_tokens(&server.url()).await;
    let api = Arc::new(
        HttpApiClient::new(&server.url(), tokens.clone(), Duration::from_secs(5))
            .unwrap()
            .with_max_retries(0),
    );
    let presenter = Arc::new(RecordingPresenter::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let (directory, mut worker) =
        ReservationDirectory::new(api, tokens, notifier.clone(), presenter.clone(), true);

    // 초기 조회
    let loaded = directory.load_all().await;
    assert_eq!(loaded.len(), 1);

    // [10,12)와 겹치는 [11,13)은 서버에 보내지 않는다
    let overlapping =
        CreateReservationRequest::new(at("2030-05-01T11:00:00Z"), at("2030-05-01T13:00:00Z"));
    let err = directory.create(&overlapping).await.unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    // 맞닿은 [12,14)는 허용
    let adjacent =
        CreateReservationRequest::new(at("2030-05-01T12:00:00Z"), at("2030-05-01T14:00:00Z"));
    let created = directory.create(&adjacent).await.unwrap();
    assert_eq!(created.reservation_id, "res_b");
    assert_eq!(created.status, ReservationStatus::Pending);
    assert_eq!(directory.cached().len(), 2);
    assert!(directory.check_conflict(at("2030-05-01T13:00:00Z"), at("2030-05-01T15:00:00Z")));

    // 취소 → 캐시에서 제거 → 재조회 요청 1건
    directory.cancel("res_b").await.unwrap();
    assert_eq!(directory.cached().len(), 1);
    assert_eq!(worker.process_pending().await, Some(1));
    assert_eq!(worker.process_pending().await, None);

    list_mock.assert_async().await;
    create_mock.assert_async().await;
    confirm_mock.assert_async().await;
    cancel_mock.assert_async().await;

    let notifications = notifier.notifications.lock();
    assert!(notifications.iter().any(|n| n.starts_with("예약 완료")));
    assert!(notifications.iter().any(|n| n.starts_with("예약 취소")));
    let errors = notifier.errors.lock();
    assert_eq!(errors.len(), 1, "겹침 거부만 에러로 표시: {errors:?}");
}

#[tokio::test]
async fn failed_reload_keeps_cache() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/reservations")
        .with_status(200)
        .with_body(
            serde_json::json!({"reservations": [reservation_json(
                "res_a",
                "2030-05-01T10:00:00Z",
                "2030-05-01T12:00:00Z",
                "CONFIRMED"
            )]})
            .to_string(),
        )
        .create_async()
        .await;

    let tokens = signed_in_tokens(&server.url()).await;
    let api = Arc::new(
        HttpApiClient::new(&server.url(), tokens.clone(), Duration::from_secs(5))
            .unwrap()
            .with_max_retries(0),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let (directory, _worker) = ReservationDirectory::new(
        api,
        tokens,
        notifier.clone(),
        Arc::new(RecordingPresenter::default()),
        false,
    );

    assert_eq!(directory.load_all().await.len(), 1);

    ok.remove_async().await;
    let _down = server
        .mock("GET", "/reservations")
        .with_status(500)
        .create_async()
        .await;

    let after_failure = directory.load_all().await;
    assert_eq!(after_failure.len(), 1);
    assert_eq!(after_failure[0].reservation_id, "res_a");
    assert_eq!(notifier.errors.lock().len(), 1);
}

#[tokio::test]
async fn cancel_failure_leaves_cache_untouched() {
    let mut server = mockito::Server::new_async().await;
    let _list = server
        .mock("GET", "/reservations")
        .with_status(200)
        .with_body(
            serde_json::json!([reservation_json(
                "res_a",
                "2030-05-01T10:00:00Z",
                "2030-05-01T12:00:00Z",
                "CONFIRMED"
            )])
            .to_string(),
        )
        .create_async()
        .await;
    let _cancel = server
        .mock("DELETE", "/reservations/res_a")
        .with_status(404)
        .create_async()
        .await;

    let tokens = signed_in_tokens(&server.url()).await;
    let api = Arc::new(
        HttpApiClient::new(&server.url(), tokens.clone(), Duration::from_secs(5))
            .unwrap()
            .with_max_retries(0),
    );
    let notifier = Arc::new(RecordingNotifier::default());
    let (directory, mut worker) = ReservationDirectory::new(
        api,
        tokens,
        notifier.clone(),
        Arc::new(RecordingPresenter::default()),
        false,
    );
    directory.load_all().await;

    let err = directory.cancel("res_a").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
    assert_eq!(directory.cached().len(), 1);
    assert_eq!(worker.process_pending().await, None);
    assert_eq!(notifier.errors.lock().len(), 1);
}

//! # parkline-app
//!
//! PARKLINE 클라이언트 바이너리 진입점.
//! DI 조립, 라이프사이클 관리, 스케줄러 오케스트레이션.

mod app;
mod console;
mod lifecycle;
mod scheduler;
mod session;

use anyhow::Result;
use clap::{Parser, Subcommand};
use chrono::{DateTime, Utc};
use parkline_core::config::AppConfig;
use parkline_core::config_manager::ConfigManager;
use parkline_core::models::chart::ChartType;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{parse_time, App};
use crate::console::{ConsoleNotifier, ConsolePresenter};

/// PARKLINE 주차장 클라이언트
///
/// 실시간 점유 현황, 주차 예약, 통계 차트
#[derive(Parser, Debug)]
#[command(name = "parkline")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info", global = true)]
    log_level: String,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉토리의 config.json)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// API 서버 URL (설정 파일보다 우선)
    #[arg(long, short = 's', global = true)]
    server: Option<String>,

    /// WebSocket 엔드포인트 (설정 파일보다 우선)
    #[arg(long, global = true)]
    ws_url: Option<String>,

    /// SQLite DB 파일 경로
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 실시간 현황 수신 (기본)
    Run,
    /// 인가 코드로 로그인
    Login {
        /// OAuth 인가 코드
        #[arg(long)]
        code: String,
    },
    /// 예약 관리
    #[command(subcommand)]
    Reservations(ReservationCommand),
    /// 통계 차트
    Chart {
        /// daily | weekly (기본: 마지막으로 본 차트)
        #[arg(long = "type", short = 't')]
        chart_type: Option<ChartType>,
    },
    /// 저장된 현황 + 서버 현황
    Status,
}

#[derive(Subcommand, Debug)]
enum ReservationCommand {
    /// 내 예약 목록
    List,
    /// 예약 생성
    Create {
        /// 시작 시각 (예: 2026-03-01T10:00)
        #[arg(long, value_parser = parse_time)]
        start: DateTime<Utc>,
        /// 종료 시각 (생략하면 --hours 사용)
        #[arg(long, value_parser = parse_time, conflicts_with = "hours")]
        end: Option<DateTime<Utc>>,
        /// 예약 시간 (시간 단위)
        #[arg(long, default_value_t = 1)]
        hours: i64,
    },
    /// 예약 취소
    Cancel {
        /// 예약 ID
        reservation_id: String,
    },
}

/// 로그 필터: 워크스페이스 crate 전체에 같은 레벨 적용
fn log_filter(level: &str) -> String {
    [
        "parkline",
        "parkline_app",
        "parkline_core",
        "parkline_storage",
        "parkline_network",
        "parkline_realtime",
    ]
    .iter()
    .map(|target| format!("{target}={level}"))
    .collect::<Vec<_>>()
    .join(",")
}

/// 설정 로드 (파일 + 환경변수), 실패하면 기본 설정
fn load_config(path: Option<PathBuf>) -> AppConfig {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    match manager {
        Ok(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            manager.get()
        }
        Err(e) => {
            warn!("설정 로드 실패, 기본 설정 사용: {e}");
            AppConfig::default_config()
        }
    }
}

/// CLI 인자로 설정 덮어쓰기
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(server) = &args.server {
        config.server.base_url = server.clone();
    }
    if let Some(ws_url) = &args.ws_url {
        config.realtime.ws_url = ws_url.clone();
    }
    if let Some(db) = &args.db {
        config.storage.db_path = Some(db.clone());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter(&args.log_level))),
        )
        .init();

    let mut config = load_config(args.config.clone());
    apply_overrides(&mut config, &args);

    let mut app = App::build(
        config,
        Arc::new(ConsolePresenter::stdout()),
        Arc::new(ConsoleNotifier),
    )
    .await?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => app.run().await,
        Command::Login { code } => app.login(&code).await,
        Command::Reservations(ReservationCommand::List) => app.list_reservations().await,
        Command::Reservations(ReservationCommand::Create { start, end, hours }) => {
            app.create_reservation(start, end, hours).await
        }
        Command::Reservations(ReservationCommand::Cancel { reservation_id }) => {
            app.cancel_reservation(&reservation_id).await
        }
        Command::Chart { chart_type } => app.chart(chart_type).await,
        Command::Status => app.status().await,
    }
}

//! OAuth 인증 토큰 관리.
//!
//! 인가 코드 교환, 토큰 갱신, id 토큰 클레임 디코딩을 담당한다.
//! `IdentityProvider` 포트 구현.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use parkline_core::config::AuthConfig;
use parkline_core::error::CoreError;
use parkline_core::models::session::{TokenSet, UserClaims};
use parkline_core::ports::identity::IdentityProvider;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 토큰 엔드포인트 응답
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// refresh 응답에는 없을 수 있음
    id_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

/// 내부 토큰 상태
#[derive(Debug, Clone)]
struct TokenState {
    tokens: TokenSet,
    expires_at: DateTime<Utc>,
}

fn no_session() -> CoreError {
    CoreError::Auth("로그인 필요".to_string())
}

/// id 토큰(JWT)의 페이로드에서 클레임 추출
///
/// 서명은 검증하지 않는다. 백엔드가 access 토큰을 검증한다.
pub fn decode_claims(id_token: &str) -> Result<UserClaims, CoreError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| CoreError::Auth("id 토큰 형식 오류".to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| CoreError::Auth(format!("id 토큰 디코딩 실패: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| CoreError::Auth(format!("id 토큰 클레임 파싱 실패: {e}")))
}

/// 토큰 매니저: 인가 코드 교환/갱신/만료 관리
#[derive(Clone)]
pub struct TokenManager {
    auth_url: String,
    client_id: String,
    redirect_uri: String,
    client: reqwest::Client,
    state: Arc<RwLock<Option<TokenState>>>,
}

impl TokenManager {
    /// 새 토큰 매니저 생성
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            auth_url: config.auth_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            client: reqwest::Client::new(),
            state: Arc::new(RwLock::new(None)),
        }
    }

    /// 인가 코드 → 토큰 교환
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, CoreError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let token_resp = self.request_token(&params, "인가 코드 교환").await?;
        let id_token = token_resp
            .id_token
            .ok_or_else(|| CoreError::Auth("응답에 id_token 없음".to_string()))?;

        let expires_at = Utc::now() + Duration::seconds(token_resp.expires_in.unwrap_or(3600));
        let tokens = TokenSet {
            access_token: token_resp.access_token,
            id_token,
            refresh_token: token_resp.refresh_token,
            expires_at: Some(expires_at),
        };

        *self.state.write().await = Some(TokenState {
            tokens: tokens.clone(),
            expires_at,
        });

        info!("로그인 성공, 토큰 만료: {expires_at}");
        Ok(tokens)
    }

    /// 토큰 갱신 (refresh_token 사용)
    pub async fn refresh(&self) -> Result<TokenSet, CoreError> {
        let current = self
            .state
            .read()
            .await
            .clone()
            .ok_or_else(|| CoreError::Auth("인증되지 않음".to_string()))?;
        let refresh_token = current
            .tokens
            .refresh_token
            .clone()
            .ok_or_else(|| CoreError::Auth("리프레시 토큰 없음".to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
        ];
        let token_resp = self.request_token(&params, "토큰 갱신").await?;

        let expires_at = Utc::now() + Duration::seconds(token_resp.expires_in.unwrap_or(3600));
        // 갱신 응답에 id_token이 없으면 기존 것을 유지한다. 만료는 세션 상태가 판단한다.
        let tokens = TokenSet {
            access_token: token_resp.access_token,
            id_token: token_resp.id_token.unwrap_or(current.tokens.id_token),
            refresh_token: token_resp.refresh_token.or(Some(refresh_token)),
            expires_at: Some(expires_at),
        };

        *self.state.write().await = Some(TokenState {
            tokens: tokens.clone(),
            expires_at,
        });

        debug!("토큰 갱신 성공, 새 만료: {expires_at}");
        Ok(tokens)
    }

    async fn request_token(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<TokenResponse, CoreError> {
        let url = format!("{}/oauth2/token", self.auth_url);

        let resp = self
            .client
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(|e| CoreError::Auth(format!("{what} 요청 실패: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(CoreError::Auth(format!("{what} 실패 ({status}): {text}")));
        }

        resp.json()
            .await
            .map_err(|e| CoreError::Auth(format!("토큰 파싱 실패: {e}")))
    }

    /// 저장해 둔 토큰 묶음으로 세션 복원
    ///
    /// 만료 시각은 저장된 값을 쓰고, 없으면 id 토큰의 `exp`에서 가져온다.
    pub async fn restore(&self, tokens: TokenSet) -> Result<(), CoreError> {
        let claims = decode_claims(&tokens.id_token)?;
        let expires_at = match tokens.expires_at {
            Some(expires_at) => expires_at,
            None => claims
                .expires_at()
                .ok_or_else(|| CoreError::Auth("id 토큰 만료 시각 오류".to_string()))?,
        };

        *self.state.write().await = Some(TokenState { tokens, expires_at });
        debug!("저장된 세션 복원: sub={}, 만료={expires_at}", claims.sub);
        Ok(())
    }

    /// 현재 토큰 묶음 (영속화용)
    pub async fn token_set(&self) -> Option<TokenSet> {
        self.state.read().await.as_ref().map(|s| s.tokens.clone())
    }

    /// 유효한 액세스 토큰 반환 (만료 시 refresh 시도)
    pub async fn get_token(&self) -> Result<String, CoreError> {
        let expired = match &*self.state.read().await {
            Some(s) => Utc::now() >= s.expires_at,
            None => return Err(no_session()),
        };

        if expired {
            if let Err(e) = self.refresh().await {
                warn!("자동 토큰 갱신 실패: {e}");
                return Err(no_session());
            }
        }

        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.tokens.access_token.clone())
            .ok_or_else(no_session)
    }

    /// 세션 폐기
    pub async fn clear(&self) {
        *self.state.write().await = None;
        debug!("세션 폐기");
    }

    /// 현재 인증 상태 확인
    pub async fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .await
            .as_ref()
            .is_some_and(|s| Utc::now() < s.expires_at)
    }
}

#[async_trait]
impl IdentityProvider for TokenManager {
    async fn current_user(&self) -> Option<UserClaims> {
        let (id_token, expires_at) = {
            let state = self.state.read().await;
            let state = state.as_ref()?;
            (state.tokens.id_token.clone(), state.expires_at)
        };

        if Utc::now() >= expires_at {
            debug!("세션 만료, 사용자 없음");
            return None;
        }
        match decode_claims(&id_token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!("{e}");
                None
            }
        }
    }
}

//! 인증 세션 포트.
//!
//! 구현: `parkline-network::auth::TokenManager`

use async_trait::async_trait;

use crate::models::session::UserClaims;

/// 현재 로그인 사용자 조회
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 유효한 세션의 사용자 클레임
    ///
    /// 토큰이 없거나 만료되었으면 `None`: 호출자는 "세션 없음"으로 취급한다.
    async fn current_user(&self) -> Option<UserClaims>;
}

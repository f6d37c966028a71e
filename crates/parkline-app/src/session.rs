//! 로그인 세션 영속화.
//!
//! 토큰 묶음은 `AUTH_TOKENS` 키로 저장소에 두고, 시작할 때 토큰 관리자에 복원한다.

use anyhow::{bail, Result};
use parkline_core::models::session::TokenSet;
use parkline_network::auth::TokenManager;
use parkline_storage::{keys, KeyValueStore};
use tracing::{debug, info, warn};

/// 재로그인 안내 문구
pub const LOGIN_HINT: &str = "로그인이 필요합니다: parkline login --code <인가 코드>";

/// 저장된 토큰 복원
///
/// 읽을 수 없는 토큰은 지운다. 복원되었으면 `true`.
pub async fn restore(store: &KeyValueStore, tokens: &TokenManager) -> bool {
    let Some(saved) = store.get::<TokenSet>(keys::AUTH_TOKENS) else {
        debug!("저장된 세션 없음");
        return false;
    };

    match tokens.restore(saved).await {
        Ok(()) => true,
        Err(e) => {
            warn!("저장된 세션 복원 실패: {e}");
            forget(store);
            false
        }
    }
}

/// 현재 토큰 묶음 저장 (갱신된 토큰 포함)
pub async fn persist(store: &KeyValueStore, tokens: &TokenManager) {
    let Some(current) = tokens.token_set().await else {
        return;
    };
    if let Err(e) = store.put(keys::AUTH_TOKENS, &current) {
        warn!("세션 저장 실패: {e}");
    }
}

/// 저장된 세션 삭제
pub fn forget(store: &KeyValueStore) {
    if let Err(e) = store.remove(keys::AUTH_TOKENS) {
        warn!("세션 삭제 실패: {e}");
    }
}

/// 인가 코드로 로그인하고 세션 저장
pub async fn login(store: &KeyValueStore, tokens: &TokenManager, code: &str) -> Result<()> {
    tokens.exchange_code(code).await?;
    persist(store, tokens).await;
    info!("로그인 완료");
    Ok(())
}

/// 유효한 세션 확보
///
/// 만료된 토큰은 갱신을 시도하고, 갱신되면 다시 저장한다.
/// 세션이 없으면 재로그인 안내와 함께 실패한다.
pub async fn require(store: &KeyValueStore, tokens: &TokenManager) -> Result<()> {
    let was_valid = tokens.is_authenticated().await;
    if let Err(e) = tokens.get_token().await {
        debug!("세션 확인 실패: {e}");
        bail!(LOGIN_HINT);
    }
    if !was_valid {
        persist(store, tokens).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use parkline_core::config::AuthConfig;

    fn token_set(exp: i64) -> TokenSet {
        let payload = URL_SAFE_NO_PAD
            .encode(serde_json::json!({"sub": "user-1", "email": "a@b.c", "exp": exp}).to_string());
        TokenSet {
            access_token: "access-1".to_string(),
            id_token: format!("e30.{payload}.sig"),
            refresh_token: None,
            expires_at: None,
        }
    }

    #[test]
    fn nothing_saved_nothing_restored() {
        let store = KeyValueStore::open_in_memory().unwrap();
        let tokens = TokenManager::new(&AuthConfig::default());
        assert!(!tokio_test::block_on(restore(&store, &tokens)));
    }

    #[test]
    fn unreadable_tokens_are_dropped() {
        let store = KeyValueStore::open_in_memory().unwrap();
        let mut broken = token_set(0);
        broken.id_token = "garbage".to_string();
        store.put(keys::AUTH_TOKENS, &broken).unwrap();

        let tokens = TokenManager::new(&AuthConfig::default());
        assert!(!tokio_test::block_on(restore(&store, &tokens)));
        assert!(store.get::<TokenSet>(keys::AUTH_TOKENS).is_none());
    }

    #[test]
    fn require_without_session_points_to_login() {
        let store = KeyValueStore::open_in_memory().unwrap();
        let tokens = TokenManager::new(&AuthConfig::default());
        let err = tokio_test::block_on(require(&store, &tokens)).unwrap_err();
        assert!(err.to_string().contains("parkline login"));
    }

    #[tokio::test]
    async fn restored_session_is_persisted_back() {
        let store = KeyValueStore::open_in_memory().unwrap();
        let saved = token_set(chrono::Utc::now().timestamp() + 600);
        store.put(keys::AUTH_TOKENS, &saved).unwrap();

        let tokens = TokenManager::new(&AuthConfig::default());
        assert!(restore(&store, &tokens).await);
        require(&store, &tokens).await.unwrap();

        forget(&store);
        persist(&store, &tokens).await;
        assert_eq!(store.read::<TokenSet>(keys::AUTH_TOKENS).unwrap(), saved);
    }
}

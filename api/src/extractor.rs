use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use kernel::model::{id::UserId, role::Role};
use registry::AppRegistry;
use shared::error::AppError;

/// ゲートウェイが操作ユーザーの ID を渡してくるヘッダ。
const ACTING_USER_HEADER: &str = "x-acting-user";

/// 操作ユーザー。ヘッダが無ければ 401 を返す。
pub struct AuthorizedUser {
    pub user_id: UserId,
    pub role: Role,
}

impl AuthorizedUser {
    pub fn id(&self) -> UserId {
        self.user_id.clone()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[async_trait]
impl FromRequestParts<AppRegistry> for AuthorizedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        registry: &AppRegistry,
    ) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(ACTING_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(AppError::UnauthenticatedError)?;
        let role = if user_id == registry.config().reservation.admin_user_id {
            Role::Admin
        } else {
            Role::User
        };
        Ok(Self {
            user_id: UserId::new(user_id),
            role,
        })
    }
}

use crate::error::{AppError, AppResult};
use crate::external::FirebaseService;
use crate::models::*;
use crate::utils::{JwtService, normalize_phone, validate_phone};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    jwt_service: JwtService,
    firebase_service: FirebaseService,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt_service: JwtService, firebase_service: FirebaseService) -> Self {
        Self {
            pool,
            jwt_service,
            firebase_service,
        }
    }

    /// 按手机号查询是否已注册 (注册流程的前置检查)
    pub async fn check_user(&self, phone: &str) -> AppResult<CheckUserResponse> {
        let phone = normalize_phone(phone);
        validate_phone(&phone)?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, firebase_uid, phone_number, name, is_admin, created_at, updated_at FROM users WHERE phone_number = $1",
        )
        .bind(&phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match user {
            Some(user) => CheckUserResponse {
                exists: true,
                uid: Some(user.firebase_uid),
                name: user.name,
            },
            None => CheckUserResponse {
                exists: false,
                uid: None,
                name: None,
            },
        })
    }

    /// 校验身份提供方 token 并注册 (重复注册时仅更新资料字段,
    /// 身份字段 firebase_uid / phone_number 一经建立不再变更)
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }

        let identity = self.firebase_service.verify_id_token(&request.id_token).await?;

        let phone = identity.phone_number.ok_or_else(|| {
            AppError::ValidationError(
                "Identity has no phone number, phone sign-in is required".to_string(),
            )
        })?;
        let phone = normalize_phone(&phone);
        validate_phone(&phone)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (firebase_uid, phone_number, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (firebase_uid) DO UPDATE
                SET name = EXCLUDED.name, updated_at = now()
            RETURNING id, firebase_uid, phone_number, name, is_admin, created_at, updated_at
            "#,
        )
        .bind(&identity.uid)
        .bind(&phone)
        .bind(request.name.trim())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = AppError::from(e);
            if err.is_unique_violation() {
                // 手机号已被其他身份占用
                AppError::Conflict("Phone number already registered".to_string())
            } else {
                err
            }
        })?;

        self.auth_response(user)
    }

    /// 校验身份提供方 token 并登录已注册用户
    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let identity = self.firebase_service.verify_id_token(&request.id_token).await?;

        let user = sqlx::query_as::<_, User>(
            "SELECT id, firebase_uid, phone_number, name, is_admin, created_at, updated_at FROM users WHERE firebase_uid = $1",
        )
        .bind(&identity.uid)
        .fetch_optional(&self.pool)
        .await?;

        let user = user.ok_or_else(|| AppError::NotFound("User not registered".to_string()))?;

        self.auth_response(user)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user = self.get_user_by_id(claims.user_id()?).await?;

        let access_token = self.jwt_service.generate_access_token(
            user.id,
            &user.phone_number,
            user.is_admin,
        )?;

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in: self.jwt_service.get_access_token_expires_in(),
        })
    }

    pub async fn get_profile(&self, user_id: Uuid) -> AppResult<UserResponse> {
        let user = self.get_user_by_id(user_id).await?;
        Ok(UserResponse::from(user))
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, firebase_uid, phone_number, name, is_admin, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    fn auth_response(&self, user: User) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(
            user.id,
            &user.phone_number,
            user.is_admin,
        )?;
        let refresh_token = self.jwt_service.generate_refresh_token(
            user.id,
            &user.phone_number,
            user.is_admin,
        )?;
        let expires_in = self.jwt_service.get_access_token_expires_in();

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in,
        })
    }
}

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::code_generator::{MAX_CODE_ATTEMPTS, generate_unique_code};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COUPON_COLUMNS: &str = r#"
    uc.id, uc.code, uc.is_redeemed, uc.redeemed_at, uc.created_at,
    uc.coupon_template_id,
    ct.title, ct.description, ct.discount, ct.image_url,
    ct.valid_from, ct.valid_until, ct.terms,
    e.id AS event_id, e.name AS event_name
"#;

#[derive(Clone)]
pub struct CouponService {
    pool: PgPool,
}

impl CouponService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 绑定成功后为该票发放个人优惠券: 活动下每个模板一张
    /// (event_id 为空的模板视为跨活动通用, 一并发放)。
    ///
    /// 按模板逐个尽力而为: 码空间耗尽、唯一约束竞争失败或单条写入出错
    /// 只跳过该模板, 不中断批次。返回实际创建的张数, 中途出错也如实
    /// 计入已成功的部分。已存在 (ticket, template) 对应券的模板直接跳过,
    /// 因此整个操作可以安全重跑补发。
    pub async fn issue_for_ticket(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<i64> {
        let templates = sqlx::query_as::<_, CouponTemplate>(
            r#"
            SELECT id, event_id, title, description, discount, image_url,
                   valid_from, valid_until, terms, created_at
            FROM coupon_templates
            WHERE event_id = $1 OR event_id IS NULL
            ORDER BY created_at
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let mut issued = 0i64;

        for template in templates {
            let already_issued: Option<Uuid> = sqlx::query_scalar(
                "SELECT id FROM user_coupons WHERE ticket_id = $1 AND coupon_template_id = $2",
            )
            .bind(ticket_id)
            .bind(template.id)
            .fetch_optional(&self.pool)
            .await?;

            if already_issued.is_some() {
                continue;
            }

            let pool = self.pool.clone();
            let code = generate_unique_code(move |candidate: String| {
                let pool = pool.clone();
                async move {
                    let exists: Option<i32> =
                        sqlx::query_scalar("SELECT 1 FROM user_coupons WHERE code = $1")
                            .bind(&candidate)
                            .fetch_optional(&pool)
                            .await?;
                    Ok(exists.is_some())
                }
            })
            .await?;

            let Some(code) = code else {
                log::warn!(
                    "Coupon code generation exhausted after {} attempts, skipping template {}",
                    MAX_CODE_ATTEMPTS,
                    template.id
                );
                continue;
            };

            let insert = sqlx::query(
                r#"
                INSERT INTO user_coupons (user_id, ticket_id, coupon_template_id, code)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(user_id)
            .bind(ticket_id)
            .bind(template.id)
            .bind(&code)
            .execute(&self.pool)
            .await;

            match insert {
                Ok(_) => issued += 1,
                Err(e) => {
                    let err = AppError::from(e);
                    if err.is_unique_violation() {
                        // 另一个写者抢先占用了该码或该 (ticket, template) 槽位
                        log::warn!(
                            "Lost uniqueness race while issuing template {}, skipping",
                            template.id
                        );
                    } else {
                        log::error!(
                            "Failed to issue coupon for template {}: {:?}",
                            template.id,
                            err
                        );
                    }
                }
            }
        }

        Ok(issued)
    }

    /// 核销个人优惠券, UNREDEEMED → REDEEMED 只允许发生一次
    pub async fn redeem(&self, user_id: Uuid, coupon_id: Uuid) -> AppResult<UserCouponResponse> {
        let coupon: Option<(Uuid, bool)> =
            sqlx::query_as("SELECT user_id, is_redeemed FROM user_coupons WHERE id = $1")
                .bind(coupon_id)
                .fetch_optional(&self.pool)
                .await?;

        let (owner_id, is_redeemed) =
            coupon.ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;

        if owner_id != user_id {
            return Err(AppError::Forbidden(
                "You do not have access to this coupon".to_string(),
            ));
        }

        if is_redeemed {
            return Err(AppError::Conflict("Coupon already redeemed".to_string()));
        }

        // 条件更新是单次核销的最终仲裁: 并发核销的败者改不了任何行
        let result = sqlx::query(
            "UPDATE user_coupons SET is_redeemed = TRUE, redeemed_at = now() WHERE id = $1 AND is_redeemed = FALSE",
        )
        .bind(coupon_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Coupon already redeemed".to_string()));
        }

        self.get_user_coupon(user_id, coupon_id).await
    }

    pub async fn get_user_coupons(&self, user_id: Uuid) -> AppResult<Vec<UserCouponResponse>> {
        let query = format!(
            r#"
            SELECT {USER_COUPON_COLUMNS}
            FROM user_coupons uc
            JOIN coupon_templates ct ON ct.id = uc.coupon_template_id
            JOIN tickets t ON t.id = uc.ticket_id
            JOIN events e ON e.id = t.event_id
            WHERE uc.user_id = $1
            ORDER BY uc.created_at DESC
            "#
        );

        let coupons = sqlx::query_as::<_, UserCouponResponse>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(coupons)
    }

    pub async fn get_user_coupon(
        &self,
        user_id: Uuid,
        coupon_id: Uuid,
    ) -> AppResult<UserCouponResponse> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT user_id FROM user_coupons WHERE id = $1")
                .bind(coupon_id)
                .fetch_optional(&self.pool)
                .await?;

        let owner = owner.ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))?;
        if owner != user_id {
            return Err(AppError::Forbidden(
                "You do not have access to this coupon".to_string(),
            ));
        }

        let query = format!(
            r#"
            SELECT {USER_COUPON_COLUMNS}
            FROM user_coupons uc
            JOIN coupon_templates ct ON ct.id = uc.coupon_template_id
            JOIN tickets t ON t.id = uc.ticket_id
            JOIN events e ON e.id = t.event_id
            WHERE uc.id = $1
            "#
        );

        let coupon = sqlx::query_as::<_, UserCouponResponse>(&query)
            .bind(coupon_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(coupon)
    }

    /// 钱包卡片 JSON, 仅券主可取
    pub async fn wallet_pass(&self, user_id: Uuid, coupon_id: Uuid) -> AppResult<WalletPass> {
        let coupon = self.get_user_coupon(user_id, coupon_id).await?;
        Ok(WalletPass::from_coupon(&coupon))
    }

    // ---- 管理端模板 CRUD ----

    pub async fn create_template(
        &self,
        event_id: Uuid,
        request: CreateCouponTemplateRequest,
    ) -> AppResult<CouponTemplate> {
        if request.title.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Coupon title is required".to_string(),
            ));
        }

        let event_exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;
        if event_exists.is_none() {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        let template = sqlx::query_as::<_, CouponTemplate>(
            r#"
            INSERT INTO coupon_templates
                (event_id, title, description, discount, image_url, valid_from, valid_until, terms)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, event_id, title, description, discount, image_url,
                      valid_from, valid_until, terms, created_at
            "#,
        )
        .bind(event_id)
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(request.discount)
        .bind(&request.image_url)
        .bind(request.valid_from)
        .bind(request.valid_until)
        .bind(&request.terms)
        .fetch_one(&self.pool)
        .await?;

        Ok(template)
    }

    pub async fn get_event_templates(&self, event_id: Uuid) -> AppResult<Vec<CouponTemplate>> {
        let templates = sqlx::query_as::<_, CouponTemplate>(
            r#"
            SELECT id, event_id, title, description, discount, image_url,
                   valid_from, valid_until, terms, created_at
            FROM coupon_templates
            WHERE event_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    pub async fn update_template(
        &self,
        template_id: Uuid,
        request: UpdateCouponTemplateRequest,
    ) -> AppResult<CouponTemplate> {
        let template = sqlx::query_as::<_, CouponTemplate>(
            r#"
            UPDATE coupon_templates
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                discount = COALESCE($4, discount),
                image_url = COALESCE($5, image_url),
                valid_from = COALESCE($6, valid_from),
                valid_until = COALESCE($7, valid_until),
                terms = COALESCE($8, terms)
            WHERE id = $1
            RETURNING id, event_id, title, description, discount, image_url,
                      valid_from, valid_until, terms, created_at
            "#,
        )
        .bind(template_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.discount)
        .bind(&request.image_url)
        .bind(request.valid_from)
        .bind(request.valid_until)
        .bind(&request.terms)
        .fetch_optional(&self.pool)
        .await?;

        template.ok_or_else(|| AppError::NotFound("Coupon not found".to_string()))
    }

    pub async fn delete_template(&self, template_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM coupon_templates WHERE id = $1")
            .bind(template_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Coupon not found".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;
    use crate::utils::code_generator::{CODE_ALPHABET, CODE_LENGTH};

    #[sqlx::test]
    async fn issue_for_ticket_creates_one_coupon_per_template(pool: PgPool) {
        let user_id = fixtures::create_user(&pool, "+8613800000001").await;
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        let ticket_id = fixtures::create_ticket(&pool, event_id, "FEST000001").await;
        fixtures::create_template(&pool, Some(event_id), "饮品券").await;
        fixtures::create_template(&pool, Some(event_id), "餐饮券").await;
        fixtures::create_template(&pool, None, "通用折扣").await;

        let service = CouponService::new(pool.clone());

        let issued = service
            .issue_for_ticket(user_id, ticket_id, event_id)
            .await
            .unwrap();
        assert_eq!(issued, 3);

        let codes: Vec<String> =
            sqlx::query_scalar("SELECT code FROM user_coupons WHERE ticket_id = $1")
                .bind(ticket_id)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(codes.len(), 3);
        for code in &codes {
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }

        // 重跑不会重复发券
        let issued = service
            .issue_for_ticket(user_id, ticket_id, event_id)
            .await
            .unwrap();
        assert_eq!(issued, 0);
        assert_eq!(fixtures::coupon_count(&pool, ticket_id).await, 3);
    }

    #[sqlx::test]
    async fn issue_for_ticket_reports_count_despite_row_failures(pool: PgPool) {
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        let ticket_id = fixtures::create_ticket(&pool, event_id, "FEST000001").await;
        fixtures::create_template(&pool, Some(event_id), "饮品券").await;
        fixtures::create_template(&pool, Some(event_id), "餐饮券").await;

        // 外键不存在的用户: 每条写入都失败, 但批次不报错, 张数如实为 0
        let issued = CouponService::new(pool.clone())
            .issue_for_ticket(Uuid::new_v4(), ticket_id, event_id)
            .await
            .unwrap();
        assert_eq!(issued, 0);
        assert_eq!(fixtures::coupon_count(&pool, ticket_id).await, 0);
    }

    #[sqlx::test]
    async fn redeem_is_single_use(pool: PgPool) {
        let user_id = fixtures::create_user(&pool, "+8613800000001").await;
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        let ticket_id = fixtures::create_ticket(&pool, event_id, "FEST000001").await;
        fixtures::create_template(&pool, Some(event_id), "饮品券").await;

        let service = CouponService::new(pool.clone());
        service
            .issue_for_ticket(user_id, ticket_id, event_id)
            .await
            .unwrap();

        let coupon_id: Uuid =
            sqlx::query_scalar("SELECT id FROM user_coupons WHERE ticket_id = $1")
                .bind(ticket_id)
                .fetch_one(&pool)
                .await
                .unwrap();

        let redeemed = service.redeem(user_id, coupon_id).await.unwrap();
        assert!(redeemed.is_redeemed);
        assert!(redeemed.redeemed_at.is_some());

        // 第二次核销被拒绝, 状态不回退
        let err = service.redeem(user_id, coupon_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[sqlx::test]
    async fn redeem_requires_ownership(pool: PgPool) {
        let owner_id = fixtures::create_user(&pool, "+8613800000001").await;
        let other_id = fixtures::create_user(&pool, "+8613800000002").await;
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        let ticket_id = fixtures::create_ticket(&pool, event_id, "FEST000001").await;
        fixtures::create_template(&pool, Some(event_id), "饮品券").await;

        let service = CouponService::new(pool.clone());
        service
            .issue_for_ticket(owner_id, ticket_id, event_id)
            .await
            .unwrap();

        let coupon_id: Uuid =
            sqlx::query_scalar("SELECT id FROM user_coupons WHERE ticket_id = $1")
                .bind(ticket_id)
                .fetch_one(&pool)
                .await
                .unwrap();

        let err = service.redeem(other_id, coupon_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}

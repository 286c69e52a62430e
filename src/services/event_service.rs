use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct EventService {
    pool: PgPool,
}

impl EventService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 公开活动列表, 按创建时间倒序, 附带票量统计与模板
    pub async fn get_public_events(&self) -> AppResult<Vec<PublicEventResponse>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, name, description, created_at, updated_at FROM events ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut responses = Vec::with_capacity(events.len());
        for event in events {
            responses.push(self.with_stats(event).await?);
        }

        Ok(responses)
    }

    pub async fn get_public_event(&self, event_id: Uuid) -> AppResult<PublicEventResponse> {
        let event = self.get_event(event_id).await?;
        self.with_stats(event).await
    }

    /// 需要持票才能查看的活动详情
    pub async fn get_event_details(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<PublicEventResponse> {
        let has_ticket: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM user_tickets ut
            JOIN tickets t ON t.id = ut.ticket_id
            WHERE ut.user_id = $1 AND t.event_id = $2
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        if has_ticket == 0 {
            return Err(AppError::Forbidden(
                "You do not have access to this event".to_string(),
            ));
        }

        self.get_public_event(event_id).await
    }

    /// 用户持票的活动, 按活动去重并统计持票数
    pub async fn get_user_events(&self, user_id: Uuid) -> AppResult<Vec<UserEventResponse>> {
        let rows = sqlx::query_as::<_, (Uuid, String, Option<String>, chrono::DateTime<chrono::Utc>, i64)>(
            r#"
            SELECT e.id, e.name, e.description, e.created_at, COUNT(ut.id)
            FROM user_tickets ut
            JOIN tickets t ON t.id = ut.ticket_id
            JOIN events e ON e.id = t.event_id
            WHERE ut.user_id = $1
            GROUP BY e.id, e.name, e.description, e.created_at
            ORDER BY e.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut responses = Vec::with_capacity(rows.len());
        for (id, name, description, created_at, ticket_count) in rows {
            let coupons = self.event_templates(id).await?;
            responses.push(UserEventResponse {
                id,
                name,
                description,
                created_at,
                ticket_count,
                coupons,
            });
        }

        Ok(responses)
    }

    // ---- 管理端 ----

    pub async fn create_event(&self, request: CreateEventRequest) -> AppResult<Event> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Event name is required".to_string(),
            ));
        }

        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(request.name.trim())
        .bind(&request.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    pub async fn get_all_events(&self) -> AppResult<Vec<PublicEventResponse>> {
        self.get_public_events().await
    }

    pub async fn update_event(
        &self,
        event_id: Uuid,
        request: UpdateEventRequest,
    ) -> AppResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            UPDATE events
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(event_id)
        .bind(&request.name)
        .bind(&request.description)
        .fetch_optional(&self.pool)
        .await?;

        event.ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn delete_event(&self, event_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(event_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        Ok(())
    }

    // ---- 内部查询 ----

    async fn get_event(&self, event_id: Uuid) -> AppResult<Event> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, name, description, created_at, updated_at FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        event.ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    /// 活动展示的模板, 含跨活动通用模板 (event_id 为 NULL, 持票同样会发)
    async fn event_templates(&self, event_id: Uuid) -> AppResult<Vec<CouponTemplate>> {
        let templates = sqlx::query_as::<_, CouponTemplate>(
            r#"
            SELECT id, event_id, title, description, discount, image_url,
                   valid_from, valid_until, terms, created_at
            FROM coupon_templates
            WHERE event_id = $1 OR event_id IS NULL
            ORDER BY created_at DESC
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(templates)
    }

    async fn with_stats(&self, event: Event) -> AppResult<PublicEventResponse> {
        let coupons = self.event_templates(event.id).await?;

        let (total, booked): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(t.id), COUNT(ut.id)
            FROM tickets t
            LEFT JOIN user_tickets ut ON ut.ticket_id = t.id
            WHERE t.event_id = $1
            "#,
        )
        .bind(event.id)
        .fetch_one(&self.pool)
        .await?;

        Ok(PublicEventResponse::new(event, coupons, total, total - booked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;

    #[sqlx::test]
    async fn public_event_lists_own_and_global_templates(pool: PgPool) {
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        let other_event_id = fixtures::create_event(&pool, "美食节").await;
        let own = fixtures::create_template(&pool, Some(event_id), "饮品券").await;
        let global = fixtures::create_template(&pool, None, "通用折扣").await;
        fixtures::create_template(&pool, Some(other_event_id), "他场专属").await;

        let response = EventService::new(pool.clone())
            .get_public_event(event_id)
            .await
            .unwrap();

        // 本活动模板和通用模板都展示, 其他活动的不展示
        let ids: Vec<Uuid> = response.coupons.iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&own));
        assert!(ids.contains(&global));
    }
}

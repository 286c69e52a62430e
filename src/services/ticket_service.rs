use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::CouponService;
use crate::utils::format_ticket_number;
use sqlx::PgPool;
use uuid::Uuid;

/// 自动预订抢到的票被并发写者占用时的重选次数
const BOOK_RETRY_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct TicketService {
    pool: PgPool,
    coupon_service: CouponService,
}

impl TicketService {
    pub fn new(pool: PgPool, coupon_service: CouponService) -> Self {
        Self {
            pool,
            coupon_service,
        }
    }

    /// 按票号把票绑定到用户。
    ///
    /// 已绑定到同一用户时幂等成功 (already_linked = true, 不重复发券);
    /// 绑定到他人时报冲突。user_tickets.ticket_id 的唯一约束是并发绑定
    /// 的最终仲裁, 插入撞约束后按赢家归属重新裁决。
    pub async fn bind_by_number(
        &self,
        user_id: Uuid,
        ticket_number: &str,
    ) -> AppResult<AddTicketResponse> {
        let ticket_number = ticket_number.trim();
        if ticket_number.is_empty() {
            return Err(AppError::ValidationError(
                "Ticket number is required".to_string(),
            ));
        }

        let ticket = sqlx::query_as::<_, Ticket>(
            "SELECT id, ticket_number, event_id FROM tickets WHERE ticket_number = $1",
        )
        .bind(ticket_number)
        .fetch_optional(&self.pool)
        .await?;

        let ticket = ticket.ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        if let Some(owner_id) = self.ticket_owner(ticket.id).await? {
            return self.resolve_existing_binding(user_id, &ticket, owner_id).await;
        }

        let insert = sqlx::query("INSERT INTO user_tickets (user_id, ticket_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(ticket.id)
            .execute(&self.pool)
            .await;

        if let Err(e) = insert {
            let err = AppError::from(e);
            if err.is_unique_violation() {
                // 并发绑定输掉了竞争, 按赢家归属重新裁决
                let owner_id = self
                    .ticket_owner(ticket.id)
                    .await?
                    .ok_or_else(|| AppError::InternalError("Ticket binding vanished".to_string()))?;
                return self.resolve_existing_binding(user_id, &ticket, owner_id).await;
            }
            return Err(err);
        }

        let coupons_generated = self
            .issue_coupons_best_effort(user_id, ticket.id, ticket.event_id)
            .await;
        let event = self.event_with_coupons(ticket.event_id).await?;

        Ok(AddTicketResponse {
            event,
            already_linked: false,
            coupons_generated,
        })
    }

    /// 自动分配活动的可用票并绑定 (每个用户每个活动最多一张)。
    ///
    /// 选票策略: 取票号最小的未绑定票。可用性读取只是优化, 真正的互斥
    /// 由 user_tickets.ticket_id 唯一约束保证; 撞约束说明并发预订者抢走
    /// 了这张票, 重新选票再试。
    pub async fn bind_automatically(
        &self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<BookTicketResponse> {
        let already_booked: i64 = sqlx::query_scalar(
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

        if already_booked > 0 {
            return Err(AppError::Conflict(
                "You have already booked a ticket for this event. One ticket per user per event."
                    .to_string(),
            ));
        }

        let mut bound_ticket: Option<Ticket> = None;

        for _ in 0..BOOK_RETRY_ATTEMPTS {
            let candidate = sqlx::query_as::<_, Ticket>(
                r#"
                SELECT t.id, t.ticket_number, t.event_id
                FROM tickets t
                LEFT JOIN user_tickets ut ON ut.ticket_id = t.id
                WHERE t.event_id = $1 AND ut.id IS NULL
                ORDER BY t.ticket_number
                LIMIT 1
                "#,
            )
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

            let Some(candidate) = candidate else {
                break;
            };

            let insert =
                sqlx::query("INSERT INTO user_tickets (user_id, ticket_id) VALUES ($1, $2)")
                    .bind(user_id)
                    .bind(candidate.id)
                    .execute(&self.pool)
                    .await;

            match insert {
                Ok(_) => {
                    bound_ticket = Some(candidate);
                    break;
                }
                Err(e) => {
                    let err = AppError::from(e);
                    if err.is_unique_violation() {
                        log::info!(
                            "Ticket {} claimed concurrently, reselecting",
                            candidate.ticket_number
                        );
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        let ticket = bound_ticket.ok_or_else(|| {
            AppError::ValidationError("No tickets available for this event".to_string())
        })?;

        let coupons_generated = self
            .issue_coupons_best_effort(user_id, ticket.id, event_id)
            .await;
        let event = self.event_with_coupons(event_id).await?;

        Ok(BookTicketResponse {
            ticket: TicketSummary {
                id: ticket.id,
                ticket_number: ticket.ticket_number,
            },
            event,
            coupons_generated,
        })
    }

    pub async fn get_user_tickets(&self, user_id: Uuid) -> AppResult<Vec<UserTicketResponse>> {
        let tickets = sqlx::query_as::<_, UserTicketResponse>(
            r#"
            SELECT ut.id, t.id AS ticket_id, t.ticket_number,
                   e.id AS event_id, e.name AS event_name, e.description AS event_description,
                   ut.created_at
            FROM user_tickets ut
            JOIN tickets t ON t.id = ut.ticket_id
            JOIN events e ON e.id = t.event_id
            WHERE ut.user_id = $1
            ORDER BY ut.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tickets)
    }

    // ---- 管理端 ----

    /// 批量添加显式票号, 已存在的票号跳过
    pub async fn add_tickets(
        &self,
        event_id: Uuid,
        ticket_numbers: Vec<String>,
    ) -> AppResult<TicketsCreatedResponse> {
        if ticket_numbers.is_empty() {
            return Err(AppError::ValidationError(
                "Ticket numbers array is required".to_string(),
            ));
        }

        self.require_event(event_id).await?;

        let mut tickets = Vec::new();
        for number in ticket_numbers {
            let number = number.trim();
            if number.is_empty() {
                continue;
            }

            let created = sqlx::query_as::<_, Ticket>(
                r#"
                INSERT INTO tickets (ticket_number, event_id)
                VALUES ($1, $2)
                ON CONFLICT (ticket_number) DO NOTHING
                RETURNING id, ticket_number, event_id
                "#,
            )
            .bind(number)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(ticket) = created {
                tickets.push(ticket);
            }
        }

        Ok(TicketsCreatedResponse {
            created_count: tickets.len(),
            tickets,
        })
    }

    /// 自动生成票号: 前缀 + 递增的零填充序号, 已被占用的序号跳过。
    /// 尝试次数以 2×count 为上限, 占用过密时可能少生成。
    pub async fn generate_tickets(
        &self,
        event_id: Uuid,
        count: u32,
        prefix: Option<String>,
    ) -> AppResult<TicketsCreatedResponse> {
        if count < 1 || count > 1000 {
            return Err(AppError::ValidationError(
                "Count must be between 1 and 1000".to_string(),
            ));
        }

        self.require_event(event_id).await?;

        let prefix = prefix.unwrap_or_else(|| "TICKET".to_string());
        let max_attempts = count * 2;

        let mut tickets = Vec::new();
        let mut seq = 1u32;
        let mut attempts = 0u32;

        while (tickets.len() as u32) < count && attempts < max_attempts {
            attempts += 1;
            let number = format_ticket_number(&prefix, seq);
            seq += 1;

            let created = sqlx::query_as::<_, Ticket>(
                r#"
                INSERT INTO tickets (ticket_number, event_id)
                VALUES ($1, $2)
                ON CONFLICT (ticket_number) DO NOTHING
                RETURNING id, ticket_number, event_id
                "#,
            )
            .bind(&number)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(ticket) = created {
                tickets.push(ticket);
            }
        }

        Ok(TicketsCreatedResponse {
            created_count: tickets.len(),
            tickets,
        })
    }

    // ---- 内部 ----

    async fn resolve_existing_binding(
        &self,
        user_id: Uuid,
        ticket: &Ticket,
        owner_id: Uuid,
    ) -> AppResult<AddTicketResponse> {
        if owner_id == user_id {
            // 自己的票重复绑定: 幂等成功, 不重复发券
            let event = self.event_with_coupons(ticket.event_id).await?;
            return Ok(AddTicketResponse {
                event,
                already_linked: true,
                coupons_generated: 0,
            });
        }

        Err(AppError::Conflict(
            "Ticket is already linked to another account".to_string(),
        ))
    }

    async fn ticket_owner(&self, ticket_id: Uuid) -> AppResult<Option<Uuid>> {
        let owner = sqlx::query_scalar("SELECT user_id FROM user_tickets WHERE ticket_id = $1")
            .bind(ticket_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(owner)
    }

    /// 发券失败不阻断绑定主流程, 只记录并按 0 张上报
    async fn issue_coupons_best_effort(
        &self,
        user_id: Uuid,
        ticket_id: Uuid,
        event_id: Uuid,
    ) -> i64 {
        match self
            .coupon_service
            .issue_for_ticket(user_id, ticket_id, event_id)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                log::error!("Coupon issuance failed for ticket {}: {:?}", ticket_id, e);
                0
            }
        }
    }

    async fn require_event(&self, event_id: Uuid) -> AppResult<()> {
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM events WHERE id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(AppError::NotFound("Event not found".to_string()));
        }

        Ok(())
    }

    async fn event_with_coupons(&self, event_id: Uuid) -> AppResult<EventWithCoupons> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, name, description, created_at, updated_at FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        let event = event.ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        // 跨活动通用模板 (event_id 为 NULL) 也会为该票发券, 一并展示
        let coupons = sqlx::query_as::<_, CouponTemplate>(
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

        Ok(EventWithCoupons {
            id: event.id,
            name: event.name,
            description: event.description,
            created_at: event.created_at,
            updated_at: event.updated_at,
            coupons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures;

    fn service(pool: &PgPool) -> TicketService {
        TicketService::new(pool.clone(), CouponService::new(pool.clone()))
    }

    #[sqlx::test]
    async fn bind_by_number_is_idempotent_and_issues_once(pool: PgPool) {
        let user_id = fixtures::create_user(&pool, "+8613800000001").await;
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        let ticket_id = fixtures::create_ticket(&pool, event_id, "FEST000001").await;
        fixtures::create_template(&pool, Some(event_id), "饮品券").await;
        fixtures::create_template(&pool, None, "通用折扣").await;

        let service = service(&pool);

        let first = service.bind_by_number(user_id, "FEST000001").await.unwrap();
        assert!(!first.already_linked);
        assert_eq!(first.coupons_generated, 2);
        assert_eq!(first.event.coupons.len(), 2);

        // 重复绑定自己的票: 幂等成功, 不补发
        let second = service.bind_by_number(user_id, "FEST000001").await.unwrap();
        assert!(second.already_linked);
        assert_eq!(second.coupons_generated, 0);
        assert_eq!(fixtures::coupon_count(&pool, ticket_id).await, 2);
    }

    #[sqlx::test]
    async fn bind_by_number_rejects_foreign_ticket(pool: PgPool) {
        let owner_id = fixtures::create_user(&pool, "+8613800000001").await;
        let other_id = fixtures::create_user(&pool, "+8613800000002").await;
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        fixtures::create_ticket(&pool, event_id, "FEST000001").await;

        let service = service(&pool);
        service.bind_by_number(owner_id, "FEST000001").await.unwrap();

        let err = service
            .bind_by_number(other_id, "FEST000001")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[sqlx::test]
    async fn bind_by_number_unknown_ticket(pool: PgPool) {
        let user_id = fixtures::create_user(&pool, "+8613800000001").await;

        let err = service(&pool)
            .bind_by_number(user_id, "MISSING001")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[sqlx::test]
    async fn bind_automatically_one_ticket_per_user_per_event(pool: PgPool) {
        let first_user = fixtures::create_user(&pool, "+8613800000001").await;
        let second_user = fixtures::create_user(&pool, "+8613800000002").await;
        let third_user = fixtures::create_user(&pool, "+8613800000003").await;
        let event_id = fixtures::create_event(&pool, "音乐节").await;
        fixtures::create_ticket(&pool, event_id, "FEST000002").await;
        fixtures::create_ticket(&pool, event_id, "FEST000001").await;

        let service = service(&pool);

        // 票号最小的未绑定票先被分配
        let booked = service
            .bind_automatically(first_user, event_id)
            .await
            .unwrap();
        assert_eq!(booked.ticket.ticket_number, "FEST000001");

        // 同一用户同一活动只能预订一张
        let err = service
            .bind_automatically(first_user, event_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let booked = service
            .bind_automatically(second_user, event_id)
            .await
            .unwrap();
        assert_eq!(booked.ticket.ticket_number, "FEST000002");

        // 票发完后预订失败
        let err = service
            .bind_automatically(third_user, event_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}

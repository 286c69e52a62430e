pub mod auth_service;
pub mod coupon_service;
pub mod event_service;
pub mod ticket_service;

pub use auth_service::AuthService;
pub use coupon_service::CouponService;
pub use event_service::EventService;
pub use ticket_service::TicketService;

/// 数据库测试共用的造数帮手
#[cfg(test)]
pub(crate) mod fixtures {
    use sqlx::PgPool;
    use uuid::Uuid;

    pub async fn create_user(pool: &PgPool, phone: &str) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO users (firebase_uid, phone_number, name) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(format!("firebase-{phone}"))
        .bind(phone)
        .bind("测试用户")
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub async fn create_event(pool: &PgPool, name: &str) -> Uuid {
        sqlx::query_scalar("INSERT INTO events (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    pub async fn create_ticket(pool: &PgPool, event_id: Uuid, number: &str) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO tickets (ticket_number, event_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(number)
        .bind(event_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    /// event_id 传 None 时创建跨活动通用模板
    pub async fn create_template(pool: &PgPool, event_id: Option<Uuid>, title: &str) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO coupon_templates (event_id, title, discount) VALUES ($1, $2, 10.0) RETURNING id",
        )
        .bind(event_id)
        .bind(title)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    pub async fn coupon_count(pool: &PgPool, ticket_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_coupons WHERE ticket_id = $1")
            .bind(ticket_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }
}

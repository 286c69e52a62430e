use crate::models::coupon::CouponTemplate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    #[schema(example = "Gala 2025")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// 活动 + 该活动的优惠券模板 (绑定成功后返回给用户)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventWithCoupons {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub coupons: Vec<CouponTemplate>,
}

/// 公开活动列表项, 带票量统计
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublicEventResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub coupons: Vec<CouponTemplate>,
    pub total_tickets: i64,
    pub available_tickets: i64,
    pub booked_tickets: i64,
    #[schema(example = "Booking Open")]
    pub status: String,
}

impl PublicEventResponse {
    pub fn new(
        event: Event,
        coupons: Vec<CouponTemplate>,
        total_tickets: i64,
        available_tickets: i64,
    ) -> Self {
        let status = if available_tickets > 0 {
            "Booking Open".to_string()
        } else {
            "Sold Out".to_string()
        };

        Self {
            id: event.id,
            name: event.name,
            description: event.description,
            created_at: event.created_at,
            updated_at: event.updated_at,
            coupons,
            total_tickets,
            booked_tickets: total_tickets - available_tickets,
            available_tickets,
            status,
        }
    }
}

/// 用户已持票的活动 (GET /events)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserEventResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ticket_count: i64,
    pub coupons: Vec<CouponTemplate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> Event {
        Event {
            id: Uuid::new_v4(),
            name: "Gala".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_event_status_open_vs_sold_out() {
        let open = PublicEventResponse::new(event(), vec![], 10, 3);
        assert_eq!(open.status, "Booking Open");
        assert_eq!(open.booked_tickets, 7);

        let sold_out = PublicEventResponse::new(event(), vec![], 10, 0);
        assert_eq!(sold_out.status, "Sold Out");
        assert_eq!(sold_out.booked_tickets, 10);
    }
}

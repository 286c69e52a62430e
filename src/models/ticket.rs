use crate::models::event::EventWithCoupons;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub event_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TicketSummary {
    pub id: Uuid,
    pub ticket_number: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddTicketRequest {
    #[schema(example = "TICKET000001")]
    pub ticket_number: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookTicketRequest {
    pub event_id: Uuid,
}

/// 按票号绑定的结果; already_linked = true 表示重复绑定自己的票, 未新发券
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddTicketResponse {
    pub event: EventWithCoupons,
    pub already_linked: bool,
    pub coupons_generated: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookTicketResponse {
    pub ticket: TicketSummary,
    pub event: EventWithCoupons,
    pub coupons_generated: i64,
}

/// 用户持有的票 (GET /events/tickets)
#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserTicketResponse {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub ticket_number: String,
    pub event_id: Uuid,
    pub event_name: String,
    pub event_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddTicketsRequest {
    pub ticket_numbers: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateTicketsRequest {
    #[schema(example = 100)]
    pub count: u32,
    #[schema(example = "TICKET")]
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TicketsCreatedResponse {
    pub created_count: usize,
    pub tickets: Vec<Ticket>,
}

use crate::handlers::auth_user;
use crate::models::*;
use crate::services::{CouponService, EventService, TicketService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/events/public",
    tag = "events",
    responses(
        (status = 200, description = "公开活动列表")
    )
)]
pub async fn get_public_events(event_service: web::Data<EventService>) -> Result<HttpResponse> {
    match event_service.get_public_events().await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "events": events }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/public/{event_id}",
    tag = "events",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    responses(
        (status = 200, description = "公开活动详情", body = PublicEventResponse),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_public_event_details(
    event_service: web::Data<EventService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    match event_service.get_public_event(path.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "event": event }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events",
    tag = "events",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "用户持票的活动列表"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_user_events(
    event_service: web::Data<EventService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service.get_user_events(user.id).await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "events": events }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/tickets",
    tag = "events",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "用户持有的票"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_user_tickets(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match ticket_service.get_user_tickets(user.id).await {
        Ok(tickets) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "tickets": tickets }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/add-ticket",
    tag = "events",
    request_body = AddTicketRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "绑定成功", body = AddTicketResponse),
        (status = 400, description = "票已绑定其他账户"),
        (status = 404, description = "票号不存在")
    )
)]
pub async fn add_ticket(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
    request: web::Json<AddTicketRequest>,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match ticket_service
        .bind_by_number(user.id, &request.ticket_number)
        .await
    {
        Ok(response) => {
            let message = if response.already_linked {
                "Ticket already linked to your account"
            } else {
                "Ticket added successfully"
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/book",
    tag = "events",
    request_body = BookTicketRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "预订成功", body = BookTicketResponse),
        (status = 400, description = "已预订过或无余票")
    )
)]
pub async fn book_ticket(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
    request: web::Json<BookTicketRequest>,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match ticket_service
        .bind_automatically(user.id, request.event_id)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response,
            "message": "Ticket booked successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/coupons",
    tag = "coupons",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "用户的个人优惠券列表"),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_user_coupons(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match coupon_service.get_user_coupons(user.id).await {
        Ok(coupons) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "coupons": coupons }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/events/coupons/{coupon_id}/redeem",
    tag = "coupons",
    params(
        ("coupon_id" = Uuid, Path, description = "个人优惠券 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "核销成功", body = UserCouponResponse),
        (status = 400, description = "已核销过"),
        (status = 403, description = "不是券主"),
        (status = 404, description = "券不存在")
    )
)]
pub async fn redeem_coupon(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match coupon_service.redeem(user.id, path.into_inner()).await {
        Ok(coupon) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "coupon": coupon },
            "message": "Coupon redeemed successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/coupons/{coupon_id}/wallet",
    tag = "coupons",
    params(
        ("coupon_id" = Uuid, Path, description = "个人优惠券 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "钱包卡片 JSON", body = WalletPass),
        (status = 403, description = "不是券主"),
        (status = 404, description = "券不存在")
    )
)]
pub async fn get_wallet_pass(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match coupon_service.wallet_pass(user.id, path.into_inner()).await {
        Ok(pass) => Ok(HttpResponse::Ok().json(pass)),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/events/{event_id}",
    tag = "events",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动详情", body = PublicEventResponse),
        (status = 403, description = "用户未持有该活动的票"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn get_event_details(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let user = match auth_user(&req) {
        Ok(u) => u,
        Err(e) => return Ok(e.error_response()),
    };

    match event_service
        .get_event_details(user.id, path.into_inner())
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "event": event }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn event_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            // 具体路径必须注册在 /{event_id} 之前
            .route("/public", web::get().to(get_public_events))
            .route("/public/{event_id}", web::get().to(get_public_event_details))
            .route("/tickets", web::get().to(get_user_tickets))
            .route("/coupons", web::get().to(get_user_coupons))
            .route("/coupons/{coupon_id}/wallet", web::get().to(get_wallet_pass))
            .route("/coupons/{coupon_id}/redeem", web::post().to(redeem_coupon))
            .route("/add-ticket", web::post().to(add_ticket))
            .route("/book", web::post().to(book_ticket))
            .route("", web::get().to(get_user_events))
            .route("/{event_id}", web::get().to(get_event_details)),
    );
}

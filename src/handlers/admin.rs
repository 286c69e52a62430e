use crate::handlers::require_admin;
use crate::models::*;
use crate::services::{CouponService, EventService, TicketService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/admin/events",
    tag = "admin",
    request_body = CreateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建活动成功", body = Event),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn create_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    request: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match event_service.create_event(request.into_inner()).await {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "event": event },
            "message": "Event created successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/events",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动列表 (管理视图)"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn get_all_events(
    event_service: web::Data<EventService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match event_service.get_all_events().await {
        Ok(events) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "events": events }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/events/{event_id}",
    tag = "admin",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    request_body = UpdateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新活动成功", body = Event),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn update_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<UpdateEventRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match event_service
        .update_event(path.into_inner(), request.into_inner())
        .await
    {
        Ok(event) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "event": event },
            "message": "Event updated successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/events/{event_id}",
    tag = "admin",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除活动成功"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn delete_event(
    event_service: web::Data<EventService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match event_service.delete_event(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Event deleted successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/events/{event_id}/tickets",
    tag = "admin",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    request_body = AddTicketsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "批量添加票成功", body = TicketsCreatedResponse),
        (status = 400, description = "票号列表为空"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn add_tickets(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<AddTicketsRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match ticket_service
        .add_tickets(path.into_inner(), request.into_inner().ticket_numbers)
        .await
    {
        Ok(response) => {
            let message = format!("{} tickets added successfully", response.created_count);
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
    path = "/admin/events/{event_id}/tickets/generate",
    tag = "admin",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    request_body = GenerateTicketsRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "自动生成票成功", body = TicketsCreatedResponse),
        (status = 400, description = "数量超出 1-1000"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn generate_tickets(
    ticket_service: web::Data<TicketService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<GenerateTicketsRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    let request = request.into_inner();
    match ticket_service
        .generate_tickets(path.into_inner(), request.count, request.prefix)
        .await
    {
        Ok(response) => {
            let message = format!("{} tickets generated successfully", response.created_count);
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
    path = "/admin/events/{event_id}/coupons",
    tag = "admin",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    request_body = CreateCouponTemplateRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "创建优惠券模板成功", body = CouponTemplate),
        (status = 400, description = "标题为空"),
        (status = 404, description = "活动不存在")
    )
)]
pub async fn create_coupon_template(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<CreateCouponTemplateRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match coupon_service
        .create_template(path.into_inner(), request.into_inner())
        .await
    {
        Ok(template) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "coupon": template },
            "message": "Coupon created successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/events/{event_id}/coupons",
    tag = "admin",
    params(
        ("event_id" = Uuid, Path, description = "活动 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "活动的优惠券模板列表"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn get_event_coupon_templates(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match coupon_service.get_event_templates(path.into_inner()).await {
        Ok(templates) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "coupons": templates }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/admin/coupons/{coupon_id}",
    tag = "admin",
    params(
        ("coupon_id" = Uuid, Path, description = "优惠券模板 ID")
    ),
    request_body = UpdateCouponTemplateRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "更新优惠券模板成功", body = CouponTemplate),
        (status = 404, description = "模板不存在")
    )
)]
pub async fn update_coupon_template(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    request: web::Json<UpdateCouponTemplateRequest>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match coupon_service
        .update_template(path.into_inner(), request.into_inner())
        .await
    {
        Ok(template) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "coupon": template },
            "message": "Coupon updated successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/coupons/{coupon_id}",
    tag = "admin",
    params(
        ("coupon_id" = Uuid, Path, description = "优惠券模板 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "删除优惠券模板成功"),
        (status = 404, description = "模板不存在")
    )
)]
pub async fn delete_coupon_template(
    coupon_service: web::Data<CouponService>,
    req: HttpRequest,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match coupon_service.delete_template(path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Coupon deleted successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/events", web::post().to(create_event))
            .route("/events", web::get().to(get_all_events))
            .route("/events/{event_id}", web::put().to(update_event))
            .route("/events/{event_id}", web::delete().to(delete_event))
            .route("/events/{event_id}/tickets", web::post().to(add_tickets))
            .route(
                "/events/{event_id}/tickets/generate",
                web::post().to(generate_tickets),
            )
            .route(
                "/events/{event_id}/coupons",
                web::post().to(create_coupon_template),
            )
            .route(
                "/events/{event_id}/coupons",
                web::get().to(get_event_coupon_templates),
            )
            .route(
                "/coupons/{coupon_id}",
                web::put().to(update_coupon_template),
            )
            .route(
                "/coupons/{coupon_id}",
                web::delete().to(delete_coupon_template),
            ),
    );
}

use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::check_user,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::profile,
        handlers::event::get_public_events,
        handlers::event::get_public_event_details,
        handlers::event::get_user_events,
        handlers::event::get_user_tickets,
        handlers::event::add_ticket,
        handlers::event::book_ticket,
        handlers::event::get_user_coupons,
        handlers::event::redeem_coupon,
        handlers::event::get_wallet_pass,
        handlers::event::get_event_details,
        handlers::admin::create_event,
        handlers::admin::get_all_events,
        handlers::admin::update_event,
        handlers::admin::delete_event,
        handlers::admin::add_tickets,
        handlers::admin::generate_tickets,
        handlers::admin::create_coupon_template,
        handlers::admin::get_event_coupon_templates,
        handlers::admin::update_coupon_template,
        handlers::admin::delete_coupon_template,
    ),
    components(
        schemas(
            User,
            UserResponse,
            CheckUserRequest,
            CheckUserResponse,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            Event,
            CreateEventRequest,
            UpdateEventRequest,
            EventWithCoupons,
            PublicEventResponse,
            UserEventResponse,
            Ticket,
            TicketSummary,
            AddTicketRequest,
            BookTicketRequest,
            AddTicketResponse,
            BookTicketResponse,
            UserTicketResponse,
            AddTicketsRequest,
            GenerateTicketsRequest,
            TicketsCreatedResponse,
            CouponTemplate,
            CreateCouponTemplateRequest,
            UpdateCouponTemplateRequest,
            UserCouponResponse,
            WalletPass,
            WalletPassCoupon,
            WalletPassBarcode,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "手机号身份认证"),
        (name = "events", description = "活动与门票"),
        (name = "coupons", description = "个人优惠券"),
        (name = "admin", description = "管理端")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}

pub mod code_generator;
pub mod jwt;
pub mod phone;

pub use code_generator::{format_ticket_number, generate_coupon_code, generate_unique_code};
pub use jwt::{Claims, JwtService};
pub use phone::{normalize_phone, validate_phone};

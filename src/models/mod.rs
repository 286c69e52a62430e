pub mod coupon;
pub mod event;
pub mod ticket;
pub mod user;

pub use coupon::*;
pub use event::*;
pub use ticket::*;
pub use user::*;

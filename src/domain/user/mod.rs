pub mod dto;
pub mod model;
pub mod service;

pub use dto::PlanResponse;
pub use model::{User, UserStatus};
pub use service::UserService;

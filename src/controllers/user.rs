use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::{
    domain::user::{PlanResponse, UserService},
    error::AppResult,
    infrastructure::auth::AuthUser,
};

pub struct UserController {
    user_service: Arc<UserService>,
}

impl UserController {
    pub fn new(user_service: Arc<UserService>) -> Self {
        Self { user_service }
    }

    /// GET /api/user/plan - Current subscription and character quota,
    /// creating trial defaults on first access
    pub async fn get_plan(
        State(controller): State<Arc<UserController>>,
        Extension(auth_user): Extension<AuthUser>,
    ) -> AppResult<Json<PlanResponse>> {
        let response = controller.user_service.get_user_plan(auth_user.user_id).await?;
        Ok(Json(response))
    }
}

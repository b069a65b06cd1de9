use axum::Json;
use moods_core::Identity;

use crate::bearer::CurrentUser;

/// `GET /users/me`
pub async fn me(CurrentUser(user): CurrentUser) -> Json<Identity> { Json(user) }

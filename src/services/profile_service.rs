use crate::{
    dto::users::UpdateProfileRequest,
    error::{AppError, AppResult},
    gateway::{ProfileGateway, ProfilePatch},
    middleware::auth::AuthUser,
    models::UserProfile,
    response::ApiResponse,
    state::AppState,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UserProfile>> {
    let profile = state
        .gateway
        .find_profile(&user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Profile", profile, None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<UserProfile>> {
    for (field, value) in [
        ("first_name", &payload.first_name),
        ("last_name", &payload.last_name),
    ] {
        if value.as_ref().is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::BadRequest(format!("{field} cannot be blank")));
        }
    }

    let patch = ProfilePatch {
        first_name: payload.first_name,
        last_name: payload.last_name,
        phone: payload.phone,
        address: payload.address,
        email: payload.email,
        is_admin: None,
    };
    let profile = state
        .gateway
        .update_profile(&user.user_id, patch)
        .await?
        .ok_or(AppError::NotFound)?;
    tracing::info!(user_id = %user.user_id, "profile updated");
    Ok(ApiResponse::success("Profile updated", profile, None))
}

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::CreateAvailabilityRequest;
use crate::services::{AvailabilityService, DepartmentService};

#[derive(Debug, Deserialize)]
pub struct DepartmentQuery {
    pub department_id: Option<String>,
}

// ==============================================================================
// PUBLIC HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    let availability = availability_service.get_availability(&doctor_id, None).await?;

    Ok(Json(json!(availability)))
}

#[axum::debug_handler]
pub async fn get_doctors_by_department(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DepartmentQuery>,
) -> Result<Json<Value>, AppError> {
    let department_id = query.department_id
        .ok_or_else(|| AppError::BadRequest("department_id query parameter is required".to_string()))?;

    let department_service = DepartmentService::new(&state);
    let doctors = department_service.list_doctors(&department_id, None).await?;

    Ok(Json(json!(doctors)))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let availability_service = AvailabilityService::new(&state);

    availability_service.set_availability(&doctor_id, &payload, auth.token()).await?;

    Ok(Json(json!({ "detail": "Availability set successfully." })))
}

#[axum::debug_handler]
pub async fn create_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let request: CreateAvailabilityRequest = serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid availability: {}", e)))?;

    let availability_service = AvailabilityService::new(&state);
    let availability = availability_service.create_availability(&user, request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(json!(availability))))
}

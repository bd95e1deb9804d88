use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use crate::models::{AcceleratorSpec, AppState};
use super::helpers::{store_for_request, ApiError};

#[derive(Deserialize, Debug)]
pub struct DeployForm {
    #[serde(default)]
    pub instance_type: String,
}

#[derive(Deserialize, Debug)]
pub struct AttachForm {
    pub principal_id: String,
    #[serde(default)]
    pub accelerators: Vec<AcceleratorSpec>,
}

pub async fn fleet_get(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let store = store_for_request(&state, &headers)?;
    Ok(Json(store.view()))
}

pub async fn principal_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DeployForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = payload?;
    let store = store_for_request(&state, &headers)?;
    let instance = store.deploy_principal(&form.instance_type).await?;
    Ok((StatusCode::CREATED, Json(instance)))
}

pub async fn accelerators_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AttachForm>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(form) = payload?;
    let store = store_for_request(&state, &headers)?;
    let created = store.attach_accelerators(&form.principal_id, &form.accelerators)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn instance_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(instance_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let store = store_for_request(&state, &headers)?;
    store.terminate(&instance_id).await?;
    Ok(Json(store.view()))
}

pub async fn refresh_post(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let store = store_for_request(&state, &headers)?;
    store.refresh().await?;
    Ok(Json(store.view()))
}

pub async fn error_dismiss_post(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let store = store_for_request(&state, &headers)?;
    store.dismiss_error();
    Ok(StatusCode::NO_CONTENT)
}

use crate::errors::AppError;
use crate::models::{
    ChildInput, ChildRecord, ClearResponse, ConfirmRequest, DashboardView, DeleteResponse,
};
use crate::state::AppState;
use crate::ui::{render_dashboard, render_index};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::Html,
};

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let records = state.records.read_all().await;
    Html(render_index(&render_dashboard(&records)))
}

pub async fn dashboard(State(state): State<AppState>) -> Json<DashboardView> {
    let records = state.records.read_all().await;
    Json(render_dashboard(&records))
}

pub async fn list_children(State(state): State<AppState>) -> Json<Vec<ChildRecord>> {
    Json(state.records.read_all().await)
}

pub async fn replace_children(
    State(state): State<AppState>,
    Json(records): Json<Vec<ChildRecord>>,
) -> Result<Json<Vec<ChildRecord>>, AppError> {
    Ok(Json(state.records.write_all(records).await?))
}

pub async fn create_child(
    State(state): State<AppState>,
    Json(input): Json<ChildInput>,
) -> Result<(StatusCode, Json<ChildRecord>), AppError> {
    let record = state.records.create_record(&input).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn update_child(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<ChildInput>,
) -> Result<Json<ChildRecord>, AppError> {
    Ok(Json(state.records.update_record(&id, &input).await?))
}

pub async fn delete_child(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let outcome = state.records.delete_record(&id, request.confirmed).await?;
    Ok(Json(DeleteResponse { id, outcome }))
}

pub async fn clear_all(
    State(state): State<AppState>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<ClearResponse>, AppError> {
    let cleared = state.records.clear_all(request.confirmed).await?;
    Ok(Json(ClearResponse { cleared }))
}

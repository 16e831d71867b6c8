use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{dto::job_dto::JobResponse, error::Result, AppState};

#[utoipa::path(
    get,
    path = "/api/jobs",
    responses(
        (status = 200, description = "All jobs with their companies", body = [JobResponse])
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let jobs = state.job_service.list().await?;
    let response: Vec<JobResponse> = jobs.into_iter().map(JobResponse::from).collect();
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = Json<JobResponse>),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.get(id).await?;
    Ok(Json(JobResponse::from(job)))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::application_dto::{
        ApplicationDetailResponse, ApplicationListQuery, ApplicationResponse,
        HistoryRecordResponse, NextStagesResponse, StageUpdateResponse, SubmitApplicationPayload,
        UpdateStagePayload,
    },
    error::Result,
    models::application::ApplicationFilter,
    models::user::Actor,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = SubmitApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Json<ApplicationResponse>),
        (status = 400, description = "Missing job id, closed job, or duplicate application"),
        (status = 403, description = "Caller is not a candidate"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(payload): Json<SubmitApplicationPayload>,
) -> Result<impl IntoResponse> {
    let job_id = payload
        .job_id
        .ok_or_else(|| crate::error::Error::MissingField("Job ID is required".to_string()))?;
    let application = state.application_service.submit(&actor, job_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApplicationResponse::from(application)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application found", body = Json<ApplicationDetailResponse>),
        (status = 403, description = "Outside the caller's visibility scope"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.application_service.get(&actor, id).await?;
    Ok(Json(ApplicationDetailResponse::from(detail)))
}

#[utoipa::path(
    put,
    path = "/api/applications/{id}/stage",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = UpdateStagePayload,
    responses(
        (status = 200, description = "Stage updated", body = Json<StageUpdateResponse>),
        (status = 400, description = "Missing or illegal target stage"),
        (status = 403, description = "Caller is not a recruiter of the owning company"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn update_application_stage(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStagePayload>,
) -> Result<impl IntoResponse> {
    let new_stage = payload
        .new_stage
        .ok_or_else(|| crate::error::Error::MissingField("New stage is required".to_string()))?;
    let (application, record) = state
        .application_service
        .advance_stage(&actor, id, new_stage)
        .await?;
    Ok(Json(StageUpdateResponse {
        message: "Application stage updated successfully".to_string(),
        application: ApplicationResponse::from(application),
        history_record: HistoryRecordResponse::from(record),
    }))
}

#[utoipa::path(
    get,
    path = "/api/applications",
    params(
        ("stage" = Option<String>, Query, description = "Filter by stage"),
        ("job_id" = Option<Uuid>, Query, description = "Filter by job")
    ),
    responses(
        (status = 200, description = "Applications visible to the caller, newest first", body = [ApplicationDetailResponse])
    )
)]
#[axum::debug_handler]
pub async fn list_applications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let filter = ApplicationFilter {
        stage: query.stage,
        job_id: query.job_id,
    };
    let applications = state.application_service.list(&actor, filter).await?;
    let response: Vec<ApplicationDetailResponse> = applications
        .into_iter()
        .map(ApplicationDetailResponse::from)
        .collect();
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/history",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Audit trail, oldest first", body = [HistoryRecordResponse]),
        (status = 403, description = "Outside the caller's visibility scope"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_application_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let records = state.application_service.history(&actor, id).await?;
    let response: Vec<HistoryRecordResponse> = records
        .into_iter()
        .map(HistoryRecordResponse::from)
        .collect();
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/stages",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Legal next stages for this application", body = Json<NextStagesResponse>),
        (status = 403, description = "Outside the caller's visibility scope"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn get_valid_next_stages(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let stages = state
        .application_service
        .valid_next_stages_for(&actor, id)
        .await?;
    Ok(Json(NextStagesResponse { stages }))
}

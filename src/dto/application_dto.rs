use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dto::job_dto::CompanySummary;
use crate::models::application::{Application, ApplicationDetail, Stage};
use crate::models::application_history::ApplicationHistory;
use crate::models::job::JobStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitApplicationPayload {
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStagePayload {
    pub new_stage: Option<Stage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    pub stage: Option<Stage>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Application> for ApplicationResponse {
    fn from(value: Application) -> Self {
        Self {
            id: value.id,
            job_id: value.job_id,
            candidate_id: value.candidate_id,
            stage: value.stage,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub status: JobStatus,
    pub company: CompanySummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDetailResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub stage: Stage,
    pub job: JobSummary,
    pub candidate: CandidateSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ApplicationDetail> for ApplicationDetailResponse {
    fn from(value: ApplicationDetail) -> Self {
        Self {
            id: value.application.id,
            job_id: value.application.job_id,
            candidate_id: value.application.candidate_id,
            stage: value.application.stage,
            job: JobSummary {
                id: value.job.id,
                title: value.job.title,
                status: value.job.status,
                company: CompanySummary::from(value.company),
            },
            candidate: CandidateSummary {
                id: value.candidate.id,
                email: value.candidate.email,
            },
            created_at: value.application.created_at,
            updated_at: value.application.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecordResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub previous_stage: Option<Stage>,
    pub new_stage: Stage,
    pub changed_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<ApplicationHistory> for HistoryRecordResponse {
    fn from(value: ApplicationHistory) -> Self {
        Self {
            id: value.id,
            application_id: value.application_id,
            previous_stage: value.previous_stage,
            new_stage: value.new_stage,
            changed_by_id: value.changed_by_id,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageUpdateResponse {
    pub message: String,
    pub application: ApplicationResponse,
    pub history_record: HistoryRecordResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct NextStagesResponse {
    pub stages: Vec<Stage>,
}

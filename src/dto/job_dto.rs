use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::company::Company;
use crate::models::job::{JobDetail, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanySummary {
    pub id: Uuid,
    pub name: String,
}

impl From<Company> for CompanySummary {
    fn from(value: Company) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: JobStatus,
    pub company: CompanySummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobDetail> for JobResponse {
    fn from(value: JobDetail) -> Self {
        Self {
            id: value.job.id,
            company_id: value.job.company_id,
            title: value.job.title,
            description: value.job.description,
            status: value.job.status,
            company: CompanySummary::from(value.company),
            created_at: value.job.created_at,
            updated_at: value.job.updated_at,
        }
    }
}

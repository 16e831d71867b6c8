use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::company::Company;
use crate::models::job::Job;
use crate::models::user::User;

/// Position of an application in the hiring workflow. `Applied` is the sole
/// initial value; `Rejected` is terminal; `Hired` is terminal except for the
/// escape transition to `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_stage")]
pub enum Stage {
    Applied,
    Screening,
    Interview,
    Offer,
    Hired,
    Rejected,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Applied => "Applied",
            Stage::Screening => "Screening",
            Stage::Interview => "Interview",
            Stage::Offer => "Offer",
            Stage::Hired => "Hired",
            Stage::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An application loaded with its job, owning company, and candidate. This is
/// the unit the visibility policy is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDetail {
    pub application: Application,
    pub job: Job,
    pub company: Company,
    pub candidate: User,
}

/// Scope applied to every list query before caller-supplied filters. There is
/// no unfiltered variant: no role sees a global list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationScope {
    Candidate(Uuid),
    Company(Uuid),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApplicationFilter {
    pub stage: Option<Stage>,
    pub job_id: Option<Uuid>,
}

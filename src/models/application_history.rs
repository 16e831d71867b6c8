use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::application::Stage;

/// One committed stage transition. Append-only: rows are never updated or
/// deleted, which is why there is no `updated_at`. The creation event is
/// recorded with `previous_stage = None`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationHistory {
    pub id: Uuid,
    pub application_id: Uuid,
    pub previous_stage: Option<Stage>,
    pub new_stage: Stage,
    pub changed_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

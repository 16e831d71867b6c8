use std::sync::Arc;

use uuid::Uuid;

use crate::database::store::ApplicationStore;
use crate::error::{Error, Result};
use crate::models::job::JobDetail;

/// Read-only job catalog. Job creation and status changes are owned by a
/// separate system; this service only serves what candidates apply against.
#[derive(Clone)]
pub struct JobService {
    store: Arc<dyn ApplicationStore>,
}

impl JobService {
    pub fn new(store: Arc<dyn ApplicationStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<JobDetail>> {
        self.store.list_jobs().await
    }

    pub async fn get(&self, id: Uuid) -> Result<JobDetail> {
        self.store
            .get_job(id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }
}

//! The `ApplicationStore` trait: the read/write operations the lifecycle
//! service requires of the persistent store. Implemented by [`PgStore`] for
//! Postgres and [`MemoryStore`] for in-process use.
//!
//! [`PgStore`]: crate::database::pg::PgStore
//! [`MemoryStore`]: crate::database::memory::MemoryStore

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::{
    Application, ApplicationDetail, ApplicationFilter, ApplicationScope, Stage,
};
use crate::models::application_history::ApplicationHistory;
use crate::models::job::JobDetail;
use crate::models::user::User;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDetail>>;

    async fn list_jobs(&self) -> Result<Vec<JobDetail>>;

    /// Load an application with its job, company, and candidate context.
    async fn get_application(&self, id: Uuid) -> Result<Option<ApplicationDetail>>;

    async fn find_application(&self, job_id: Uuid, candidate_id: Uuid)
        -> Result<Option<Application>>;

    /// Create an application at the `Applied` stage and append its creation
    /// history record in the same transaction. A concurrent duplicate for the
    /// same (job, candidate) pair observes `Error::Conflict`.
    async fn create_application(&self, job_id: Uuid, candidate_id: Uuid) -> Result<Application>;

    /// Persist a stage transition and append its history record in the same
    /// transaction. The update is guarded on `from`: if another request moved
    /// the application first, this returns `Error::Conflict` and nothing is
    /// written.
    async fn transition_stage(
        &self,
        application_id: Uuid,
        from: Stage,
        to: Stage,
        changed_by: Uuid,
    ) -> Result<(Application, ApplicationHistory)>;

    /// List applications inside `scope`, narrowed by `filter`, ordered by
    /// creation time, most recent first.
    async fn list_applications(
        &self,
        scope: ApplicationScope,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationDetail>>;

    /// Full audit trail for an application, oldest first.
    async fn list_history(&self, application_id: Uuid) -> Result<Vec<ApplicationHistory>>;
}

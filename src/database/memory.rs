//! In-process [`ApplicationStore`] backend. Mirrors the conflict semantics of
//! the Postgres implementation (duplicate submissions and stale transitions
//! both surface as `Error::Conflict`) so the HTTP layer can be exercised
//! without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::database::store::ApplicationStore;
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationDetail, ApplicationFilter, ApplicationScope, Stage,
};
use crate::models::application_history::ApplicationHistory;
use crate::models::company::Company;
use crate::models::job::{Job, JobDetail, JobStatus};
use crate::models::user::{Role, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    companies: HashMap<Uuid, Company>,
    jobs: HashMap<Uuid, Job>,
    // insertion order doubles as creation order for list queries
    applications: Vec<Application>,
    history: Vec<ApplicationHistory>,
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_company(&self, name: &str) -> Company {
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        guard.companies.insert(company.id, company.clone());
        company
    }

    pub fn add_user(&self, email: &str, role: Role, company_id: Option<Uuid>) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            role,
            company_id,
            created_at: now,
            updated_at: now,
        };
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        guard.users.insert(user.id, user.clone());
        user
    }

    pub fn add_job(&self, company_id: Uuid, title: &str, status: JobStatus) -> Job {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            company_id,
            title: title.to_string(),
            description: format!("{} role", title),
            status,
            created_at: now,
            updated_at: now,
        };
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        guard.jobs.insert(job.id, job.clone());
        job
    }
}

impl Inner {
    fn detail(&self, application: &Application) -> Result<ApplicationDetail> {
        let job = self
            .jobs
            .get(&application.job_id)
            .ok_or_else(|| Error::Internal("application references missing job".to_string()))?;
        let company = self
            .companies
            .get(&job.company_id)
            .ok_or_else(|| Error::Internal("job references missing company".to_string()))?;
        let candidate = self
            .users
            .get(&application.candidate_id)
            .ok_or_else(|| Error::Internal("application references missing user".to_string()))?;
        Ok(ApplicationDetail {
            application: application.clone(),
            job: job.clone(),
            company: company.clone(),
            candidate: candidate.clone(),
        })
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        Ok(guard.users.get(&id).cloned())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDetail>> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        let Some(job) = guard.jobs.get(&id) else {
            return Ok(None);
        };
        let company = guard
            .companies
            .get(&job.company_id)
            .ok_or_else(|| Error::Internal("job references missing company".to_string()))?;
        Ok(Some(JobDetail {
            job: job.clone(),
            company: company.clone(),
        }))
    }

    async fn list_jobs(&self) -> Result<Vec<JobDetail>> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        let mut jobs: Vec<JobDetail> = guard
            .jobs
            .values()
            .map(|job| {
                let company = guard
                    .companies
                    .get(&job.company_id)
                    .ok_or_else(|| Error::Internal("job references missing company".to_string()))?;
                Ok(JobDetail {
                    job: job.clone(),
                    company: company.clone(),
                })
            })
            .collect::<Result<_>>()?;
        jobs.sort_by(|a, b| b.job.created_at.cmp(&a.job.created_at));
        Ok(jobs)
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<ApplicationDetail>> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        guard
            .applications
            .iter()
            .find(|a| a.id == id)
            .map(|a| guard.detail(a))
            .transpose()
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Option<Application>> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        Ok(guard
            .applications
            .iter()
            .find(|a| a.job_id == job_id && a.candidate_id == candidate_id)
            .cloned())
    }

    async fn create_application(&self, job_id: Uuid, candidate_id: Uuid) -> Result<Application> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        if guard
            .applications
            .iter()
            .any(|a| a.job_id == job_id && a.candidate_id == candidate_id)
        {
            return Err(Error::Conflict(
                "You have already applied for this job".to_string(),
            ));
        }
        let now = Utc::now();
        let application = Application {
            id: Uuid::new_v4(),
            job_id,
            candidate_id,
            stage: Stage::Applied,
            created_at: now,
            updated_at: now,
        };
        guard.applications.push(application.clone());
        guard.history.push(ApplicationHistory {
            id: Uuid::new_v4(),
            application_id: application.id,
            previous_stage: None,
            new_stage: Stage::Applied,
            changed_by_id: candidate_id,
            created_at: now,
        });
        Ok(application)
    }

    async fn transition_stage(
        &self,
        application_id: Uuid,
        from: Stage,
        to: Stage,
        changed_by: Uuid,
    ) -> Result<(Application, ApplicationHistory)> {
        let mut guard = self.inner.lock().expect("store mutex poisoned");
        let now = Utc::now();
        let Some(application) = guard
            .applications
            .iter_mut()
            .find(|a| a.id == application_id && a.stage == from)
        else {
            return Err(Error::Conflict(
                "Application was updated by another request".to_string(),
            ));
        };
        application.stage = to;
        application.updated_at = now;
        let application = application.clone();
        let record = ApplicationHistory {
            id: Uuid::new_v4(),
            application_id,
            previous_stage: Some(from),
            new_stage: to,
            changed_by_id: changed_by,
            created_at: now,
        };
        guard.history.push(record.clone());
        Ok((application, record))
    }

    async fn list_applications(
        &self,
        scope: ApplicationScope,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationDetail>> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        // newest first: applications are stored in creation order
        guard
            .applications
            .iter()
            .rev()
            .filter(|a| match scope {
                ApplicationScope::Candidate(id) => a.candidate_id == id,
                ApplicationScope::Company(id) => guard
                    .jobs
                    .get(&a.job_id)
                    .map(|job| job.company_id == id)
                    .unwrap_or(false),
            })
            .filter(|a| filter.stage.map_or(true, |stage| a.stage == stage))
            .filter(|a| filter.job_id.map_or(true, |job_id| a.job_id == job_id))
            .map(|a| guard.detail(a))
            .collect()
    }

    async fn list_history(&self, application_id: Uuid) -> Result<Vec<ApplicationHistory>> {
        let guard = self.inner.lock().expect("store mutex poisoned");
        Ok(guard
            .history
            .iter()
            .filter(|h| h.application_id == application_id)
            .cloned()
            .collect())
    }
}

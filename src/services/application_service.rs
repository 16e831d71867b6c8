//! Application lifecycle: the stage state machine and the operations that
//! drive it. Stage changes and their history records commit as one unit in
//! the store; notification emails are enqueued only after that commit.

use std::sync::Arc;

use uuid::Uuid;

use crate::database::store::ApplicationStore;
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationDetail, ApplicationFilter, Stage};
use crate::models::application_history::ApplicationHistory;
use crate::models::user::{Actor, Role};
use crate::services::notification_service::{
    application_confirmation_email, stage_update_email, Notifier,
};
use crate::services::visibility;

/// Fixed successor for each stage. `Rejected` is reachable from everywhere
/// via the override in [`is_valid_transition`] and is not listed here unless
/// it is the only successor.
fn successors(stage: Stage) -> &'static [Stage] {
    match stage {
        Stage::Applied => &[Stage::Screening],
        Stage::Screening => &[Stage::Interview],
        Stage::Interview => &[Stage::Offer],
        Stage::Offer => &[Stage::Hired],
        Stage::Hired => &[],
        Stage::Rejected => &[],
    }
}

/// Whether `current -> target` is a legal transition. Rejection is allowed
/// from any stage, including `Hired` and `Rejected` itself; everything else
/// must be the immediate successor. Backward moves and skips are illegal.
pub fn is_valid_transition(current: Stage, target: Stage) -> bool {
    if target == Stage::Rejected {
        return true;
    }
    successors(current).contains(&target)
}

/// Legal next stages in order: the successor set with `Rejected` appended
/// when not already present. Note that this reports `Rejected` as a "next"
/// stage even from `Rejected` itself; callers and tests rely on that
/// observable behavior.
pub fn valid_next_stages(current: Stage) -> Vec<Stage> {
    let mut stages: Vec<Stage> = successors(current).to_vec();
    if !stages.contains(&Stage::Rejected) {
        stages.push(Stage::Rejected);
    }
    stages
}

#[derive(Clone)]
pub struct ApplicationService {
    store: Arc<dyn ApplicationStore>,
    notifier: Arc<dyn Notifier>,
}

impl ApplicationService {
    pub fn new(store: Arc<dyn ApplicationStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Candidate submits an application against an open job. At most one per
    /// (job, candidate): the pre-check gives the friendly message, the store
    /// constraint decides under concurrency.
    pub async fn submit(&self, actor: &Actor, job_id: Uuid) -> Result<Application> {
        if actor.role != Role::Candidate {
            return Err(Error::Forbidden(
                "Only candidates can submit applications".to_string(),
            ));
        }

        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        if job.job.status != crate::models::job::JobStatus::Open {
            return Err(Error::Validation(
                "This job is not open for applications".to_string(),
            ));
        }

        if self
            .store
            .find_application(job_id, actor.id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(
                "You have already applied for this job".to_string(),
            ));
        }

        let candidate = self.store.get_user(actor.id).await?;
        let application = self.store.create_application(job_id, actor.id).await?;
        tracing::info!(
            application_id = %application.id,
            job_id = %job_id,
            candidate_id = %actor.id,
            "application submitted"
        );

        if let Some(candidate) = candidate {
            let email =
                application_confirmation_email(&candidate.email, &job.job.title, &job.company.name);
            if let Err(err) = self.notifier.enqueue(email).await {
                // the submission is already durable; delivery is best-effort
                tracing::error!(application_id = %application.id, error = %err, "failed to queue confirmation email");
            }
        }

        Ok(application)
    }

    pub async fn get(&self, actor: &Actor, application_id: Uuid) -> Result<ApplicationDetail> {
        let detail = self
            .store
            .get_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        visibility::ensure_can_view(actor, &detail)?;
        Ok(detail)
    }

    /// Move an application to `target`. Recruiter-only, company-scoped, and
    /// restricted to the transitions the table allows; the store persists the
    /// stage and its history record atomically.
    pub async fn advance_stage(
        &self,
        actor: &Actor,
        application_id: Uuid,
        target: Stage,
    ) -> Result<(Application, ApplicationHistory)> {
        let detail = self
            .store
            .get_application(application_id)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        if actor.role != Role::Recruiter {
            return Err(Error::Forbidden(
                "Only recruiters can update application stages".to_string(),
            ));
        }
        if !visibility::can_advance(actor, &detail) {
            return Err(Error::Forbidden(
                "You can only manage applications for your company".to_string(),
            ));
        }

        let current = detail.application.stage;
        if !is_valid_transition(current, target) {
            return Err(Error::Validation(format!(
                "Invalid stage transition from {} to {}",
                current, target
            )));
        }

        let (application, record) = self
            .store
            .transition_stage(application_id, current, target, actor.id)
            .await?;
        tracing::info!(
            application_id = %application_id,
            from = %current,
            to = %target,
            changed_by = %actor.id,
            "application stage updated"
        );

        let email = stage_update_email(
            &detail.candidate.email,
            &detail.job.title,
            target,
            &detail.company.name,
        );
        if let Err(err) = self.notifier.enqueue(email).await {
            tracing::error!(application_id = %application_id, error = %err, "failed to queue stage update email");
        }

        Ok((application, record))
    }

    /// Applications visible to the actor, newest first. The visibility scope
    /// is applied before the caller's stage/job filters.
    pub async fn list(
        &self,
        actor: &Actor,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationDetail>> {
        let scope = visibility::scope_filter(actor);
        self.store.list_applications(scope, filter).await
    }

    /// Audit trail for an application the actor can view, oldest first.
    pub async fn history(
        &self,
        actor: &Actor,
        application_id: Uuid,
    ) -> Result<Vec<ApplicationHistory>> {
        self.get(actor, application_id).await?;
        self.store.list_history(application_id).await
    }

    /// Legal next stages for an application the actor can view.
    pub async fn valid_next_stages_for(
        &self,
        actor: &Actor,
        application_id: Uuid,
    ) -> Result<Vec<Stage>> {
        let detail = self.get(actor, application_id).await?;
        Ok(valid_next_stages(detail.application.stage))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use mockall::predicate::eq;

    use super::*;
    use crate::database::store::MockApplicationStore;
    use crate::models::company::Company;
    use crate::models::job::{Job, JobDetail, JobStatus};
    use crate::models::user::User;
    use crate::services::notification_service::MockNotifier;

    #[test]
    fn allows_the_forward_chain() {
        assert!(is_valid_transition(Stage::Applied, Stage::Screening));
        assert!(is_valid_transition(Stage::Screening, Stage::Interview));
        assert!(is_valid_transition(Stage::Interview, Stage::Offer));
        assert!(is_valid_transition(Stage::Offer, Stage::Hired));
    }

    #[test]
    fn allows_rejection_from_any_stage() {
        assert!(is_valid_transition(Stage::Applied, Stage::Rejected));
        assert!(is_valid_transition(Stage::Screening, Stage::Rejected));
        assert!(is_valid_transition(Stage::Interview, Stage::Rejected));
        assert!(is_valid_transition(Stage::Offer, Stage::Rejected));
        assert!(is_valid_transition(Stage::Hired, Stage::Rejected));
        assert!(is_valid_transition(Stage::Rejected, Stage::Rejected));
    }

    #[test]
    fn rejects_skips_and_backward_moves() {
        assert!(!is_valid_transition(Stage::Applied, Stage::Interview));
        assert!(!is_valid_transition(Stage::Applied, Stage::Offer));
        assert!(!is_valid_transition(Stage::Screening, Stage::Hired));
        assert!(!is_valid_transition(Stage::Interview, Stage::Screening));
        assert!(!is_valid_transition(Stage::Hired, Stage::Applied));
        assert!(!is_valid_transition(Stage::Rejected, Stage::Screening));
    }

    #[test]
    fn reports_next_stages_with_rejected_appended() {
        assert_eq!(
            valid_next_stages(Stage::Applied),
            vec![Stage::Screening, Stage::Rejected]
        );
        assert_eq!(
            valid_next_stages(Stage::Screening),
            vec![Stage::Interview, Stage::Rejected]
        );
        assert_eq!(
            valid_next_stages(Stage::Interview),
            vec![Stage::Offer, Stage::Rejected]
        );
        assert_eq!(
            valid_next_stages(Stage::Offer),
            vec![Stage::Hired, Stage::Rejected]
        );
        assert_eq!(valid_next_stages(Stage::Hired), vec![Stage::Rejected]);
        // terminal state still reports the self-loop; intentional
        assert_eq!(valid_next_stages(Stage::Rejected), vec![Stage::Rejected]);
    }

    struct Fixture {
        company: Company,
        job: Job,
        candidate: User,
        recruiter: Actor,
    }

    fn fixture() -> Fixture {
        let now = Utc::now();
        let company = Company {
            id: Uuid::new_v4(),
            name: "Initech".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let job = Job {
            id: Uuid::new_v4(),
            company_id: company.id,
            title: "Backend Engineer".to_string(),
            description: "Rust services".to_string(),
            status: JobStatus::Open,
            created_at: now,
            updated_at: now,
        };
        let candidate = User {
            id: Uuid::new_v4(),
            email: "candidate@example.com".to_string(),
            role: Role::Candidate,
            company_id: None,
            created_at: now,
            updated_at: now,
        };
        let recruiter = Actor {
            id: Uuid::new_v4(),
            role: Role::Recruiter,
            company_id: Some(company.id),
        };
        Fixture {
            company,
            job,
            candidate,
            recruiter,
        }
    }

    fn job_detail(fx: &Fixture) -> JobDetail {
        JobDetail {
            job: fx.job.clone(),
            company: fx.company.clone(),
        }
    }

    fn application(fx: &Fixture, stage: Stage) -> Application {
        let now = Utc::now();
        Application {
            id: Uuid::new_v4(),
            job_id: fx.job.id,
            candidate_id: fx.candidate.id,
            stage,
            created_at: now,
            updated_at: now,
        }
    }

    fn application_detail(fx: &Fixture, stage: Stage) -> ApplicationDetail {
        ApplicationDetail {
            application: application(fx, stage),
            job: fx.job.clone(),
            company: fx.company.clone(),
            candidate: fx.candidate.clone(),
        }
    }

    fn service(store: MockApplicationStore, notifier: MockNotifier) -> ApplicationService {
        ApplicationService::new(Arc::new(store), Arc::new(notifier))
    }

    #[tokio::test]
    async fn submit_creates_application_and_queues_one_confirmation() {
        let fx = fixture();
        let actor = Actor {
            id: fx.candidate.id,
            role: Role::Candidate,
            company_id: None,
        };

        let mut store = MockApplicationStore::new();
        let detail = job_detail(&fx);
        store
            .expect_get_job()
            .with(eq(fx.job.id))
            .returning(move |_| Ok(Some(detail.clone())));
        store
            .expect_find_application()
            .with(eq(fx.job.id), eq(fx.candidate.id))
            .returning(|_, _| Ok(None));
        let candidate = fx.candidate.clone();
        store
            .expect_get_user()
            .with(eq(fx.candidate.id))
            .returning(move |_| Ok(Some(candidate.clone())));
        let created = application(&fx, Stage::Applied);
        let returned = created.clone();
        store
            .expect_create_application()
            .with(eq(fx.job.id), eq(fx.candidate.id))
            .times(1)
            .returning(move |_, _| Ok(returned.clone()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_enqueue()
            .withf(|email| {
                email.to == "candidate@example.com"
                    && email.subject == "Application Received for Backend Engineer at Initech"
            })
            .times(1)
            .returning(|_| Ok(()));

        let result = service(store, notifier)
            .submit(&actor, fx.job.id)
            .await
            .expect("submit succeeds");
        assert_eq!(result.stage, Stage::Applied);
        assert_eq!(result.id, created.id);
    }

    #[tokio::test]
    async fn submit_rejects_non_candidates() {
        let fx = fixture();
        let store = MockApplicationStore::new();
        let notifier = MockNotifier::new();

        let err = service(store, notifier)
            .submit(&fx.recruiter, fx.job.id)
            .await
            .expect_err("recruiters cannot apply");
        assert!(matches!(err, Error::Forbidden(_)));
    }

    #[tokio::test]
    async fn submit_rejects_missing_job() {
        let fx = fixture();
        let actor = Actor {
            id: fx.candidate.id,
            role: Role::Candidate,
            company_id: None,
        };
        let mut store = MockApplicationStore::new();
        store.expect_get_job().returning(|_| Ok(None));

        let err = service(store, MockNotifier::new())
            .submit(&actor, Uuid::new_v4())
            .await
            .expect_err("unknown job");
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn submit_rejects_closed_job() {
        let mut fx = fixture();
        fx.job.status = JobStatus::Closed;
        let actor = Actor {
            id: fx.candidate.id,
            role: Role::Candidate,
            company_id: None,
        };
        let mut store = MockApplicationStore::new();
        let detail = job_detail(&fx);
        store
            .expect_get_job()
            .returning(move |_| Ok(Some(detail.clone())));

        let err = service(store, MockNotifier::new())
            .submit(&actor, fx.job.id)
            .await
            .expect_err("closed job");
        match err {
            Error::Validation(msg) => assert_eq!(msg, "This job is not open for applications"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn submit_rejects_duplicates_without_queueing_email() {
        let fx = fixture();
        let actor = Actor {
            id: fx.candidate.id,
            role: Role::Candidate,
            company_id: None,
        };
        let mut store = MockApplicationStore::new();
        let detail = job_detail(&fx);
        store
            .expect_get_job()
            .returning(move |_| Ok(Some(detail.clone())));
        let existing = application(&fx, Stage::Applied);
        store
            .expect_find_application()
            .returning(move |_, _| Ok(Some(existing.clone())));
        let mut notifier = MockNotifier::new();
        notifier.expect_enqueue().times(0);

        let err = service(store, notifier)
            .submit(&actor, fx.job.id)
            .await
            .expect_err("duplicate application");
        match err {
            Error::Conflict(msg) => assert_eq!(msg, "You have already applied for this job"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn advance_persists_transition_and_queues_one_email() {
        let fx = fixture();
        let detail = application_detail(&fx, Stage::Applied);
        let application_id = detail.application.id;

        let mut store = MockApplicationStore::new();
        let loaded = detail.clone();
        store
            .expect_get_application()
            .with(eq(application_id))
            .returning(move |_| Ok(Some(loaded.clone())));
        let mut updated = detail.application.clone();
        updated.stage = Stage::Screening;
        let record = ApplicationHistory {
            id: Uuid::new_v4(),
            application_id,
            previous_stage: Some(Stage::Applied),
            new_stage: Stage::Screening,
            changed_by_id: fx.recruiter.id,
            created_at: Utc::now(),
        };
        let returned = (updated, record);
        store
            .expect_transition_stage()
            .with(
                eq(application_id),
                eq(Stage::Applied),
                eq(Stage::Screening),
                eq(fx.recruiter.id),
            )
            .times(1)
            .returning(move |_, _, _, _| Ok(returned.clone()));

        let mut notifier = MockNotifier::new();
        notifier
            .expect_enqueue()
            .withf(|email| {
                email.to == "candidate@example.com"
                    && email.subject == "Application Status Update for Backend Engineer"
                    && email.text.contains("Screening")
            })
            .times(1)
            .returning(|_| Ok(()));

        let (application, record) = service(store, notifier)
            .advance_stage(&fx.recruiter, application_id, Stage::Screening)
            .await
            .expect("advance succeeds");
        assert_eq!(application.stage, Stage::Screening);
        assert_eq!(record.previous_stage, Some(Stage::Applied));
        assert_eq!(record.new_stage, Stage::Screening);
    }

    #[tokio::test]
    async fn advance_rejects_skip_without_touching_the_store() {
        let fx = fixture();
        let detail = application_detail(&fx, Stage::Screening);
        let application_id = detail.application.id;

        let mut store = MockApplicationStore::new();
        let loaded = detail.clone();
        store
            .expect_get_application()
            .returning(move |_| Ok(Some(loaded.clone())));
        store.expect_transition_stage().times(0);
        let mut notifier = MockNotifier::new();
        notifier.expect_enqueue().times(0);

        let err = service(store, notifier)
            .advance_stage(&fx.recruiter, application_id, Stage::Hired)
            .await
            .expect_err("skip rejected");
        match err {
            Error::Validation(msg) => {
                assert_eq!(msg, "Invalid stage transition from Screening to Hired")
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn advance_is_recruiter_only() {
        let fx = fixture();
        let detail = application_detail(&fx, Stage::Applied);
        let application_id = detail.application.id;
        let manager = Actor {
            id: Uuid::new_v4(),
            role: Role::HiringManager,
            company_id: Some(fx.company.id),
        };

        let mut store = MockApplicationStore::new();
        let loaded = detail.clone();
        store
            .expect_get_application()
            .returning(move |_| Ok(Some(loaded.clone())));
        store.expect_transition_stage().times(0);

        let err = service(store, MockNotifier::new())
            .advance_stage(&manager, application_id, Stage::Screening)
            .await
            .expect_err("managers cannot advance");
        match err {
            Error::Forbidden(msg) => {
                assert_eq!(msg, "Only recruiters can update application stages")
            }
            other => panic!("expected forbidden, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn advance_rejects_other_companies_with_scope_error() {
        let fx = fixture();
        let detail = application_detail(&fx, Stage::Applied);
        let application_id = detail.application.id;
        let outsider = Actor {
            id: Uuid::new_v4(),
            role: Role::Recruiter,
            company_id: Some(Uuid::new_v4()),
        };

        let mut store = MockApplicationStore::new();
        let loaded = detail.clone();
        store
            .expect_get_application()
            .returning(move |_| Ok(Some(loaded.clone())));
        store.expect_transition_stage().times(0);

        let err = service(store, MockNotifier::new())
            .advance_stage(&outsider, application_id, Stage::Screening)
            .await
            .expect_err("wrong company");
        match err {
            Error::Forbidden(msg) => {
                assert_eq!(msg, "You can only manage applications for your company")
            }
            other => panic!("expected forbidden, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn get_applies_the_visibility_policy() {
        let fx = fixture();
        let detail = application_detail(&fx, Stage::Applied);
        let application_id = detail.application.id;
        let other_candidate = Actor {
            id: Uuid::new_v4(),
            role: Role::Candidate,
            company_id: None,
        };

        let mut store = MockApplicationStore::new();
        let loaded = detail.clone();
        store
            .expect_get_application()
            .returning(move |_| Ok(Some(loaded.clone())));

        let svc = service(store, MockNotifier::new());
        let err = svc
            .get(&other_candidate, application_id)
            .await
            .expect_err("foreign application");
        assert!(matches!(err, Error::Forbidden(_)));

        let owner = Actor {
            id: fx.candidate.id,
            role: Role::Candidate,
            company_id: None,
        };
        let fetched = svc.get(&owner, application_id).await.expect("own application");
        assert_eq!(fetched.application.id, application_id);
    }
}

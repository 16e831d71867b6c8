//! Role- and company-scoped visibility rules, evaluated against
//! `{actor, application}`. Every read and write path goes through this module
//! instead of re-deriving company matching per operation.

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::application::{ApplicationDetail, ApplicationScope};
use crate::models::user::{Actor, Role};

/// Whether the actor may read this application at all.
pub fn can_view(actor: &Actor, detail: &ApplicationDetail) -> bool {
    ensure_can_view(actor, detail).is_ok()
}

/// Like [`can_view`], but with the caller-facing denial reason.
pub fn ensure_can_view(actor: &Actor, detail: &ApplicationDetail) -> Result<()> {
    match actor.role {
        Role::Candidate => {
            if detail.application.candidate_id != actor.id {
                return Err(Error::Forbidden(
                    "You can only view your own applications".to_string(),
                ));
            }
        }
        Role::Recruiter | Role::HiringManager => {
            if actor.company_id != Some(detail.job.company_id) {
                return Err(Error::Forbidden(
                    "You can only view applications for your company".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Stage changes are recruiter-only, and only inside the recruiter's company.
pub fn can_advance(actor: &Actor, detail: &ApplicationDetail) -> bool {
    actor.role == Role::Recruiter && actor.company_id == Some(detail.job.company_id)
}

/// The scope applied to list queries before any caller-supplied filter.
/// Company-scoped actors without a company (rejected at the auth boundary)
/// fall back to the nil id, which matches nothing.
pub fn scope_filter(actor: &Actor) -> ApplicationScope {
    match actor.role {
        Role::Candidate => ApplicationScope::Candidate(actor.id),
        Role::Recruiter | Role::HiringManager => {
            ApplicationScope::Company(actor.company_id.unwrap_or_else(Uuid::nil))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::application::{Application, Stage};
    use crate::models::company::Company;
    use crate::models::job::{Job, JobStatus};
    use crate::models::user::User;

    fn actor(role: Role, company_id: Option<Uuid>) -> Actor {
        Actor {
            id: Uuid::new_v4(),
            role,
            company_id,
        }
    }

    fn detail(candidate_id: Uuid, company_id: Uuid) -> ApplicationDetail {
        let now = Utc::now();
        let job_id = Uuid::new_v4();
        ApplicationDetail {
            application: Application {
                id: Uuid::new_v4(),
                job_id,
                candidate_id,
                stage: Stage::Applied,
                created_at: now,
                updated_at: now,
            },
            job: Job {
                id: job_id,
                company_id,
                title: "Backend Engineer".to_string(),
                description: "Rust services".to_string(),
                status: JobStatus::Open,
                created_at: now,
                updated_at: now,
            },
            company: Company {
                id: company_id,
                name: "Initech".to_string(),
                description: None,
                created_at: now,
                updated_at: now,
            },
            candidate: User {
                id: candidate_id,
                email: "candidate@example.com".to_string(),
                role: Role::Candidate,
                company_id: None,
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn candidate_sees_only_their_own_application() {
        let company = Uuid::new_v4();
        let owner = actor(Role::Candidate, None);
        let other = actor(Role::Candidate, None);
        let detail = detail(owner.id, company);

        assert!(can_view(&owner, &detail));
        assert!(!can_view(&other, &detail));
    }

    #[test]
    fn company_staff_see_their_company_only() {
        let company = Uuid::new_v4();
        let other_company = Uuid::new_v4();
        let candidate_id = Uuid::new_v4();
        let detail = detail(candidate_id, company);

        let recruiter = actor(Role::Recruiter, Some(company));
        let manager = actor(Role::HiringManager, Some(company));
        let outsider = actor(Role::Recruiter, Some(other_company));

        assert!(can_view(&recruiter, &detail));
        assert!(can_view(&manager, &detail));
        assert!(!can_view(&outsider, &detail));
    }

    #[test]
    fn only_same_company_recruiters_can_advance() {
        let company = Uuid::new_v4();
        let detail = detail(Uuid::new_v4(), company);

        assert!(can_advance(&actor(Role::Recruiter, Some(company)), &detail));
        assert!(!can_advance(
            &actor(Role::Recruiter, Some(Uuid::new_v4())),
            &detail
        ));
        assert!(!can_advance(
            &actor(Role::HiringManager, Some(company)),
            &detail
        ));
        assert!(!can_advance(&actor(Role::Candidate, None), &detail));
    }

    #[test]
    fn scope_filter_never_yields_a_global_view() {
        let candidate = actor(Role::Candidate, None);
        assert_eq!(
            scope_filter(&candidate),
            ApplicationScope::Candidate(candidate.id)
        );

        let company = Uuid::new_v4();
        assert_eq!(
            scope_filter(&actor(Role::Recruiter, Some(company))),
            ApplicationScope::Company(company)
        );
        assert_eq!(
            scope_filter(&actor(Role::HiringManager, Some(company))),
            ApplicationScope::Company(company)
        );
    }
}

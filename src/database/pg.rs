use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
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

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const JOB_DETAIL_COLUMNS: &str = r#"
    j.id, j.company_id, j.title, j.description, j.status, j.created_at, j.updated_at,
    c.name AS company_name, c.description AS company_description,
    c.created_at AS company_created_at, c.updated_at AS company_updated_at
"#;

const APPLICATION_DETAIL_COLUMNS: &str = r#"
    a.id, a.job_id, a.candidate_id, a.stage, a.created_at, a.updated_at,
    j.title AS job_title, j.description AS job_description, j.status AS job_status,
    j.company_id, j.created_at AS job_created_at, j.updated_at AS job_updated_at,
    c.name AS company_name, c.description AS company_description,
    c.created_at AS company_created_at, c.updated_at AS company_updated_at,
    u.email AS candidate_email, u.role AS candidate_role, u.company_id AS candidate_company_id,
    u.created_at AS candidate_created_at, u.updated_at AS candidate_updated_at
"#;

fn job_detail_from_row(row: &PgRow) -> Result<JobDetail> {
    let company_id: Uuid = row.try_get("company_id")?;
    Ok(JobDetail {
        job: Job {
            id: row.try_get("id")?,
            company_id,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        },
        company: Company {
            id: company_id,
            name: row.try_get("company_name")?,
            description: row.try_get("company_description")?,
            created_at: row.try_get("company_created_at")?,
            updated_at: row.try_get("company_updated_at")?,
        },
    })
}

fn application_detail_from_row(row: &PgRow) -> Result<ApplicationDetail> {
    let job_id: Uuid = row.try_get("job_id")?;
    let candidate_id: Uuid = row.try_get("candidate_id")?;
    let company_id: Uuid = row.try_get("company_id")?;
    Ok(ApplicationDetail {
        application: Application {
            id: row.try_get("id")?,
            job_id,
            candidate_id,
            stage: row.try_get("stage")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        },
        job: Job {
            id: job_id,
            company_id,
            title: row.try_get("job_title")?,
            description: row.try_get("job_description")?,
            status: row.try_get::<JobStatus, _>("job_status")?,
            created_at: row.try_get("job_created_at")?,
            updated_at: row.try_get("job_updated_at")?,
        },
        company: Company {
            id: company_id,
            name: row.try_get("company_name")?,
            description: row.try_get("company_description")?,
            created_at: row.try_get("company_created_at")?,
            updated_at: row.try_get("company_updated_at")?,
        },
        candidate: User {
            id: candidate_id,
            email: row.try_get("candidate_email")?,
            role: row.try_get::<Role, _>("candidate_role")?,
            company_id: row.try_get("candidate_company_id")?,
            created_at: row.try_get::<DateTime<Utc>, _>("candidate_created_at")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("candidate_updated_at")?,
        },
    })
}

#[async_trait]
impl ApplicationStore for PgStore {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, role, company_id, created_at, updated_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobDetail>> {
        let sql = format!(
            "SELECT {JOB_DETAIL_COLUMNS} FROM jobs j JOIN companies c ON c.id = j.company_id WHERE j.id = $1"
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(job_detail_from_row).transpose()
    }

    async fn list_jobs(&self) -> Result<Vec<JobDetail>> {
        let sql = format!(
            "SELECT {JOB_DETAIL_COLUMNS} FROM jobs j JOIN companies c ON c.id = j.company_id ORDER BY j.created_at DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(job_detail_from_row).collect()
    }

    async fn get_application(&self, id: Uuid) -> Result<Option<ApplicationDetail>> {
        let sql = format!(
            r#"SELECT {APPLICATION_DETAIL_COLUMNS}
               FROM applications a
               JOIN jobs j ON j.id = a.job_id
               JOIN companies c ON c.id = j.company_id
               JOIN users u ON u.id = a.candidate_id
               WHERE a.id = $1"#
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(application_detail_from_row).transpose()
    }

    async fn find_application(
        &self,
        job_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<Option<Application>> {
        let application = sqlx::query_as::<_, Application>(
            r#"SELECT id, job_id, candidate_id, stage, created_at, updated_at
               FROM applications WHERE job_id = $1 AND candidate_id = $2"#,
        )
        .bind(job_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(application)
    }

    async fn create_application(&self, job_id: Uuid, candidate_id: Uuid) -> Result<Application> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Application>(
            r#"INSERT INTO applications (job_id, candidate_id)
               VALUES ($1, $2)
               ON CONFLICT (job_id, candidate_id) DO NOTHING
               RETURNING id, job_id, candidate_id, stage, created_at, updated_at"#,
        )
        .bind(job_id)
        .bind(candidate_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(application) = row else {
            return Err(Error::Conflict(
                "You have already applied for this job".to_string(),
            ));
        };

        sqlx::query(
            r#"INSERT INTO application_history (application_id, new_stage, changed_by_id)
               VALUES ($1, $2, $3)"#,
        )
        .bind(application.id)
        .bind(Stage::Applied)
        .bind(candidate_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(application)
    }

    async fn transition_stage(
        &self,
        application_id: Uuid,
        from: Stage,
        to: Stage,
        changed_by: Uuid,
    ) -> Result<(Application, ApplicationHistory)> {
        let mut tx = self.pool.begin().await?;

        // Guarded on the expected current stage: a concurrent transition makes
        // this match zero rows and the whole unit rolls back.
        let row = sqlx::query_as::<_, Application>(
            r#"UPDATE applications SET stage = $1, updated_at = NOW()
               WHERE id = $2 AND stage = $3
               RETURNING id, job_id, candidate_id, stage, created_at, updated_at"#,
        )
        .bind(to)
        .bind(application_id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(application) = row else {
            return Err(Error::Conflict(
                "Application was updated by another request".to_string(),
            ));
        };

        let record = sqlx::query_as::<_, ApplicationHistory>(
            r#"INSERT INTO application_history (application_id, previous_stage, new_stage, changed_by_id)
               VALUES ($1, $2, $3, $4)
               RETURNING id, application_id, previous_stage, new_stage, changed_by_id, created_at"#,
        )
        .bind(application_id)
        .bind(from)
        .bind(to)
        .bind(changed_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((application, record))
    }

    async fn list_applications(
        &self,
        scope: ApplicationScope,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationDetail>> {
        let mut sql = format!(
            r#"SELECT {APPLICATION_DETAIL_COLUMNS}
               FROM applications a
               JOIN jobs j ON j.id = a.job_id
               JOIN companies c ON c.id = j.company_id
               JOIN users u ON u.id = a.candidate_id"#
        );

        let scope_id = match scope {
            ApplicationScope::Candidate(id) => {
                sql.push_str(" WHERE a.candidate_id = $1");
                id
            }
            ApplicationScope::Company(id) => {
                sql.push_str(" WHERE j.company_id = $1");
                id
            }
        };

        let mut next_param = 2;
        if filter.stage.is_some() {
            sql.push_str(&format!(" AND a.stage = ${next_param}"));
            next_param += 1;
        }
        if filter.job_id.is_some() {
            sql.push_str(&format!(" AND a.job_id = ${next_param}"));
        }
        sql.push_str(" ORDER BY a.created_at DESC");

        let mut query = sqlx::query(&sql).bind(scope_id);
        if let Some(stage) = filter.stage {
            query = query.bind(stage);
        }
        if let Some(job_id) = filter.job_id {
            query = query.bind(job_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(application_detail_from_row).collect()
    }

    async fn list_history(&self, application_id: Uuid) -> Result<Vec<ApplicationHistory>> {
        let records = sqlx::query_as::<_, ApplicationHistory>(
            r#"SELECT id, application_id, previous_stage, new_stage, changed_by_id, created_at
               FROM application_history WHERE application_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}

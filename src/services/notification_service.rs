//! Outbound email notifications. The lifecycle service hands finished
//! [`EmailMessage`]s to a [`Notifier`] only after its own state change has
//! committed; delivery runs in a decoupled worker loop and is best-effort.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::Stage;
use crate::models::email_notification::{EmailMessage, EmailNotification};
use crate::utils::crypto::sign_payload;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Queue a message for asynchronous delivery. Must only be called after
    /// the triggering state change is durable.
    async fn enqueue(&self, email: EmailMessage) -> Result<()>;
}

pub fn application_confirmation_email(
    to: &str,
    job_title: &str,
    company_name: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Application Received for {} at {}", job_title, company_name),
        text: format!(
            "Thank you for applying for the position of {} at {}. We have received your application and will review it shortly.",
            job_title, company_name
        ),
        html: format!(
            "<h2>Application Received</h2>\
             <p>Dear Candidate,</p>\
             <p>Thank you for applying for the position of <strong>{}</strong> at <strong>{}</strong>.</p>\
             <p>We have received your application and will review it shortly. You will be notified of any updates to your application status.</p>\
             <p>Best regards,<br/>{} Recruitment Team</p>",
            job_title, company_name, company_name
        ),
    }
}

/// Recruiter-side alert about a fresh submission. Not wired to any route
/// today; kept for the dispatcher contract.
pub fn new_application_email(to: &str, candidate_email: &str, job_title: &str) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("New Application for {}", job_title),
        text: format!(
            "A new application has been submitted by {} for the position of {}.",
            candidate_email, job_title
        ),
        html: format!(
            "<h2>New Job Application</h2>\
             <p>Hello Recruiter,</p>\
             <p>A new application has been submitted by <strong>{}</strong> for the position of <strong>{}</strong>.</p>\
             <p>Please review the application in the system.</p>\
             <p>Best regards,<br/>ATS System</p>",
            candidate_email, job_title
        ),
    }
}

pub fn stage_update_email(
    to: &str,
    job_title: &str,
    new_stage: Stage,
    company_name: &str,
) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: format!("Application Status Update for {}", job_title),
        text: format!(
            "Your application for {} at {} has been updated to {}.",
            job_title, company_name, new_stage
        ),
        html: format!(
            "<h2>Application Status Update</h2>\
             <p>Dear User,</p>\
             <p>Your application for the position of <strong>{}</strong> at <strong>{}</strong> has been updated to <strong>{}</strong>.</p>\
             <p>If you have any questions, please contact the recruitment team.</p>\
             <p>Best regards,<br/>{} Recruitment Team</p>",
            job_title, company_name, new_stage, company_name
        ),
    }
}

/// Durable outbox over Postgres plus the delivery worker. `enqueue` inserts a
/// pending row; `run_once` picks one up and POSTs it to the email gateway,
/// retrying failures with exponential backoff up to `max_attempts`.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    gateway_url: String,
}

impl NotificationService {
    pub fn new(pool: PgPool, gateway_url: String) -> Self {
        Self {
            pool,
            client: Client::new(),
            gateway_url,
        }
    }

    pub async fn deliver_once(&self, notification_id: Uuid) -> Result<()> {
        let email = sqlx::query_as::<_, EmailNotification>(
            r#"SELECT id, to_address, subject, text_body, html_body, status, attempts,
                      max_attempts, next_retry_at, http_status, response_body, created_at, updated_at
               FROM email_notifications WHERE id = $1"#,
        )
        .bind(notification_id)
        .fetch_one(&self.pool)
        .await?;

        let config = crate::config::get_config();
        let payload = serde_json::json!({
            "to": email.to_address,
            "from": config.email_from,
            "subject": email.subject,
            "text": email.text_body,
            "html": email.html_body,
        });
        let body = serde_json::to_vec(&payload)?;
        let signature = sign_payload(&config.webhook_secret, &body);

        let res = self
            .client
            .post(&self.gateway_url)
            .header("X-Notification-Signature", signature)
            .json(&payload)
            .send()
            .await;
        match res {
            Ok(resp) => {
                let status = resp.status().as_u16() as i32;
                let body = resp.text().await.unwrap_or_default();
                sqlx::query(
                    r#"UPDATE email_notifications
                       SET http_status = $1, response_body = $2,
                           status = CASE WHEN $1 BETWEEN 200 AND 299 THEN 'sent' ELSE 'failed' END,
                           attempts = attempts + 1, updated_at = NOW()
                       WHERE id = $3"#,
                )
                .bind(status)
                .bind(body)
                .bind(email.id)
                .execute(&self.pool)
                .await?;
            }
            Err(err) => {
                sqlx::query(
                    r#"UPDATE email_notifications
                       SET response_body = $1, status = 'failed',
                           attempts = attempts + 1, updated_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(format!("{}", err))
                .bind(email.id)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }

    /// Deliver one due outbox row. Returns `false` when the queue is idle.
    pub async fn run_once(&self) -> Result<bool> {
        let row_opt = sqlx::query(
            r#"SELECT id FROM email_notifications
               WHERE status = 'pending' AND (next_retry_at IS NULL OR next_retry_at <= NOW())
               ORDER BY created_at ASC
               FOR UPDATE SKIP LOCKED
               LIMIT 1"#,
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row_opt else { return Ok(false) };
        let id: Uuid = row.try_get("id")?;

        let _ = self.deliver_once(id).await;

        let row2 = sqlx::query(
            r#"SELECT attempts, max_attempts, status FROM email_notifications WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        let attempts: i32 = row2.try_get("attempts")?;
        let max_attempts: i32 = row2.try_get("max_attempts")?;
        let status: String = row2.try_get("status")?;

        if status == "failed" && attempts < max_attempts {
            sqlx::query(
                r#"UPDATE email_notifications
                   SET status = 'pending',
                       next_retry_at = NOW() + make_interval(secs => LEAST(3600, 30 * power(2::float, GREATEST(0, attempts-1))::int))
                   WHERE id = $1"#,
            )
            .bind(id)
            .execute(&self.pool)
            .await?;
        }

        Ok(true)
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn enqueue(&self, email: EmailMessage) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO email_notifications (to_address, subject, text_body, html_body, status)
               VALUES ($1, $2, $3, $4, 'pending')"#,
        )
        .bind(&email.to)
        .bind(&email.subject)
        .bind(&email.text)
        .bind(&email.html)
        .execute(&self.pool)
        .await?;
        tracing::info!(to = %email.to, subject = %email.subject, "queued notification email");
        Ok(())
    }
}

/// In-process notifier that records what was enqueued.
#[derive(Default, Clone)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn enqueue(&self, email: EmailMessage) -> Result<()> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_update_email_names_job_company_and_stage() {
        let email = stage_update_email(
            "candidate@example.com",
            "Backend Engineer",
            Stage::Interview,
            "Initech",
        );
        assert_eq!(email.to, "candidate@example.com");
        assert_eq!(email.subject, "Application Status Update for Backend Engineer");
        assert!(email.text.contains("Initech"));
        assert!(email.text.contains("Interview"));
        assert!(email.html.contains("<strong>Interview</strong>"));
    }

    #[test]
    fn confirmation_email_addresses_the_candidate() {
        let email =
            application_confirmation_email("candidate@example.com", "Backend Engineer", "Initech");
        assert_eq!(
            email.subject,
            "Application Received for Backend Engineer at Initech"
        );
        assert!(email.text.starts_with("Thank you for applying"));
    }
}

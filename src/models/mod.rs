pub mod application;
pub mod application_history;
pub mod company;
pub mod email_notification;
pub mod job;
pub mod user;

//! SMS notifications for issue workflow events
//!
//! Delivery goes through an [`SmsGateway`]. The bundled [`LogSmsGateway`]
//! only writes the message to the log; a real provider implements the same
//! trait. A [`Notifier`] is built once at startup and handed to request
//! handlers through application state.

use std::sync::Arc;
use tracing::{info, warn};

use crate::db::models::IssueStatus;

/// Outbound SMS transport
pub trait SmsGateway: Send + Sync {
    /// Deliver `message` to `recipient`; `true` on success
    fn send(&self, recipient: &str, message: &str) -> bool;
}

/// Gateway that records messages in the log instead of sending them
#[derive(Debug, Clone)]
pub struct LogSmsGateway {
    enabled: bool,
}

impl LogSmsGateway {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl SmsGateway for LogSmsGateway {
    fn send(&self, recipient: &str, message: &str) -> bool {
        if !self.enabled {
            return false;
        }
        info!(target: "notifications", "SMS to {}: {}", recipient, message);
        true
    }
}

/// Issue fields needed to compose notifications
#[derive(Debug, Clone)]
pub struct IssueSummary {
    pub id: i64,
    pub title: String,
    pub status: IssueStatus,
    pub needs_manual_review: bool,
}

/// Workflow event that triggers notifications
#[derive(Debug, Clone)]
pub enum IssueEvent {
    /// Issue submitted by a citizen
    Created {
        issue: IssueSummary,
        citizen_phone: String,
    },
    /// Issue assigned to a field worker
    Assigned {
        issue: IssueSummary,
        citizen_phone: String,
        citizen_address: Option<String>,
        department_name: String,
        worker_name: String,
        worker_phone: String,
    },
    /// Issue status changed
    StatusUpdated {
        issue: IssueSummary,
        citizen_phone: String,
    },
}

/// First `max_chars` characters of `text` followed by `...`
fn truncate(text: &str, max_chars: usize) -> String {
    let head: String = text.chars().take(max_chars).collect();
    format!("{}...", head)
}

/// Composes and sends workflow notifications
#[derive(Clone)]
pub struct Notifier {
    gateway: Arc<dyn SmsGateway>,
    admin_phone: String,
}

impl Notifier {
    pub fn new(gateway: Arc<dyn SmsGateway>, admin_phone: impl Into<String>) -> Self {
        Self {
            gateway,
            admin_phone: admin_phone.into(),
        }
    }

    /// Notifier backed by the logging gateway
    pub fn logging(enabled: bool, admin_phone: impl Into<String>) -> Self {
        Self::new(Arc::new(LogSmsGateway::new(enabled)), admin_phone)
    }

    pub fn issue_created_message(title: &str, issue_id: i64) -> String {
        format!(
            "Your issue '{}' has been submitted successfully. Issue ID: #{}. You will receive updates on progress.",
            truncate(title, 50),
            issue_id
        )
    }

    pub fn issue_assigned_message(title: &str, department_name: &str, worker_name: &str) -> String {
        format!(
            "Your issue '{}' has been assigned to {} from {}. Work will begin soon.",
            truncate(title, 30),
            worker_name,
            department_name
        )
    }

    pub fn status_update_message(title: &str, status: IssueStatus) -> String {
        let status_text = match status {
            IssueStatus::Assigned => "has been assigned to a worker".to_string(),
            IssueStatus::InProgress => "work has started".to_string(),
            IssueStatus::Resolved => "has been resolved".to_string(),
            IssueStatus::Rejected => "has been reviewed and rejected".to_string(),
            other => format!("status has been updated to {}", other),
        };
        format!(
            "Update: Your issue '{}' {}. Thank you for reporting.",
            truncate(title, 40),
            status_text
        )
    }

    pub fn worker_assignment_message(title: &str, issue_id: i64, address: &str) -> String {
        format!(
            "New assignment: Issue #{} - '{}' at {}. Please review and begin work.",
            issue_id,
            truncate(title, 40),
            truncate(address, 50)
        )
    }

    pub fn admin_new_issue_message(title: &str, issue_id: i64, needs_review: bool) -> String {
        if needs_review {
            format!(
                "New issue #{} needs manual review: '{}'. Please assign to appropriate department.",
                issue_id,
                truncate(title, 40)
            )
        } else {
            format!("New issue #{} auto-assigned: '{}'", issue_id, truncate(title, 40))
        }
    }

    /// Send every notification for `event`
    ///
    /// Returns the number of messages the gateway accepted.
    pub fn dispatch(&self, event: &IssueEvent) -> usize {
        let outcomes = match event {
            IssueEvent::Created {
                issue,
                citizen_phone,
            } => {
                let mut sent = vec![self.gateway.send(
                    citizen_phone,
                    &Self::issue_created_message(&issue.title, issue.id),
                )];
                if issue.needs_manual_review {
                    sent.push(self.gateway.send(
                        &self.admin_phone,
                        &Self::admin_new_issue_message(&issue.title, issue.id, true),
                    ));
                }
                sent
            }
            IssueEvent::Assigned {
                issue,
                citizen_phone,
                citizen_address,
                department_name,
                worker_name,
                worker_phone,
            } => {
                let address = citizen_address.as_deref().unwrap_or("Address not provided");
                vec![
                    self.gateway.send(
                        citizen_phone,
                        &Self::issue_assigned_message(&issue.title, department_name, worker_name),
                    ),
                    self.gateway.send(
                        worker_phone,
                        &Self::worker_assignment_message(&issue.title, issue.id, address),
                    ),
                ]
            }
            IssueEvent::StatusUpdated {
                issue,
                citizen_phone,
            } => vec![self.gateway.send(
                citizen_phone,
                &Self::status_update_message(&issue.title, issue.status),
            )],
        };

        let attempted = outcomes.len();
        let delivered = outcomes.into_iter().filter(|ok| *ok).count();
        if delivered < attempted {
            warn!(
                "{} of {} notifications were not delivered",
                attempted - delivered,
                attempted
            );
        }
        delivered
    }
}

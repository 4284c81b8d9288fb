//! Ordered, best-effort side effects that follow a primary mutation.
//!
//! Steps run as activity, task, notification, then last-contact touch.
//! A failing step is logged and recorded; later steps still run. The one
//! exception is an activity rejected by the external-reference uniqueness
//! constraint: the event was already ingested, so nothing else runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info_span, warn, Instrument};

use crate::models::activity::ActivityRecord;
use crate::models::notification::NotificationRecord;
use crate::models::task::TaskRecord;
use crate::persistence::activity_repo::ActivityRepo;
use crate::persistence::client_repo::ClientRepo;
use crate::persistence::db::Database;
use crate::persistence::notification_repo::NotificationRepo;
use crate::persistence::task_repo::TaskRepo;
use crate::AppError;

/// Effects to perform for one ingested record.
#[derive(Debug, Clone)]
pub struct SideEffectPlan {
    /// Client the effects belong to.
    pub client_id: String,
    /// Activity entry; always written first.
    pub activity: ActivityRecord,
    /// Follow-up task, if any.
    pub task: Option<TaskRecord>,
    /// Advisor notification, if any.
    pub notification: Option<NotificationRecord>,
    /// New last-contact timestamp, if the client should be touched.
    pub touch_last_contact: Option<DateTime<Utc>>,
}

impl SideEffectPlan {
    /// Plan containing only an activity entry.
    #[must_use]
    pub fn activity_only(activity: ActivityRecord) -> Self {
        Self {
            client_id: activity.client_id.clone(),
            activity,
            task: None,
            notification: None,
            touch_last_contact: None,
        }
    }

    /// Add a follow-up task.
    #[must_use]
    pub fn with_task(mut self, task: TaskRecord) -> Self {
        self.task = Some(task);
        self
    }

    /// Add a notification.
    #[must_use]
    pub fn with_notification(mut self, notification: Option<NotificationRecord>) -> Self {
        self.notification = notification;
        self
    }

    /// Touch the client's last-contact time.
    #[must_use]
    pub fn touching(mut self, at: DateTime<Utc>) -> Self {
        self.touch_last_contact = Some(at);
        self
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Step succeeded; carries the affected record id.
    Done(String),
    /// Step was not planned or not reached.
    Skipped,
    /// Step failed; carries the error message.
    Failed(String),
}

impl StepOutcome {
    /// Whether the step succeeded.
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Whether the step failed.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Per-step outcomes for one plan.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SideEffectReport {
    /// Activity step.
    pub activity: StepOutcome,
    /// Task step.
    pub task: StepOutcome,
    /// Notification step.
    pub notification: StepOutcome,
    /// Last-contact step.
    pub last_contact: StepOutcome,
    /// The activity already existed; remaining steps were skipped.
    pub duplicate: bool,
}

impl SideEffectReport {
    fn duplicate() -> Self {
        Self {
            activity: StepOutcome::Skipped,
            task: StepOutcome::Skipped,
            notification: StepOutcome::Skipped,
            last_contact: StepOutcome::Skipped,
            duplicate: true,
        }
    }

    /// Whether any step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        [&self.activity, &self.task, &self.notification, &self.last_contact]
            .iter()
            .any(|s| s.is_failed())
    }
}

/// Runs [`SideEffectPlan`]s against storage.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    activities: ActivityRepo,
    tasks: TaskRepo,
    notifications: NotificationRepo,
    clients: ClientRepo,
}

impl SideEffectDispatcher {
    /// Create a dispatcher over the shared pool.
    #[must_use]
    pub fn new(db: &Arc<Database>) -> Self {
        Self {
            activities: ActivityRepo::new(Arc::clone(db)),
            tasks: TaskRepo::new(Arc::clone(db)),
            notifications: NotificationRepo::new(Arc::clone(db)),
            clients: ClientRepo::new(Arc::clone(db)),
        }
    }

    /// Execute a plan. Never fails as a whole; inspect the report.
    pub async fn dispatch(&self, plan: SideEffectPlan) -> SideEffectReport {
        let span = info_span!("dispatch", client_id = %plan.client_id);
        self.run(plan).instrument(span).await
    }

    async fn run(&self, plan: SideEffectPlan) -> SideEffectReport {
        let activity = match self.activities.insert(&plan.activity).await {
            Ok(record) => StepOutcome::Done(record.id),
            Err(AppError::AlreadyExists(_)) => {
                debug!(
                    external_ref = plan.activity.external_ref.as_deref().unwrap_or(""),
                    "activity already recorded, skipping remaining effects"
                );
                return SideEffectReport::duplicate();
            }
            Err(err) => failed("activity", &err),
        };

        let task = match plan.task {
            Some(ref task) => match self.tasks.insert(task).await {
                Ok(record) => StepOutcome::Done(record.id),
                Err(err) => failed("task", &err),
            },
            None => StepOutcome::Skipped,
        };

        let notification = match plan.notification {
            Some(ref notification) => match self.notifications.insert(notification).await {
                Ok(record) => StepOutcome::Done(record.id),
                Err(err) => failed("notification", &err),
            },
            None => StepOutcome::Skipped,
        };

        let last_contact = match plan.touch_last_contact {
            Some(at) => match self.clients.touch_last_contact(&plan.client_id, at).await {
                Ok(()) => StepOutcome::Done(plan.client_id.clone()),
                Err(err) => failed("last_contact", &err),
            },
            None => StepOutcome::Skipped,
        };

        SideEffectReport {
            activity,
            task,
            notification,
            last_contact,
            duplicate: false,
        }
    }
}

fn failed(step: &str, err: &AppError) -> StepOutcome {
    warn!(step, %err, "side effect failed");
    StepOutcome::Failed(err.to_string())
}

//! Pull-based notification feeds and the schedule publication fan-out.
//!
//! Feeds are derived on read from request and conflict collections; only
//! schedule-update notices have records of their own. Feed entries carry
//! composite ids, a kind prefix in front of the source-record id, which
//! mark-read resolves back to the underlying record.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::store::{Collection, Filter, ResourceStore, StoreError};

use super::catalog::Catalog;
use super::domain::{
    Identity, RequestId, RequestState, Role, ScheduleNotice, Student, StudentId, TeacherId,
    SCHEDULE_UPDATE_KIND,
};

/// Kinds of feed entries, each with its composite id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ShiftRequest,
    ClassroomRequest,
    Conflict,
    ShiftResponse,
    ClassroomResponse,
    ScheduleUpdate,
}

impl NotificationKind {
    pub const fn prefix(self) -> &'static str {
        match self {
            NotificationKind::ShiftRequest => "shift_",
            NotificationKind::ClassroomRequest => "classroom_",
            NotificationKind::Conflict => "conflict_",
            NotificationKind::ShiftResponse => "shift_response_",
            NotificationKind::ClassroomResponse => "classroom_response_",
            NotificationKind::ScheduleUpdate => "schedule_",
        }
    }

    /// Split a composite id into kind and source id. Longer prefixes are
    /// tried first so `shift_response_7` never parses as `shift_`.
    pub fn parse(composite: &str) -> Option<(Self, &str)> {
        const BY_PREFIX_LENGTH: [NotificationKind; 6] = [
            NotificationKind::ClassroomResponse,
            NotificationKind::ShiftResponse,
            NotificationKind::ClassroomRequest,
            NotificationKind::ScheduleUpdate,
            NotificationKind::ShiftRequest,
            NotificationKind::Conflict,
        ];
        for kind in BY_PREFIX_LENGTH {
            if let Some(rest) = composite.strip_prefix(kind.prefix()) {
                return Some((kind, rest));
            }
        }
        None
    }

    fn composite_id(self, source_id: &str) -> String {
        format!("{}{}", self.prefix(), source_id)
    }
}

/// One feed entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub date: DateTime<Utc>,
    pub source_id: String,
}

/// Counts from a schedule publication fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublishSummary {
    pub notified: usize,
    pub failed: usize,
}

/// Errors raised by the notification center.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification id '{id}' is not actionable for role {role}")]
    Unrecognized { id: String, role: Role },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct NotificationCenter<S> {
    catalog: Catalog<S>,
}

impl<S> Clone for NotificationCenter<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
        }
    }
}

impl<S: ResourceStore> NotificationCenter<S> {
    pub fn new(catalog: Catalog<S>) -> Self {
        Self { catalog }
    }

    /// Feed for an identity, newest first. The primary fetches propagate
    /// failure; an empty feed always means "nothing to show".
    pub async fn feed(&self, identity: &Identity) -> Result<Vec<NotificationView>, NotificationError> {
        let mut views = match identity {
            Identity::Director => self.director_feed().await?,
            Identity::Student(student) => self.student_feed(student).await?,
            Identity::Teacher(teacher) => self.teacher_feed(teacher).await?,
        };
        views.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(views)
    }

    async fn director_feed(&self) -> Result<Vec<NotificationView>, NotificationError> {
        let pending_shift = self
            .catalog
            .shift_requests(&[Filter::eq("response", Value::Null)])
            .await?;
        let pending_classroom = self
            .catalog
            .classroom_requests(&[Filter::eq("response", Value::Null)])
            .await?;
        let conflicts = self.catalog.conflicts().await?;

        let mut views = Vec::new();
        for request in pending_shift {
            let requester = self.student_name(&request.student_id).await;
            views.push(NotificationView {
                id: NotificationKind::ShiftRequest.composite_id(&request.id.0),
                kind: NotificationKind::ShiftRequest,
                title: "Shift change request".to_string(),
                message: format!("{requester} asked to change shifts"),
                date: request.date,
                source_id: request.id.0,
            });
        }
        for request in pending_classroom {
            let requester = self.teacher_name(&request.teacher_id).await;
            views.push(NotificationView {
                id: NotificationKind::ClassroomRequest.composite_id(&request.id.0),
                kind: NotificationKind::ClassroomRequest,
                title: "Classroom change request".to_string(),
                message: format!("{requester} asked to move a shift"),
                date: request.date,
                source_id: request.id.0,
            });
        }
        for conflict in conflicts {
            let student = self.student_name(&conflict.student_id).await;
            views.push(NotificationView {
                id: NotificationKind::Conflict.composite_id(&conflict.id),
                kind: NotificationKind::Conflict,
                title: "Schedule conflict".to_string(),
                message: format!("{student} has overlapping courses"),
                date: conflict.timestamp,
                source_id: conflict.id,
            });
        }
        Ok(views)
    }

    async fn student_feed(
        &self,
        student: &StudentId,
    ) -> Result<Vec<NotificationView>, NotificationError> {
        let answered = self
            .catalog
            .shift_requests(&[
                Filter::eq("studentId", student.0.as_str()),
                Filter::ne("response", Value::Null),
                Filter::ne("responseSeenByStudent", true),
            ])
            .await?;
        let notices = self.catalog.schedule_notices_for_student(student).await?;

        let mut views = Vec::new();
        for request in answered {
            let verdict = match request.state() {
                RequestState::Approved => "approved",
                RequestState::Rejected => "rejected",
                RequestState::Pending => continue,
            };
            views.push(NotificationView {
                id: NotificationKind::ShiftResponse.composite_id(&request.id.0),
                kind: NotificationKind::ShiftResponse,
                title: "Shift change decided".to_string(),
                message: format!("Your shift change request was {verdict}"),
                date: request.date,
                source_id: request.id.0,
            });
        }
        for notice in notices {
            if notice.read {
                continue;
            }
            views.push(NotificationView {
                id: NotificationKind::ScheduleUpdate.composite_id(&notice.id),
                kind: NotificationKind::ScheduleUpdate,
                title: "Schedule update".to_string(),
                message: notice.message,
                date: notice.date,
                source_id: notice.id,
            });
        }
        Ok(views)
    }

    async fn teacher_feed(
        &self,
        teacher: &TeacherId,
    ) -> Result<Vec<NotificationView>, NotificationError> {
        let answered = self
            .catalog
            .classroom_requests(&[
                Filter::eq("teacherId", teacher.0.as_str()),
                Filter::ne("response", Value::Null),
                Filter::ne("responseSeenByTeacher", true),
            ])
            .await?;

        let mut views = Vec::new();
        for request in answered {
            let verdict = match request.state() {
                RequestState::Approved => "approved",
                RequestState::Rejected => "rejected",
                RequestState::Pending => continue,
            };
            views.push(NotificationView {
                id: NotificationKind::ClassroomResponse.composite_id(&request.id.0),
                kind: NotificationKind::ClassroomResponse,
                title: "Classroom change decided".to_string(),
                message: format!("Your classroom change request was {verdict}"),
                date: request.date,
                source_id: request.id.0,
            });
        }
        Ok(views)
    }

    /// Mark one feed entry as seen by its recipient. An id or role that does
    /// not resolve to an actionable record fails without mutating anything.
    pub async fn mark_read(
        &self,
        identity: &Identity,
        composite_id: &str,
    ) -> Result<(), NotificationError> {
        match (identity, NotificationKind::parse(composite_id)) {
            (Identity::Student(_), Some((NotificationKind::ShiftResponse, source_id))) => {
                let mut request = self
                    .catalog
                    .shift_request(&RequestId(source_id.to_string()))
                    .await?;
                request.response_seen_by_student = true;
                self.catalog
                    .replace(Collection::ShiftRequests, &request.id.0, &request)
                    .await?;
                Ok(())
            }
            (Identity::Student(_), Some((NotificationKind::ScheduleUpdate, source_id))) => {
                let mut notice = self.catalog.schedule_notice(source_id).await?;
                notice.read = true;
                self.catalog
                    .replace(Collection::Notifications, &notice.id, &notice)
                    .await?;
                Ok(())
            }
            (Identity::Teacher(_), Some((NotificationKind::ClassroomResponse, source_id))) => {
                let mut request = self
                    .catalog
                    .classroom_request(&RequestId(source_id.to_string()))
                    .await?;
                request.response_seen_by_teacher = true;
                self.catalog
                    .replace(Collection::ClassroomRequests, &request.id.0, &request)
                    .await?;
                Ok(())
            }
            _ => Err(NotificationError::Unrecognized {
                id: composite_id.to_string(),
                role: identity.role(),
            }),
        }
    }

    /// Create one schedule-update notice per student, concurrently.
    ///
    /// Individual failures are logged and counted, never fatal; id issuance
    /// stays serialized underneath, so concurrent notices get distinct ids.
    pub async fn publish_schedules(&self) -> Result<PublishSummary, NotificationError> {
        let students = self.catalog.students().await?;
        let total = students.len();

        let tasks = students.iter().map(|student| self.notify_student(student));
        let results = join_all(tasks).await;

        let mut notified = 0;
        for (student, result) in students.iter().zip(results) {
            match result {
                Ok(_) => notified += 1,
                Err(error) => {
                    warn!(student = %student.id, %error, "schedule notice creation failed");
                }
            }
        }
        let failed = total - notified;
        if failed > 0 {
            warn!(notified, failed, "schedule publication finished with failures");
        } else {
            info!(notified, "schedule publication finished");
        }
        Ok(PublishSummary { notified, failed })
    }

    async fn notify_student(&self, student: &Student) -> Result<ScheduleNotice, StoreError> {
        self.catalog
            .create_numbered(Collection::Notifications, |id| ScheduleNotice {
                id,
                student_id: student.id.clone(),
                kind: SCHEDULE_UPDATE_KIND.to_string(),
                message: "Your schedule has been published".to_string(),
                date: Utc::now(),
                read: false,
            })
            .await
    }

    async fn student_name(&self, id: &StudentId) -> String {
        match self.catalog.student(id).await {
            Ok(student) => student.name,
            Err(_) => id.0.clone(),
        }
    }

    async fn teacher_name(&self, id: &TeacherId) -> String {
        match self.catalog.teacher(id).await {
            Ok(teacher) => teacher.name,
            Err(_) => id.0.clone(),
        }
    }
}

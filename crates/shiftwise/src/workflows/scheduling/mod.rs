//! Course-shift scheduling workflows.
//!
//! The engine is a bundle of cooperating services over one store handle:
//! the [`Allocator`] owns assignment writes and counters, the
//! [`ConflictDetector`] answers room probes and diffs conflict sets, the
//! [`RequestWorkflow`] drives change requests through decision and side
//! effect, the [`NotificationCenter`] derives feeds and fans out schedule
//! notices, and the [`Directory`] serves the read models around them. All of
//! them share a [`Catalog`] for typed store access and id issuance.

pub(crate) mod allocation;
pub(crate) mod catalog;
pub(crate) mod conflicts;
pub(crate) mod directory;
pub(crate) mod domain;
pub(crate) mod enrichment;
pub(crate) mod notifications;
pub(crate) mod requests;
pub(crate) mod router;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::store::ResourceStore;

pub use allocation::{AllocationError, Allocator, RemovalOutcome};
pub use catalog::Catalog;
pub use conflicts::{
    ConflictDetector, ConflictDiff, ConflictDiffPolicy, ConflictView, RoomCheck, RoomClash,
};
pub use directory::{
    CandidateEntry, ClassroomOccupancy, Directory, EnrollmentEntry, RosterEntry, ScheduleEntry,
};
pub use domain::{
    Allocation, Building, Classroom, ClassroomId, ClassroomRequest, Conflict, Course, CourseId,
    Decision, Degree, Identity, RequestId, RequestResponse, RequestState, Role, ScheduleNotice,
    Shift, ShiftId, ShiftRequest, Student, StudentId, Teacher, TeacherId, DEFAULT_SHIFT_CAPACITY,
    DEFAULT_SHIFT_KIND, SCHEDULE_UPDATE_KIND,
};
pub use enrichment::{enrich, EnrichedShift, OccupancyStatus, UNKNOWN_COURSE_NAME};
pub use notifications::{
    NotificationCenter, NotificationError, NotificationKind, NotificationView, PublishSummary,
};
pub use requests::{
    ClassroomChangeSubmission, DecisionOutcome, EffectStatus, PendingEffects, RequestKind,
    RequestSummary, RequestWorkflow, ShiftChangeSubmission, WorkflowError,
};
pub use router::scheduling_router;

/// All scheduling services wired over one store and lock registry.
pub struct SchedulingEngine<S> {
    pub catalog: Catalog<S>,
    pub allocator: Allocator<S>,
    pub conflicts: ConflictDetector<S>,
    pub requests: RequestWorkflow<S>,
    pub notifications: NotificationCenter<S>,
    pub directory: Directory<S>,
}

impl<S: ResourceStore> SchedulingEngine<S> {
    pub fn new(store: Arc<S>, diff_policy: ConflictDiffPolicy) -> Self {
        let catalog = Catalog::new(store);
        let allocator = Allocator::new(catalog.clone());
        let conflicts = ConflictDetector::new(catalog.clone(), diff_policy);
        let requests = RequestWorkflow::new(catalog.clone(), allocator.clone(), conflicts.clone());
        let notifications = NotificationCenter::new(catalog.clone());
        let directory = Directory::new(catalog.clone(), conflicts.clone());
        Self {
            catalog,
            allocator,
            conflicts,
            requests,
            notifications,
            directory,
        }
    }
}

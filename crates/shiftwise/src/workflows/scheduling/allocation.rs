//! Capacity-aware allocation of students to shifts.
//!
//! Two rules govern writes here. Capacity: a full shift rejects normal
//! students but admits special-status ones. Exclusivity: a student holds at
//! most one live allocation per (course, shift type), so allocating into a
//! sibling shift first removes the one being replaced. The registration
//! counter on each shift is adjusted under a per-shift lock so concurrent
//! read-modify-writes cannot interleave.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::store::{ResourceStore, StoreError};

use super::catalog::Catalog;
use super::domain::{Allocation, Shift, ShiftId, StudentId};

/// Registry of per-shift async locks.
pub(crate) struct ShiftLocks {
    inner: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ShiftLocks {
    pub(crate) fn new() -> Self {
        Self {
            inner: StdMutex::new(HashMap::new()),
        }
    }

    fn handle(&self, shift: &ShiftId) -> Arc<Mutex<()>> {
        let mut guard = self.inner.lock().expect("shift lock registry poisoned");
        Arc::clone(guard.entry(shift.0.clone()).or_default())
    }

    pub(crate) async fn lock(&self, shift: &ShiftId) -> OwnedMutexGuard<()> {
        self.handle(shift).lock_owned().await
    }

    /// Lock two shifts in id order so concurrent swaps cannot deadlock.
    pub(crate) async fn lock_pair(
        &self,
        first: &ShiftId,
        second: &ShiftId,
    ) -> Vec<OwnedMutexGuard<()>> {
        if first.0 == second.0 {
            return vec![self.lock(first).await];
        }
        let mut ordered = [first, second];
        ordered.sort_by(|a, b| a.0.cmp(&b.0));
        let mut guards = Vec::with_capacity(2);
        for shift in ordered {
            guards.push(self.lock(shift).await);
        }
        guards
    }
}

/// Outcome of a removal. Absent-on-arrival is success, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalOutcome {
    Removed,
    AlreadyAbsent,
}

impl RemovalOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            RemovalOutcome::Removed => "removed",
            RemovalOutcome::AlreadyAbsent => "already_absent",
        }
    }
}

/// Errors raised by the allocator.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    #[error("shift {shift} is at capacity ({capacity})")]
    CapacityExceeded { shift: ShiftId, capacity: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Creates and removes student-to-shift assignments.
pub struct Allocator<S> {
    catalog: Catalog<S>,
    locks: Arc<ShiftLocks>,
}

impl<S> Clone for Allocator<S> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            locks: Arc::clone(&self.locks),
        }
    }
}

impl<S: ResourceStore> Allocator<S> {
    pub fn new(catalog: Catalog<S>) -> Self {
        Self {
            catalog,
            locks: Arc::new(ShiftLocks::new()),
        }
    }

    /// Allocate a student to a shift.
    ///
    /// Re-allocating an existing assignment returns it unchanged. A sibling
    /// assignment in the same (course, type) is removed first, counters on
    /// both shifts included. The capacity check runs before anything mutates,
    /// so a denial leaves prior allocations intact.
    pub async fn allocate(
        &self,
        student_id: &StudentId,
        shift_id: &ShiftId,
    ) -> Result<Allocation, AllocationError> {
        let student = self.catalog.student(student_id).await?;
        let target = self.catalog.shift(shift_id).await?;

        let displaced = self.find_displaced(student_id, &target).await?;

        let _guards = match &displaced {
            Some(old) => self.locks.lock_pair(shift_id, &old.shift_id).await,
            None => vec![self.locks.lock(shift_id).await],
        };

        let enriched = self.catalog.enriched_shift(shift_id).await?;
        if enriched.is_full && !student.special_status {
            debug!(student = %student_id, shift = %shift_id, "allocation denied at capacity");
            return Err(AllocationError::CapacityExceeded {
                shift: shift_id.clone(),
                capacity: enriched.capacity,
            });
        }

        if let Some(old) = displaced {
            match self.catalog.allocation(&old.id).await {
                Ok(current) => {
                    self.delete_and_decrement(&current).await?;
                }
                Err(StoreError::NotFound { .. }) => {}
                Err(error) => return Err(error.into()),
            }
        }

        if let Some(existing) = self.catalog.allocation_between(student_id, shift_id).await? {
            debug!(allocation = %existing.id, "allocation already present");
            return Ok(existing);
        }

        let allocation = self.catalog.create_allocation(student_id, shift_id).await?;
        self.adjust_registered(shift_id, 1).await?;
        debug!(
            allocation = %allocation.id,
            student = %student_id,
            shift = %shift_id,
            "student allocated"
        );
        Ok(allocation)
    }

    /// Remove a student's assignment from a shift.
    ///
    /// With an explicit allocation id the record's own shift is the one
    /// unlocked and decremented. Either way an allocation that is already
    /// gone reports `AlreadyAbsent` and touches no counter.
    pub async fn remove(
        &self,
        shift_id: &ShiftId,
        student_id: &StudentId,
        allocation_id: Option<&str>,
    ) -> Result<RemovalOutcome, AllocationError> {
        match allocation_id {
            Some(id) => {
                let allocation = match self.catalog.allocation(id).await {
                    Ok(allocation) => allocation,
                    Err(StoreError::NotFound { .. }) => return Ok(RemovalOutcome::AlreadyAbsent),
                    Err(error) => return Err(error.into()),
                };
                let _guard = self.locks.lock(&allocation.shift_id).await;
                match self.catalog.allocation(id).await {
                    Ok(current) => self.delete_and_decrement(&current).await,
                    Err(StoreError::NotFound { .. }) => Ok(RemovalOutcome::AlreadyAbsent),
                    Err(error) => Err(error.into()),
                }
            }
            None => {
                let _guard = self.locks.lock(shift_id).await;
                let Some(allocation) = self
                    .catalog
                    .allocation_between(student_id, shift_id)
                    .await?
                else {
                    return Ok(RemovalOutcome::AlreadyAbsent);
                };
                self.delete_and_decrement(&allocation).await
            }
        }
    }

    /// First allocation of the student whose shift shares (course, type) with
    /// the target but is a different shift. The exclusivity rule caps this at
    /// one.
    async fn find_displaced(
        &self,
        student: &StudentId,
        target: &Shift,
    ) -> Result<Option<Allocation>, AllocationError> {
        let allocations = self.catalog.allocations_for_student(student).await?;
        for allocation in allocations {
            if allocation.shift_id == target.id {
                continue;
            }
            let other = match self.catalog.shift(&allocation.shift_id).await {
                Ok(shift) => shift,
                Err(StoreError::NotFound { .. }) => {
                    warn!(
                        allocation = %allocation.id,
                        shift = %allocation.shift_id,
                        "allocation references a missing shift; skipping"
                    );
                    continue;
                }
                Err(error) => return Err(error.into()),
            };
            if other.course_id == target.course_id
                && other.effective_kind() == target.effective_kind()
            {
                return Ok(Some(allocation));
            }
        }
        Ok(None)
    }

    /// Delete a verified-live allocation and decrement its shift counter.
    /// Counter failure after the delete is logged, not propagated; the
    /// removal already happened.
    async fn delete_and_decrement(
        &self,
        allocation: &Allocation,
    ) -> Result<RemovalOutcome, AllocationError> {
        self.catalog.delete_allocation(&allocation.id).await?;
        if let Err(error) = self.adjust_registered(&allocation.shift_id, -1).await {
            warn!(
                shift = %allocation.shift_id,
                %error,
                "allocation removed but counter update failed"
            );
        }
        Ok(RemovalOutcome::Removed)
    }

    /// Read-modify-write of the registration counter, clamped at zero. The
    /// caller holds the shift lock.
    async fn adjust_registered(&self, shift: &ShiftId, delta: i64) -> Result<(), StoreError> {
        let mut record = self.catalog.shift(shift).await?;
        let next = (i64::from(record.registered()) + delta).max(0) as u32;
        record.total_students_registered = Some(next);
        self.catalog.save_shift(&record).await
    }
}

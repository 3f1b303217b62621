//! In-memory `StaffStore` used by the RPC tests.
//!
//! Enforces the same uniqueness rules as the `staff_member` table and counts
//! calls so tests can assert the backend was never reached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::StaffStore;
use crate::errors::{AppError, AppResult};
use crate::models::{NewStaffMember, StaffMember, StaffMemberPatch};

#[derive(Default)]
pub struct MemoryStore {
    members: Mutex<HashMap<String, StaffMember>>,
    calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations that got past argument checks and reached the data.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of stored records.
    pub fn count(&self) -> usize {
        self.members.lock().unwrap().len()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Name the unique column another record already holds, if any.
fn conflicting_field(
    members: &HashMap<String, StaffMember>,
    staff_id: &str,
    email: &str,
    phone_number: &str,
) -> Option<&'static str> {
    members
        .values()
        .filter(|other| other.staff_id != staff_id)
        .find_map(|other| {
            if other.email == email {
                Some("email")
            } else if other.phone_number == phone_number {
                Some("phone_number")
            } else {
                None
            }
        })
}

#[async_trait]
impl StaffStore for MemoryStore {
    async fn add(&self, member: &NewStaffMember) -> AppResult<StaffMember> {
        member.validate()?;
        self.touch();

        let mut members = self.members.lock().unwrap();
        if members.contains_key(&member.staff_id) {
            return Err(AppError::Conflict("staff_id already exists".to_string()));
        }
        if let Some(field) = conflicting_field(
            &members,
            &member.staff_id,
            &member.email,
            &member.phone_number,
        ) {
            return Err(AppError::Conflict(format!("{} already exists", field)));
        }

        let now = Utc::now();
        let stored = StaffMember {
            staff_id: member.staff_id.clone(),
            first_name: member.first_name.clone(),
            last_name: member.last_name.clone(),
            email: member.email.clone(),
            phone_number: member.phone_number.clone(),
            title: member.title.clone(),
            office: member.office.clone(),
            created_at: now,
            updated_at: now,
        };
        members.insert(stored.staff_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get(&self, staff_id: &str) -> AppResult<StaffMember> {
        if staff_id.is_empty() {
            return Err(AppError::EmptyId);
        }
        self.touch();

        self.members
            .lock()
            .unwrap()
            .get(staff_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(staff_id.to_string()))
    }

    async fn update(&self, patch: &StaffMemberPatch) -> AppResult<StaffMember> {
        if patch.staff_id.is_empty() {
            return Err(AppError::EmptyId);
        }
        self.touch();

        let mut members = self.members.lock().unwrap();
        let mut merged = members
            .get(&patch.staff_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(patch.staff_id.clone()))?;
        merged.apply(patch);

        if let Some(field) = conflicting_field(
            &members,
            &merged.staff_id,
            &merged.email,
            &merged.phone_number,
        ) {
            return Err(AppError::Conflict(format!("{} already exists", field)));
        }

        merged.updated_at = Utc::now().max(merged.created_at);
        members.insert(merged.staff_id.clone(), merged.clone());
        Ok(merged)
    }

    async fn delete(&self, staff_id: &str) -> AppResult<()> {
        if staff_id.is_empty() {
            return Err(AppError::EmptyId);
        }
        self.touch();

        self.members
            .lock()
            .unwrap()
            .remove(staff_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(staff_id.to_string()))
    }
}

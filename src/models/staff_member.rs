//! Staff member model and its mapping to and from the wire representation.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::errors::{AppError, AppResult};
use crate::proto;

/// A staff member as stored in the `staff_member` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StaffMember {
    pub staff_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub title: String,
    pub office: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating a staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStaffMember {
    pub staff_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub title: String,
    pub office: String,
}

/// A partial update: `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffMemberPatch {
    pub staff_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub title: Option<String>,
    pub office: Option<String>,
}

impl StaffMember {
    /// Overlay the fields present in `patch`.
    ///
    /// `staff_id` and both timestamps are left alone; the store refreshes
    /// `updated_at` when it writes the merged record.
    pub fn apply(&mut self, patch: &StaffMemberPatch) {
        overlay(&mut self.first_name, &patch.first_name);
        overlay(&mut self.last_name, &patch.last_name);
        overlay(&mut self.email, &patch.email);
        overlay(&mut self.phone_number, &patch.phone_number);
        overlay(&mut self.title, &patch.title);
        overlay(&mut self.office, &patch.office);
    }
}

fn overlay(field: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

impl NewStaffMember {
    /// Map a Create request's record, rejecting a missing one.
    pub fn from_wire(member: Option<proto::StaffMember>) -> AppResult<Self> {
        let member = member.ok_or(AppError::NilRecord)?;
        Ok(Self {
            staff_id: member.staff_id,
            first_name: member.first_name,
            last_name: member.last_name,
            email: member.email,
            phone_number: member.phone_number,
            title: member.title,
            office: member.office,
        })
    }

    /// Check the id and the required fields.
    pub fn validate(&self) -> AppResult<()> {
        if self.staff_id.is_empty() {
            return Err(AppError::EmptyId);
        }

        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
            ("phone_number", &self.phone_number),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{} is required", name)));
            }
        }

        Ok(())
    }
}

impl StaffMemberPatch {
    /// Map an Update request's record. Empty or blank strings mean "no change",
    /// so a patch can never blank out a field Create requires.
    pub fn from_wire(member: Option<proto::StaffMember>) -> AppResult<Self> {
        let member = member.ok_or(AppError::NilRecord)?;
        Ok(Self {
            staff_id: member.staff_id,
            first_name: non_empty(member.first_name),
            last_name: non_empty(member.last_name),
            email: non_empty(member.email),
            phone_number: non_empty(member.phone_number),
            title: non_empty(member.title),
            office: non_empty(member.office),
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

impl From<StaffMember> for proto::StaffMember {
    fn from(member: StaffMember) -> Self {
        Self {
            staff_id: member.staff_id,
            first_name: member.first_name,
            last_name: member.last_name,
            email: member.email,
            phone_number: member.phone_number,
            title: member.title,
            office: member.office,
            created_at: member
                .created_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            updated_at: member
                .updated_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

//! Staff member store.
//!
//! `StaffStore` is the only gateway to persistent state. Each operation is a
//! single statement except Update, which reads and writes inside one
//! transaction; no in-process locks are taken.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::{AppError, AppResult};
use crate::models::{NewStaffMember, StaffMember, StaffMemberPatch};

/// Persistence operations on staff members.
#[async_trait]
pub trait StaffStore: Send + Sync {
    /// Insert a new record and return it with its backend-assigned timestamps.
    async fn add(&self, member: &NewStaffMember) -> AppResult<StaffMember>;

    /// Fetch a record by ID.
    async fn get(&self, staff_id: &str) -> AppResult<StaffMember>;

    /// Merge `patch` into the stored record and return the result.
    async fn update(&self, patch: &StaffMemberPatch) -> AppResult<StaffMember>;

    /// Remove a record by ID.
    async fn delete(&self, staff_id: &str) -> AppResult<()>;
}

const COLUMNS: &str = "staff_id, first_name, last_name, email, phone_number, title, office, created_at, updated_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStaffRepository {
    pool: PgPool,
}

impl PgStaffRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StaffStore for PgStaffRepository {
    async fn add(&self, member: &NewStaffMember) -> AppResult<StaffMember> {
        member.validate()?;

        let stored = sqlx::query_as::<_, StaffMember>(&format!(
            "INSERT INTO staff_member (staff_id, first_name, last_name, email, phone_number, title, office) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            COLUMNS
        ))
        .bind(&member.staff_id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone_number)
        .bind(&member.title)
        .bind(&member.office)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn get(&self, staff_id: &str) -> AppResult<StaffMember> {
        if staff_id.is_empty() {
            return Err(AppError::EmptyId);
        }

        sqlx::query_as::<_, StaffMember>(&format!(
            "SELECT {} FROM staff_member WHERE staff_id = $1",
            COLUMNS
        ))
        .bind(staff_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(staff_id.to_string()))
    }

    async fn update(&self, patch: &StaffMemberPatch) -> AppResult<StaffMember> {
        if patch.staff_id.is_empty() {
            return Err(AppError::EmptyId);
        }

        let mut tx = self.pool.begin().await?;

        let mut member = sqlx::query_as::<_, StaffMember>(&format!(
            "SELECT {} FROM staff_member WHERE staff_id = $1 FOR UPDATE",
            COLUMNS
        ))
        .bind(&patch.staff_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(patch.staff_id.clone()))?;

        member.apply(patch);

        // GREATEST keeps created_at <= updated_at even if the clock steps back.
        let updated = sqlx::query_as::<_, StaffMember>(&format!(
            "UPDATE staff_member SET first_name = $2, last_name = $3, email = $4, phone_number = $5, \
             title = $6, office = $7, updated_at = GREATEST(current_timestamp, created_at) \
             WHERE staff_id = $1 RETURNING {}",
            COLUMNS
        ))
        .bind(&member.staff_id)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(&member.email)
        .bind(&member.phone_number)
        .bind(&member.title)
        .bind(&member.office)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete(&self, staff_id: &str) -> AppResult<()> {
        if staff_id.is_empty() {
            return Err(AppError::EmptyId);
        }

        let result = sqlx::query("DELETE FROM staff_member WHERE staff_id = $1")
            .bind(staff_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(staff_id.to_string()));
        }

        Ok(())
    }
}

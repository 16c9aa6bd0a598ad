//! Persistence trait for classroom records.

use {
    async_trait::async_trait,
    aula_common::UserId,
    chrono::NaiveDate,
};

use crate::{
    Result,
    types::{Activity, ClassSession, Student},
};

/// Persistence backend for students, sessions, and activities.
///
/// Every write is a single independent operation; callers that need several
/// writes (e.g. one participation credit per call) get no atomicity across
/// them.
#[async_trait]
pub trait ClassroomStore: Send + Sync {
    async fn get_user(&self, user: &UserId) -> Result<Option<Student>>;
    async fn list_users(&self) -> Result<Vec<Student>>;
    /// Fails with `AlreadyRegistered` if either id is already taken.
    async fn register_user(&self, user: &UserId, university_id: &str) -> Result<Student>;
    /// Fails with `NotRegistered` for unknown users.
    async fn university_id_of(&self, user: &UserId) -> Result<String>;

    async fn record_attendance(&self, user: &UserId, date: NaiveDate) -> Result<()>;
    /// Adds exactly one participation credit.
    async fn record_participation(&self, user: &UserId, date: NaiveDate) -> Result<()>;
    /// Fails with `AlreadySubmitted` if the user already presented `activity`.
    async fn record_activity_submission(
        &self,
        user: &UserId,
        activity: NaiveDate,
        presentation: &str,
    ) -> Result<()>;
    async fn record_activity_grade(
        &self,
        user: &UserId,
        activity: NaiveDate,
        grade: f64,
    ) -> Result<()>;
    async fn record_exam_grade(&self, user: &UserId, partial: &str, grade: f64) -> Result<()>;

    /// Fails with `AlreadyExists` if a session is already scheduled that day.
    async fn create_session(&self, session: ClassSession) -> Result<ClassSession>;
    async fn get_session(&self, date: NaiveDate) -> Result<Option<ClassSession>>;
    async fn list_sessions(&self) -> Result<Vec<ClassSession>>;

    /// Fails with `AlreadyExists` if an activity is already due that day.
    async fn create_activity(&self, activity: Activity) -> Result<Activity>;
    async fn get_activity(&self, date: NaiveDate) -> Result<Option<Activity>>;
    async fn list_activities(&self) -> Result<Vec<Activity>>;
}

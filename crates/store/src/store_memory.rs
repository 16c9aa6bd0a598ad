//! In-memory store for tests and simulation.

use std::{collections::HashMap, sync::Mutex};

use {
    async_trait::async_trait,
    aula_common::UserId,
    chrono::NaiveDate,
    tracing::debug,
};

use crate::{
    Error, Result,
    store::ClassroomStore,
    types::{Activity, ClassSession, ClassroomData, Student},
};

/// In-memory store. No persistence.
pub struct InMemoryStore {
    data: Mutex<ClassroomData>,
    /// Write operation -> successful calls left before it starts failing.
    failing: Mutex<HashMap<&'static str, usize>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_data(ClassroomData::default())
    }

    /// Start from a pre-populated document.
    pub fn with_data(data: ClassroomData) -> Self {
        Self {
            data: Mutex::new(data),
            failing: Mutex::new(HashMap::new()),
        }
    }

    /// Let `allowed` more calls of the write `operation`
    /// (`"record_participation"`, `"record_attendance"`, ...) succeed, then
    /// fail every later one.
    pub fn fail_after(&self, operation: &'static str, allowed: usize) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation, allowed);
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> ClassroomData {
        self.data.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn read<T>(&self, f: impl FnOnce(&ClassroomData) -> T) -> T {
        let data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        f(&data)
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        let mut failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        match failing.get_mut(operation) {
            Some(0) => {
                debug!(operation, "simulated store failure");
                Err(Error::message(format!("{operation} failed")))
            },
            Some(left) => {
                *left -= 1;
                Ok(())
            },
            None => Ok(()),
        }
    }

    fn write<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut ClassroomData) -> Result<T>,
    ) -> Result<T> {
        self.check(operation)?;
        let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut data)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClassroomStore for InMemoryStore {
    async fn get_user(&self, user: &UserId) -> Result<Option<Student>> {
        Ok(self.read(|d| d.student(user).cloned()))
    }

    async fn list_users(&self) -> Result<Vec<Student>> {
        Ok(self.read(|d| d.students.clone()))
    }

    async fn register_user(&self, user: &UserId, university_id: &str) -> Result<Student> {
        self.write("register_user", |d| d.register(user, university_id))
    }

    async fn university_id_of(&self, user: &UserId) -> Result<String> {
        self.read(|d| d.university_id_of(user))
    }

    async fn record_attendance(&self, user: &UserId, date: NaiveDate) -> Result<()> {
        self.write("record_attendance", |d| d.attend(user, date))
    }

    async fn record_participation(&self, user: &UserId, date: NaiveDate) -> Result<()> {
        self.write("record_participation", |d| d.participate(user, date))
    }

    async fn record_activity_submission(
        &self,
        user: &UserId,
        activity: NaiveDate,
        presentation: &str,
    ) -> Result<()> {
        self.write("record_activity_submission", |d| {
            d.submit_activity(user, activity, presentation)
        })
    }

    async fn record_activity_grade(
        &self,
        user: &UserId,
        activity: NaiveDate,
        grade: f64,
    ) -> Result<()> {
        self.write("record_activity_grade", |d| {
            d.grade_activity(user, activity, grade)
        })
    }

    async fn record_exam_grade(&self, user: &UserId, partial: &str, grade: f64) -> Result<()> {
        self.write("record_exam_grade", |d| d.grade_exam(user, partial, grade))
    }

    async fn create_session(&self, session: ClassSession) -> Result<ClassSession> {
        self.write("create_session", |d| d.add_session(session))
    }

    async fn get_session(&self, date: NaiveDate) -> Result<Option<ClassSession>> {
        Ok(self.read(|d| d.session(date).cloned()))
    }

    async fn list_sessions(&self) -> Result<Vec<ClassSession>> {
        Ok(self.read(|d| d.sessions.clone()))
    }

    async fn create_activity(&self, activity: Activity) -> Result<Activity> {
        self.write("create_activity", |d| d.add_activity(activity))
    }

    async fn get_activity(&self, date: NaiveDate) -> Result<Option<Activity>> {
        Ok(self.read(|d| d.activity(date).cloned()))
    }

    async fn list_activities(&self) -> Result<Vec<Activity>> {
        Ok(self.read(|d| d.activities.clone()))
    }
}

//! JSON file-backed classroom store with atomic writes.

use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    aula_common::UserId,
    chrono::NaiveDate,
    tokio::{fs, sync::RwLock},
    tracing::{debug, warn},
};

use crate::{
    Result,
    error::Context,
    store::ClassroomStore,
    types::{Activity, ClassSession, ClassroomData, Student},
};

/// File-backed store. The whole classroom lives in a single JSON document.
pub struct FileStore {
    path: PathBuf,
    /// Readers share; a read-modify-write cycle holds it exclusively.
    lock: RwLock<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<ClassroomData> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(ClassroomData::default());
        }
        let raw = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Atomic write: copy the current file to `.bak`, write to temp, rename
    /// over target. The target exists throughout.
    async fn atomic_write(&self, data: &ClassroomData) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            if let Err(e) = fs::copy(&self.path, &bak).await {
                warn!(path = %bak.display(), error = %e, "failed to refresh store backup");
            }
        }

        fs::write(&tmp, json.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;

        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), "classroom store written");
        Ok(())
    }

    async fn read<T>(&self, f: impl FnOnce(&ClassroomData) -> T) -> Result<T> {
        let _guard = self.lock.read().await;
        let data = self.load().await?;
        Ok(f(&data))
    }

    /// Load, mutate, and write back. Nothing is written when `f` fails.
    async fn write<T>(&self, f: impl FnOnce(&mut ClassroomData) -> Result<T>) -> Result<T> {
        let _guard = self.lock.write().await;
        let mut data = self.load().await?;
        let out = f(&mut data)?;
        self.atomic_write(&data).await?;
        Ok(out)
    }
}

#[async_trait]
impl ClassroomStore for FileStore {
    async fn get_user(&self, user: &UserId) -> Result<Option<Student>> {
        self.read(|d| d.student(user).cloned()).await
    }

    async fn list_users(&self) -> Result<Vec<Student>> {
        self.read(|d| d.students.clone()).await
    }

    async fn register_user(&self, user: &UserId, university_id: &str) -> Result<Student> {
        self.write(|d| d.register(user, university_id)).await
    }

    async fn university_id_of(&self, user: &UserId) -> Result<String> {
        self.read(|d| d.university_id_of(user)).await?
    }

    async fn record_attendance(&self, user: &UserId, date: NaiveDate) -> Result<()> {
        self.write(|d| d.attend(user, date)).await
    }

    async fn record_participation(&self, user: &UserId, date: NaiveDate) -> Result<()> {
        self.write(|d| d.participate(user, date)).await
    }

    async fn record_activity_submission(
        &self,
        user: &UserId,
        activity: NaiveDate,
        presentation: &str,
    ) -> Result<()> {
        self.write(|d| d.submit_activity(user, activity, presentation))
            .await
    }

    async fn record_activity_grade(
        &self,
        user: &UserId,
        activity: NaiveDate,
        grade: f64,
    ) -> Result<()> {
        self.write(|d| d.grade_activity(user, activity, grade)).await
    }

    async fn record_exam_grade(&self, user: &UserId, partial: &str, grade: f64) -> Result<()> {
        self.write(|d| d.grade_exam(user, partial, grade)).await
    }

    async fn create_session(&self, session: ClassSession) -> Result<ClassSession> {
        self.write(|d| d.add_session(session)).await
    }

    async fn get_session(&self, date: NaiveDate) -> Result<Option<ClassSession>> {
        self.read(|d| d.session(date).cloned()).await
    }

    async fn list_sessions(&self) -> Result<Vec<ClassSession>> {
        self.read(|d| d.sessions.clone()).await
    }

    async fn create_activity(&self, activity: Activity) -> Result<Activity> {
        self.write(|d| d.add_activity(activity)).await
    }

    async fn get_activity(&self, date: NaiveDate) -> Result<Option<Activity>> {
        self.read(|d| d.activity(date).cloned()).await
    }

    async fn list_activities(&self) -> Result<Vec<Activity>> {
        self.read(|d| d.activities.clone()).await
    }
}

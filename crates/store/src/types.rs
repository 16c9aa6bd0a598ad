use {
    aula_common::UserId,
    chrono::{DateTime, NaiveDate, Utc},
    serde::{Deserialize, Serialize},
};

use crate::{Error, Result};

/// A named link or note attached to a session or activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    /// Class day the credit counts for.
    pub date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySubmission {
    /// Due date of the activity, which also identifies it.
    pub activity: NaiveDate,
    pub presentation: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityGrade {
    pub activity: NaiveDate,
    pub grade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamGrade {
    pub partial: String,
    pub grade: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub discord_id: UserId,
    pub university_id: String,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub attendance: Vec<NaiveDate>,
    #[serde(default)]
    pub participations: Vec<Participation>,
    #[serde(default)]
    pub activities: Vec<ActivitySubmission>,
    #[serde(default)]
    pub activity_grades: Vec<ActivityGrade>,
    #[serde(default)]
    pub exam_grades: Vec<ExamGrade>,
}

impl Student {
    pub fn new(discord_id: UserId, university_id: impl Into<String>) -> Self {
        Self {
            discord_id,
            university_id: university_id.into(),
            registered_at: Utc::now(),
            attendance: Vec::new(),
            participations: Vec::new(),
            activities: Vec::new(),
            activity_grades: Vec::new(),
            exam_grades: Vec::new(),
        }
    }

    pub fn submission(&self, activity: NaiveDate) -> Option<&ActivitySubmission> {
        self.activities.iter().find(|a| a.activity == activity)
    }

    pub fn grade_for(&self, activity: NaiveDate) -> Option<f64> {
        self.activity_grades
            .iter()
            .find(|g| g.activity == activity)
            .map(|g| g.grade)
    }

    pub fn exam_grade(&self, partial: &str) -> Option<f64> {
        self.exam_grades
            .iter()
            .find(|g| g.partial == partial)
            .map(|g| g.grade)
    }
}

/// One scheduled class day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSession {
    pub name: String,
    pub date: NaiveDate,
    pub attendance_code: String,
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// University ids of students who checked in.
    #[serde(default)]
    pub attendance: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    /// Due date; at most one activity per day.
    pub date: NaiveDate,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// The whole persisted document. Both backends apply the same mutations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassroomData {
    pub students: Vec<Student>,
    pub sessions: Vec<ClassSession>,
    pub activities: Vec<Activity>,
}

impl ClassroomData {
    pub fn student(&self, user: &UserId) -> Option<&Student> {
        self.students.iter().find(|s| &s.discord_id == user)
    }

    fn student_mut(&mut self, user: &UserId) -> Result<&mut Student> {
        self.students
            .iter_mut()
            .find(|s| &s.discord_id == user)
            .ok_or_else(|| Error::not_registered(user))
    }

    pub fn session(&self, date: NaiveDate) -> Option<&ClassSession> {
        self.sessions.iter().find(|s| s.date == date)
    }

    pub fn activity(&self, date: NaiveDate) -> Option<&Activity> {
        self.activities.iter().find(|a| a.date == date)
    }

    pub fn register(&mut self, user: &UserId, university_id: &str) -> Result<Student> {
        if self.student(user).is_some() {
            return Err(Error::already_registered(format!("user {user}")));
        }
        if self.students.iter().any(|s| s.university_id == university_id) {
            return Err(Error::already_registered(format!(
                "university id {university_id}"
            )));
        }
        let student = Student::new(user.clone(), university_id);
        self.students.push(student.clone());
        Ok(student)
    }

    pub fn university_id_of(&self, user: &UserId) -> Result<String> {
        self.student(user)
            .map(|s| s.university_id.clone())
            .ok_or_else(|| Error::not_registered(user))
    }

    /// Idempotent per day; also marks the day's session if one exists.
    pub fn attend(&mut self, user: &UserId, date: NaiveDate) -> Result<()> {
        let student = self.student_mut(user)?;
        if !student.attendance.contains(&date) {
            student.attendance.push(date);
        }
        let university_id = student.university_id.clone();
        if let Some(session) = self.sessions.iter_mut().find(|s| s.date == date)
            && !session.attendance.contains(&university_id)
        {
            session.attendance.push(university_id);
        }
        Ok(())
    }

    pub fn participate(&mut self, user: &UserId, date: NaiveDate) -> Result<()> {
        self.student_mut(user)?.participations.push(Participation {
            date,
            recorded_at: Utc::now(),
        });
        Ok(())
    }

    pub fn submit_activity(
        &mut self,
        user: &UserId,
        activity: NaiveDate,
        presentation: &str,
    ) -> Result<()> {
        let student = self.student_mut(user)?;
        if student.submission(activity).is_some() {
            return Err(Error::AlreadySubmitted { activity });
        }
        student.activities.push(ActivitySubmission {
            activity,
            presentation: presentation.to_string(),
            time: Utc::now(),
        });
        Ok(())
    }

    /// Replaces any earlier grade for the same activity.
    pub fn grade_activity(&mut self, user: &UserId, activity: NaiveDate, grade: f64) -> Result<()> {
        let student = self.student_mut(user)?;
        student.activity_grades.retain(|g| g.activity != activity);
        student.activity_grades.push(ActivityGrade { activity, grade });
        Ok(())
    }

    /// Replaces any earlier grade for the same partial.
    pub fn grade_exam(&mut self, user: &UserId, partial: &str, grade: f64) -> Result<()> {
        let student = self.student_mut(user)?;
        student.exam_grades.retain(|g| g.partial != partial);
        student.exam_grades.push(ExamGrade {
            partial: partial.to_string(),
            grade,
        });
        Ok(())
    }

    pub fn add_session(&mut self, session: ClassSession) -> Result<ClassSession> {
        if self.session(session.date).is_some() {
            return Err(Error::already_exists(format!("session for {}", session.date)));
        }
        self.sessions.push(session.clone());
        self.sessions.sort_by_key(|s| s.date);
        Ok(session)
    }

    pub fn add_activity(&mut self, activity: Activity) -> Result<Activity> {
        if self.activity(activity.date).is_some() {
            return Err(Error::already_exists(format!(
                "activity for {}",
                activity.date
            )));
        }
        self.activities.push(activity.clone());
        self.activities.sort_by_key(|a| a.date);
        Ok(activity)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 9, d).unwrap()
    }

    fn session(d: u32) -> ClassSession {
        ClassSession {
            name: format!("Clase {d}"),
            date: day(d),
            attendance_code: "A1B2".into(),
            resources: Vec::new(),
            attendance: Vec::new(),
        }
    }

    #[test]
    fn register_rejects_both_duplicate_ids() {
        let mut data = ClassroomData::default();
        data.register(&UserId::new("u1"), "2018-001").unwrap();
        assert!(matches!(
            data.register(&UserId::new("u1"), "2018-002"),
            Err(Error::AlreadyRegistered { .. })
        ));
        assert!(matches!(
            data.register(&UserId::new("u2"), "2018-001"),
            Err(Error::AlreadyRegistered { .. })
        ));
    }

    #[test]
    fn attendance_is_deduplicated_and_marks_session() {
        let mut data = ClassroomData::default();
        let user = UserId::new("u1");
        data.register(&user, "2018-001").unwrap();
        data.add_session(session(6)).unwrap();
        data.attend(&user, day(6)).unwrap();
        data.attend(&user, day(6)).unwrap();
        assert_eq!(data.student(&user).unwrap().attendance, vec![day(6)]);
        assert_eq!(data.session(day(6)).unwrap().attendance, vec!["2018-001"]);
    }

    #[test]
    fn participations_accumulate() {
        let mut data = ClassroomData::default();
        let user = UserId::new("u1");
        data.register(&user, "2018-001").unwrap();
        for _ in 0..3 {
            data.participate(&user, day(6)).unwrap();
        }
        assert_eq!(data.student(&user).unwrap().participations.len(), 3);
    }

    #[test]
    fn unregistered_writes_fail() {
        let mut data = ClassroomData::default();
        assert!(matches!(
            data.participate(&UserId::new("ghost"), day(6)),
            Err(Error::NotRegistered { .. })
        ));
    }

    #[test]
    fn second_submission_conflicts() {
        let mut data = ClassroomData::default();
        let user = UserId::new("u1");
        data.register(&user, "2018-001").unwrap();
        data.submit_activity(&user, day(6), "https://repo").unwrap();
        assert!(matches!(
            data.submit_activity(&user, day(6), "otra"),
            Err(Error::AlreadySubmitted { .. })
        ));
    }

    #[test]
    fn regrading_replaces_previous_grade() {
        let mut data = ClassroomData::default();
        let user = UserId::new("u1");
        data.register(&user, "2018-001").unwrap();
        data.grade_activity(&user, day(6), 7.0).unwrap();
        data.grade_activity(&user, day(6), 9.0).unwrap();
        let student = data.student(&user).unwrap();
        assert_eq!(student.activity_grades.len(), 1);
        assert_eq!(student.grade_for(day(6)), Some(9.0));
    }

    #[test]
    fn sessions_are_unique_per_day_and_sorted() {
        let mut data = ClassroomData::default();
        data.add_session(session(8)).unwrap();
        data.add_session(session(6)).unwrap();
        assert!(matches!(
            data.add_session(session(6)),
            Err(Error::AlreadyExists { .. })
        ));
        let dates: Vec<_> = data.sessions.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![day(6), day(8)]);
    }
}

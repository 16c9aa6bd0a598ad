//! Grade arithmetic. Pure functions over store records.

use {
    aula_config::PartialConfig,
    aula_store::{Activity, ClassSession, Student},
    chrono::NaiveDate,
    tracing::warn,
};

/// Participations that earn the full participation grade.
pub const FULL_PARTICIPATIONS: usize = 5;

/// Weight of the exam in the final grade.
pub const EXAM_WEIGHT: f64 = 0.8;

/// A grading period with inclusive bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Partial {
    /// Parse configured partials, dropping entries with bad dates.
    pub fn from_config(partials: &[PartialConfig]) -> Vec<Self> {
        partials
            .iter()
            .filter_map(|p| {
                let start = NaiveDate::parse_from_str(&p.start_date, "%Y-%m-%d");
                let end = NaiveDate::parse_from_str(&p.end_date, "%Y-%m-%d");
                match (start, end) {
                    (Ok(start), Ok(end)) => Some(Self {
                        name: p.name.clone(),
                        start,
                        end,
                    }),
                    _ => {
                        warn!(partial = %p.name, "skipping partial with unparseable dates");
                        None
                    },
                }
            })
            .collect()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn has_started(&self, today: NaiveDate) -> bool {
        self.start <= today
    }
}

/// Group `items` by partial, in partial order. Items outside every partial
/// are dropped, as are partials with no items.
pub fn split_into_partials<'p, T>(
    partials: &'p [Partial],
    items: Vec<T>,
    date_of: impl Fn(&T) -> NaiveDate,
) -> Vec<(&'p Partial, Vec<T>)> {
    let mut groups: Vec<(&Partial, Vec<T>)> = partials.iter().map(|p| (p, Vec::new())).collect();
    for item in items {
        let date = date_of(&item);
        if let Some((_, bucket)) = groups.iter_mut().find(|(p, _)| p.contains(date)) {
            bucket.push(item);
        }
    }
    groups.retain(|(_, bucket)| !bucket.is_empty());
    groups
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub name: String,
    pub date: NaiveDate,
    pub optional: bool,
    pub presented: bool,
    pub grade: Option<f64>,
}

pub fn activity_rows(activities: &[Activity], student: &Student) -> Vec<ActivityRow> {
    activities
        .iter()
        .map(|a| ActivityRow {
            name: a.name.chars().take(30).collect(),
            date: a.date,
            optional: a.optional,
            presented: student.submission(a.date).is_some(),
            grade: student.grade_for(a.date),
        })
        .collect()
}

/// Sum of grades over the count of mandatory activities. Optional work only
/// adds to the numerator.
pub fn activities_grade(rows: &[ActivityRow]) -> f64 {
    let mandatory = rows.iter().filter(|r| !r.optional).count();
    if mandatory == 0 {
        return 0.0;
    }
    let sum: f64 = rows.iter().filter_map(|r| r.grade).sum();
    sum / mandatory as f64
}

pub fn participations_grade(count: usize) -> f64 {
    (10.0 * count as f64 / FULL_PARTICIPATIONS as f64).clamp(0.0, 10.0)
}

pub fn total_grade(activities: f64, participations: f64, exam: f64) -> f64 {
    activities + participations + exam * EXAM_WEIGHT
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRow {
    pub name: String,
    pub date: NaiveDate,
    pub attended: bool,
}

pub fn attendance_rows(sessions: &[ClassSession], student: &Student) -> Vec<AttendanceRow> {
    sessions
        .iter()
        .map(|s| AttendanceRow {
            name: s.name.chars().take(30).collect(),
            date: s.date,
            attended: student.attendance.contains(&s.date),
        })
        .collect()
}

pub fn absences(rows: &[AttendanceRow]) -> usize {
    rows.iter().filter(|r| !r.attended).count()
}

/// Sessions held on or before `today`.
pub fn sessions_until(sessions: Vec<ClassSession>, today: NaiveDate) -> Vec<ClassSession> {
    sessions.into_iter().filter(|s| s.date <= today).collect()
}

/// Arithmetic mean; zero for an empty slice.
pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Mean of recorded activity grades; zero when none.
pub fn grade_average(student: &Student) -> f64 {
    let grades: Vec<f64> = student.activity_grades.iter().map(|g| g.grade).collect();
    average(&grades)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        aula_common::UserId,
        aula_store::{ActivityGrade, ActivitySubmission},
        chrono::Utc,
        rstest::rstest,
    };

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, m, day).unwrap()
    }

    fn partials() -> Vec<Partial> {
        Partial::from_config(&[
            PartialConfig {
                name: "Primer Parcial".into(),
                start_date: "2021-09-01".into(),
                end_date: "2021-10-15".into(),
            },
            PartialConfig {
                name: "Segundo Parcial".into(),
                start_date: "2021-10-16".into(),
                end_date: "2021-11-30".into(),
            },
            PartialConfig {
                name: "Roto".into(),
                start_date: "ayer".into(),
                end_date: "2021-12-01".into(),
            },
        ])
    }

    #[test]
    fn bad_partials_are_skipped() {
        assert_eq!(partials().len(), 2);
    }

    #[test]
    fn split_is_inclusive_and_ordered() {
        let partials = partials();
        let dates = vec![d(10, 16), d(9, 1), d(10, 15), d(12, 24)];
        let groups = split_into_partials(&partials, dates, |date| *date);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0.name, "Primer Parcial");
        assert_eq!(groups[0].1, vec![d(9, 1), d(10, 15)]);
        assert_eq!(groups[1].1, vec![d(10, 16)]);
    }

    #[rstest]
    #[case(0, 0.0)]
    #[case(2, 4.0)]
    #[case(5, 10.0)]
    #[case(9, 10.0)]
    fn participation_grade_is_clamped(#[case] count: usize, #[case] grade: f64) {
        assert_eq!(participations_grade(count), grade);
    }

    #[test]
    fn optional_activities_only_add() {
        let mut student = Student::new(UserId::new("u1"), "A001");
        student.activities.push(ActivitySubmission {
            activity: d(9, 6),
            presentation: "x".into(),
            time: Utc::now(),
        });
        student.activity_grades = vec![
            ActivityGrade { activity: d(9, 6), grade: 8.0 },
            ActivityGrade { activity: d(9, 8), grade: 6.0 },
        ];
        let activities = vec![
            Activity { name: "Tarea 1".into(), date: d(9, 6), optional: false, resources: vec![] },
            Activity { name: "Extra".into(), date: d(9, 8), optional: true, resources: vec![] },
            Activity { name: "Tarea 2".into(), date: d(9, 10), optional: false, resources: vec![] },
        ];
        let rows = activity_rows(&activities, &student);
        assert!(rows[0].presented);
        assert!(!rows[2].presented);
        assert_eq!(rows[1].grade, Some(6.0));
        assert_eq!(activities_grade(&rows), 7.0);
        assert_eq!(activities_grade(&rows[1..2]), 0.0);
    }

    #[test]
    fn total_weights_the_exam() {
        assert!((total_grade(7.0, 4.0, 50.0) - 51.0).abs() < 1e-9);
    }

    #[test]
    fn average_of_nothing_is_zero() {
        assert_eq!(average(&[]), 0.0);
        assert_eq!(average(&[2.0, 4.0]), 3.0);
    }
}

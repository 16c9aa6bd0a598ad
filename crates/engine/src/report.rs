//! Plain-text tables and the report documents built from them.

use {
    aula_store::{Activity, ClassSession, Student},
    chrono::NaiveDate,
};

use crate::{
    dates::format_date,
    grades::{self, Partial},
    quiz::DIVIDER,
};

const TITLE_SPACER: &str = "    ";

/// Left-aligned columns separated by `sep`. Widths count chars, so emoji
/// and accented names line up the same as ASCII.
pub fn render_table(rows: &[Vec<String>], sep: &str) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }
    rows.iter()
        .map(|row| {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    line.push_str(sep);
                }
                line.push_str(cell);
                let pad = widths[i].saturating_sub(cell.chars().count());
                line.extend(std::iter::repeat_n(' ', pad));
            }
            line.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Wrap in a chat code block.
pub fn code_block(body: &str) -> String {
    format!("```{body}```")
}

fn row<const N: usize>(cells: [&str; N]) -> Vec<String> {
    cells.iter().map(|c| (*c).to_string()).collect()
}

fn one_decimal(value: f64) -> String {
    format!("{value:.1}")
}

// ── Class summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct StudentSummary {
    pub name: String,
    pub university_id: String,
    pub participations: usize,
    pub activities: usize,
    pub activities_avg: Option<f64>,
    pub absences: usize,
}

impl StudentSummary {
    pub fn new(student: &Student, name: String, sessions_to_date: usize) -> Self {
        Self {
            name,
            university_id: student.university_id.clone(),
            participations: student.participations.len(),
            activities: student.activities.len(),
            activities_avg: (!student.activity_grades.is_empty())
                .then(|| grades::grade_average(student)),
            absences: sessions_to_date.saturating_sub(student.attendance.len()),
        }
    }

    /// Needs attention: no participations, no submitted work, or three or
    /// more absences.
    pub fn warning(&self) -> bool {
        self.participations == 0 || self.activities == 0 || self.absences >= 3
    }
}

fn count_or_dash(n: usize) -> String {
    if n == 0 { "-".into() } else { n.to_string() }
}

/// The class table and the averages table, each as a code block.
pub fn summary_tables(rows: &[StudentSummary]) -> (String, String) {
    let mut table = vec![row([
        "Name",
        "ID",
        "Participations",
        "Activities",
        "Activities Avg",
        "Absences",
        "Warning",
    ])];
    for s in rows {
        table.push(vec![
            s.name.clone(),
            s.university_id.clone(),
            count_or_dash(s.participations),
            count_or_dash(s.activities),
            s.activities_avg.map_or_else(|| "-".into(), one_decimal),
            s.absences.to_string(),
            if s.warning() { "YES".into() } else { String::new() },
        ]);
    }

    let participations: Vec<f64> = rows.iter().map(|s| s.participations as f64).collect();
    let activity_avgs: Vec<f64> = rows
        .iter()
        .map(|s| s.activities_avg.unwrap_or(0.0))
        .collect();
    let averages = vec![row(["Avg Participations", "Avg Activity Grades"]), vec![
        one_decimal(grades::average(&participations)),
        one_decimal(grades::average(&activity_avgs)),
    ]];

    (
        code_block(&render_table(&table, "  ")),
        code_block(&render_table(&averages, "  ")),
    )
}

/// Top and bottom `n` by participation count. Ties keep store order.
pub fn tops_bottoms(rows: &[StudentSummary], n: usize) -> String {
    let mut ranked: Vec<&StudentSummary> = rows.iter().collect();
    ranked.sort_by(|a, b| b.participations.cmp(&a.participations));
    let render = |title: &str, picked: Vec<&StudentSummary>| {
        let mut table = vec![row(["Name", "ID", "Participations"])];
        table.extend(picked.into_iter().map(|s| {
            vec![
                s.name.clone(),
                s.university_id.clone(),
                s.participations.to_string(),
            ]
        }));
        format!("{title}\n{}", code_block(&render_table(&table, "  ")))
    };
    let tops = ranked.iter().take(n).copied().collect();
    let bottoms = ranked.iter().rev().take(n).copied().collect();
    format!("{}\n{}", render("Tops:", tops), render("Bottoms:", bottoms))
}

// ── Student report ───────────────────────────────────────────────────────────

/// Everything one student's report is built from.
pub struct StudentReport<'a> {
    pub name: &'a str,
    pub generated_at: &'a str,
    pub student: &'a Student,
    /// Sessions held so far.
    pub sessions: &'a [ClassSession],
    pub activities: &'a [Activity],
    pub partials: &'a [Partial],
    pub today: NaiveDate,
}

impl StudentReport<'_> {
    pub fn render(&self) -> String {
        let mut out = vec![
            self.name.to_string(),
            self.generated_at.to_string(),
            DIVIDER.to_string(),
            String::new(),
        ];

        let mut activity_grades: Vec<(String, f64)> = Vec::new();
        out.push("Actividades:".into());
        let rows = grades::activity_rows(self.activities, self.student);
        for (partial, rows) in grades::split_into_partials(self.partials, rows, |r| r.date) {
            self.section_header(&mut out, partial);
            let mut table = vec![row([
                "Actividad",
                "Fecha",
                "Presentado",
                "Calificación",
                "Opcional",
            ])];
            for r in &rows {
                table.push(vec![
                    r.name.clone(),
                    format_date(r.date),
                    yes_no(r.presented),
                    r.grade.map(|g| g.to_string()).unwrap_or_default(),
                    if r.optional { "(opcional)".into() } else { String::new() },
                ]);
            }
            out.push(render_table(&table, " | "));
            let grade = grades::activities_grade(&rows);
            out.push(format!("Nota acumulada (no final): {grade:.1} / 10.0"));
            activity_grades.push((partial.name.clone(), grade));
        }
        out.push(String::new());

        let mut participation_grades: Vec<(String, f64)> = Vec::new();
        out.push("Participaciones:".into());
        let dates: Vec<NaiveDate> = self.student.participations.iter().map(|p| p.date).collect();
        for (partial, dates) in grades::split_into_partials(self.partials, dates, |d| *d) {
            self.section_header(&mut out, partial);
            out.extend(dates.iter().map(|d| format_date(*d)));
            let grade = grades::participations_grade(dates.len());
            out.push(format!("Total Participaciones: {}", dates.len()));
            out.push(format!("Nota acumulada (no final): {grade:.1} / 10.0"));
            participation_grades.push((partial.name.clone(), grade));
        }
        out.push(String::new());

        out.push("Asistencia:".into());
        let rows = grades::attendance_rows(self.sessions, self.student);
        for (partial, rows) in grades::split_into_partials(self.partials, rows, |r| r.date) {
            self.section_header(&mut out, partial);
            let mut table = vec![row(["Sesión", "Fecha", "Asistencia"])];
            for r in &rows {
                table.push(vec![r.name.clone(), format_date(r.date), yes_no(r.attended)]);
            }
            out.push(render_table(&table, " | "));
            out.push(format!("Ausencias: {}", grades::absences(&rows)));
        }
        out.push(String::new());

        out.push("Nota final:".into());
        let lookup = |grades: &[(String, f64)], name: &str| {
            grades
                .iter()
                .find(|(n, _)| n == name)
                .map_or(0.0, |(_, g)| *g)
        };
        for partial in self.partials.iter().filter(|p| p.has_started(self.today)) {
            self.section_header(&mut out, partial);
            let activities = lookup(&activity_grades, &partial.name);
            let participations = lookup(&participation_grades, &partial.name);
            let exam = self.student.exam_grade(&partial.name).unwrap_or(0.0);
            let table = vec![
                row(["Actividades", "Participaciones", "Examen", "Nota Final"]),
                vec![
                    one_decimal(activities),
                    one_decimal(participations),
                    one_decimal(exam),
                    one_decimal(grades::total_grade(activities, participations, exam)),
                ],
            ];
            out.push(render_table(&table, " | "));
        }

        out.join("\n")
    }

    fn section_header(&self, out: &mut Vec<String>, partial: &Partial) {
        out.push(DIVIDER.into());
        out.push(format!("{TITLE_SPACER}{}", partial.name));
        out.push(DIVIDER.into());
    }
}

fn yes_no(value: bool) -> String {
    if value { "SI".into() } else { "NO".into() }
}

/// File-name friendly form of a display name.
pub fn file_stem(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

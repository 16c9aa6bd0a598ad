//! Configuration validation engine.
//!
//! Validates config files against the known schema, detects unknown or
//! misspelled fields, and reports classroom settings that would make the
//! bot misbehave at runtime (unparsable times, inverted windows, missing
//! teacher id).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use secrecy::ExposeSecret;

use crate::schema::{AulaConfig, parse_clock_time};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "schedule",
    /// "identity", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "class.start_time"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

enum KnownKeys {
    Struct(HashMap<&'static str, KnownKeys>),
    /// Dynamic keys (e.g. grade gestures) with scalar values.
    Map,
    Array(Box<KnownKeys>),
    Leaf,
}

fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Array, Leaf, Map, Struct};

    let fields = |names: &[&'static str]| {
        Struct(names.iter().map(|name| (*name, Leaf)).collect())
    };

    Struct(HashMap::from([
        ("bot", fields(&["prefix", "maintenance", "timezone"])),
        ("discord", fields(&["token", "guild_id"])),
        ("teacher", fields(&["id", "admins"])),
        (
            "channels",
            fields(&[
                "attendance",
                "participations",
                "activities",
                "activities_presented",
                "announcements",
                "main_voice",
            ]),
        ),
        (
            "class",
            fields(&[
                "name",
                "code",
                "start_time",
                "end_time",
                "attendance_end_time",
                "activity_deadline",
            ]),
        ),
        (
            "partials",
            Array(Box::new(fields(&["name", "start_date", "end_date"]))),
        ),
        (
            "quiz",
            fields(&[
                "question_time_secs",
                "tick_interval_ms",
                "countdown_step_ms",
                "ack_emojis",
            ]),
        ),
        (
            "emojis",
            fields(&[
                "success",
                "error",
                "thumbs_up",
                "participation_request",
                "approve",
            ]),
        ),
        ("grades", Struct(HashMap::from([("gestures", Map)]))),
        ("presence", fields(&["require_desktop"])),
        ("registration", fields(&["form_title", "form_url"])),
        (
            "schedule",
            fields(&["enabled", "attendance_warning_minutes"]),
        ),
        ("storage", fields(&["path"])),
        ("reports", fields(&["dir"])),
    ]))
}

// ── Levenshtein distance ────────────────────────────────────────────────────

fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    let mut best: Option<(&'a str, usize)> = None;
    for &candidate in candidates {
        let d = levenshtein(needle, candidate);
        if d > 0 && d <= max_distance && best.as_ref().is_none_or(|(_, bd)| d < *bd) {
            best = Some((candidate, d));
        }
    }
    best.map(|(s, _)| s)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Info,
                "file-ref",
                "",
                "no config file found; using defaults",
            )],
            config_path: None,
        };
    };

    let value = match crate::loader::load_config_value(&actual_path) {
        Ok(value) => value,
        Err(e) => {
            return ValidationResult {
                diagnostics: vec![Diagnostic::new(
                    Severity::Error,
                    "syntax",
                    "",
                    format!("failed to parse config file: {e}"),
                )],
                config_path: Some(actual_path),
            };
        },
    };

    let mut result = validate_value(value);
    result.config_path = Some(actual_path);
    result
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let parsed = toml::from_str::<toml::Value>(toml_str)
        .map_err(|e| e.to_string())
        .and_then(|v| serde_json::to_value(v).map_err(|e| e.to_string()));
    match parsed {
        Ok(value) => validate_value(value),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::new(
                Severity::Error,
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            )],
            config_path: None,
        },
    }
}

fn validate_value(value: serde_json::Value) -> ValidationResult {
    let mut diagnostics = Vec::new();

    let schema = build_schema_map();
    check_unknown_fields(&value, &schema, "", &mut diagnostics);

    match serde_json::from_value::<AulaConfig>(value) {
        Ok(config) => check_semantic_warnings(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "type-error",
            "",
            format!("type error: {e}"),
        )),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Walk the value tree against the schema tree and flag unknown keys.
fn check_unknown_fields(
    value: &serde_json::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match (value, schema) {
        (serde_json::Value::Object(table), KnownKeys::Struct(fields)) => {
            let known_keys: Vec<&str> = fields.keys().copied().collect();
            for (key, child_value) in table {
                let path = join_path(prefix, key);
                if let Some(child_schema) = fields.get(key.as_str()) {
                    check_unknown_fields(child_value, child_schema, &path, diagnostics);
                    continue;
                }
                let message = match suggest(key, &known_keys, 3) {
                    Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                    None => "unknown field".to_string(),
                };
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "unknown-field",
                    path,
                    message,
                ));
            }
        },
        (serde_json::Value::Array(items), KnownKeys::Array(item_schema)) => {
            for (i, item) in items.iter().enumerate() {
                let path = format!("{prefix}[{i}]");
                check_unknown_fields(item, item_schema, &path, diagnostics);
            }
        },
        // Leaf, free-form map, or type mismatch (caught by deserialization)
        _ => {},
    }
}

/// Run semantic checks on a successfully parsed config.
fn check_semantic_warnings(config: &AulaConfig, diagnostics: &mut Vec<Diagnostic>) {
    if config.teacher.id.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "identity",
            "teacher.id",
            "teacher id is required; approvals and admin commands depend on it",
        ));
    }

    if config.discord.token.expose_secret().is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "identity",
            "discord.token",
            "no bot token configured; only `aula simulate` will work",
        ));
    }

    if config.bot.tz().is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "schedule",
            "bot.timezone",
            format!("unknown timezone \"{}\"", config.bot.timezone),
        ));
    }

    let class = &config.class;
    let times = [
        ("class.start_time", &class.start_time),
        ("class.end_time", &class.end_time),
        ("class.attendance_end_time", &class.attendance_end_time),
        ("class.activity_deadline", &class.activity_deadline),
    ];
    for (path, value) in times {
        if parse_clock_time(value).is_none() {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "schedule",
                path,
                format!("\"{value}\" is not an HH:MM time"),
            ));
        }
    }

    let start = parse_clock_time(&class.start_time);
    let end = parse_clock_time(&class.end_time);
    let attendance_end = parse_clock_time(&class.attendance_end_time);
    if let (Some(start), Some(end)) = (start, end)
        && start >= end
    {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "schedule",
            "class.end_time",
            "class must end after it starts",
        ));
    }
    if let (Some(start), Some(attendance_end)) = (start, attendance_end)
        && attendance_end <= start
    {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "schedule",
            "class.attendance_end_time",
            "attendance window closes before the class starts; nobody can check in",
        ));
    }

    let mut ranges: Vec<(usize, chrono::NaiveDate, chrono::NaiveDate)> = Vec::new();
    for (i, partial) in config.partials.iter().enumerate() {
        let start = chrono::NaiveDate::parse_from_str(&partial.start_date, "%Y-%m-%d");
        let end = chrono::NaiveDate::parse_from_str(&partial.end_date, "%Y-%m-%d");
        match (start, end) {
            (Ok(start), Ok(end)) if start > end => diagnostics.push(Diagnostic::new(
                Severity::Error,
                "schedule",
                format!("partials[{i}]"),
                "partial ends before it starts",
            )),
            (Ok(start), Ok(end)) => {
                if let Some((other, ..)) = ranges
                    .iter()
                    .find(|(_, s, e)| start <= *e && *s <= end)
                {
                    diagnostics.push(Diagnostic::new(
                        Severity::Warning,
                        "schedule",
                        format!("partials[{i}]"),
                        format!("overlaps partials[{other}]; grades may count twice"),
                    ));
                }
                ranges.push((i, start, end));
            },
            _ => diagnostics.push(Diagnostic::new(
                Severity::Error,
                "schedule",
                format!("partials[{i}]"),
                "partial dates must be YYYY-MM-DD",
            )),
        }
    }

    for (emoji, grade) in &config.grades.gestures {
        if grade.parse::<f64>().is_err() {
            diagnostics.push(Diagnostic::new(
                Severity::Error,
                "type-error",
                format!("grades.gestures.{emoji}"),
                format!("grade \"{grade}\" is not a number"),
            ));
        }
    }

    if config.quiz.ack_emojis.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "schedule",
            "quiz.ack_emojis",
            "at least one acknowledgement emoji is needed to start a quiz",
        ));
    }

    if config.quiz.question_time_secs == 0 || config.quiz.tick_interval_ms == 0 {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "schedule",
            "quiz",
            "quiz question time and tick interval must be positive",
        ));
    }

    let channels = [
        ("channels.attendance", &config.channels.attendance),
        ("channels.participations", &config.channels.participations),
        ("channels.activities", &config.channels.activities),
        (
            "channels.activities_presented",
            &config.channels.activities_presented,
        ),
        ("channels.announcements", &config.channels.announcements),
    ];
    for (path, id) in channels {
        if id.is_empty() {
            diagnostics.push(Diagnostic::new(
                Severity::Warning,
                "identity",
                path,
                "channel not configured; commands bound to it will never run",
            ));
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        [bot]
        timezone = "America/La_Paz"

        [discord]
        token = "abc"

        [teacher]
        id = "1"

        [channels]
        attendance = "10"
        participations = "11"
        activities = "12"
        activities_presented = "13"
        announcements = "14"
    "#;

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("class", "clas"), 1);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        let result = validate_toml_str(VALID);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    }

    #[test]
    fn misspelled_section_gets_suggestion() {
        let raw = format!("{VALID}\n[clas]\nname = \"Redes\"\n");
        let result = validate_toml_str(&raw);
        assert!(result.has_errors());
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(diag.path, "clas");
        assert!(diag.message.contains("\"class\""));
    }

    #[test]
    fn unknown_field_inside_partials_array() {
        let raw = format!(
            "{VALID}\n[[partials]]\nname = \"P1\"\nstart_date = \"2021-09-01\"\nend_date = \"2021-10-01\"\nfinal = true\n"
        );
        let result = validate_toml_str(&raw);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "partials[0].final")
        );
    }

    #[test]
    fn inverted_class_window_is_an_error() {
        let raw = format!("{VALID}\n[class]\nstart_time = \"09:00\"\nend_time = \"08:00\"\n");
        let result = validate_toml_str(&raw);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "class.end_time" && d.severity == Severity::Error)
        );
    }

    #[test]
    fn missing_teacher_and_bad_time() {
        let result = validate_toml_str("[class]\nstart_time = \"7am\"\n");
        assert!(result.diagnostics.iter().any(|d| d.path == "teacher.id"));
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "class.start_time")
        );
        assert!(result.count(Severity::Warning) >= 1);
    }

    #[test]
    fn overlapping_partials_warn() {
        let raw = format!(
            "{VALID}\n[[partials]]\nname = \"P1\"\nstart_date = \"2021-09-01\"\nend_date = \"2021-10-15\"\n\n[[partials]]\nname = \"P2\"\nstart_date = \"2021-10-10\"\nend_date = \"2021-11-30\"\n"
        );
        let result = validate_toml_str(&raw);
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.path == "partials[1]")
            .unwrap();
        assert_eq!(diag.severity, Severity::Warning);
        assert!(!result.has_errors());
    }

    #[test]
    fn non_numeric_gesture_grade() {
        let raw = format!("{VALID}\n[grades.gestures]\n\"🅰️\" = \"A\"\n");
        let result = validate_toml_str(&raw);
        assert!(result.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn syntax_error_short_circuits() {
        let result = validate_toml_str("[bot\nprefix=");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }

    #[test]
    fn validate_reads_yaml_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aula.yaml");
        std::fs::write(&path, "teacher:\n  id: \"1\"\nbot:\n  timezon: UTC\n").unwrap();
        let result = validate(Some(&path));
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
        assert!(result.diagnostics.iter().any(|d| d.path == "bot.timezon"));
    }
}

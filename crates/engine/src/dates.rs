//! Argument parsing shared by admin commands.

use {aula_store::Resource, chrono::NaiveDate};

use crate::error::{CommandError, Result};

/// Accepts `YYYY-MM-DD`, `MM-DD-YYYY`, or `today`.
pub fn parse_date_arg(raw: &str, today: NaiveDate) -> Result<NaiveDate> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("today") {
        return Ok(today);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m-%d-%Y"))
        .map_err(|_| CommandError::validation(format!("Fecha invalida: {raw}")))
}

/// `name|value`; a token without a separator is a bare value.
pub fn parse_resource(token: &str) -> Resource {
    match token.split_once('|') {
        Some((name, value)) => Resource {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        },
        None => Resource {
            name: "Recurso".into(),
            value: token.trim().to_string(),
        },
    }
}

pub fn parse_grade(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|g| g.is_finite() && *g >= 0.0)
        .ok_or_else(|| CommandError::validation(format!("Nota invalida: {raw}")))
}

/// Iso-style local date for file headers and replies.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

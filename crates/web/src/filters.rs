//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Turkish label for a stored skin type code.
///
/// Usage in templates: `{{ analysis.skin_type|skin_type_label }}`
#[askama::filter_fn]
pub fn skin_type_label(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(skin_type_text(&value.to_string()).to_string())
}

/// Turkish label for a stored gender code.
#[askama::filter_fn]
pub fn gender_label(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let label = match value.to_string().as_str() {
        "female" => "Kadın",
        "male" => "Erkek",
        "other" => "Diğer",
        "" => "Belirtilmemiş",
        other => return Ok(other.to_string()),
    };
    Ok(label.to_string())
}

/// Format a number with one decimal place.
///
/// Usage in templates: `{{ stats.avg_acne|one_decimal }}`
#[askama::filter_fn]
pub fn one_decimal(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    Ok(text
        .parse::<f64>()
        .map_or(text, |n| format!("{n:.1}")))
}

/// Skin type codes offered in profile forms, with labels.
pub const SKIN_TYPES: &[(&str, &str)] = &[
    ("normal", "Normal"),
    ("dry", "Kuru"),
    ("oily", "Yağlı"),
    ("combination", "Karma"),
    ("sensitive", "Hassas"),
];

fn skin_type_text(code: &str) -> &str {
    if let Some((_, label)) = SKIN_TYPES.iter().find(|(c, _)| *c == code) {
        return label;
    }
    match code {
        "" | "unknown" => "Belirlenemedi",
        other => other,
    }
}

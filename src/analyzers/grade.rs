use serde::Serialize;

/// Severity badge of a top speed in the report tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Warning,
    Danger,
}

impl Severity {
    pub fn css_class(self) -> &'static str {
        match self {
            Severity::Ok => "badge-success",
            Severity::Warning => "badge-warning",
            Severity::Danger => "badge-danger",
        }
    }
}

/// Converts a top speed (km/h) into a severity.
///
/// | Range       | Severity |
/// |-------------|----------|
/// | >= 120      | Danger   |
/// | >= 100      | Warning  |
/// | < 100       | Ok       |
pub fn grade(speed: f64) -> Severity {
    match speed {
        s if s >= 120.0 => Severity::Danger,
        s if s >= 100.0 => Severity::Warning,
        _ => Severity::Ok,
    }
}

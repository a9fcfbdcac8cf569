use chrono::NaiveDate;

/// A date as reported by the API, which may be a full `YYYY-MM-DD`, a
/// year-month, or a bare year. The original string is always kept; the
/// parsed value is `None` whenever the string isn't a complete calendar
/// date, per the spec's "preserve both forms" requirement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialDate {
    pub raw: String,
    pub parsed: Option<NaiveDate>,
}

impl PartialDate {
    /// Parses an API date string. Only `YYYY-MM-DD` yields a `parsed` value;
    /// `YYYY-MM` and `YYYY` are retained as `raw` with `parsed = None`.
    pub fn parse(raw: &str) -> Self {
        let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
        Self { raw: raw.to_string(), parsed }
    }
}

use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, OffsetDateTime,
};

const DAY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Whole-second RFC 3339 so stored timestamps compare correctly as text.
pub fn rfc3339(at: OffsetDateTime) -> String {
    at.replace_nanosecond(0)
        .unwrap_or(at)
        .format(&Rfc3339)
        .unwrap_or_default()
}

pub fn now_rfc3339() -> String {
    rfc3339(OffsetDateTime::now_utc())
}

/// Current UTC date as `YYYY-MM-DD`.
pub fn today() -> String {
    OffsetDateTime::now_utc()
        .date()
        .format(DAY_FORMAT)
        .unwrap_or_default()
}

pub fn parse_day(raw: &str) -> Option<Date> {
    Date::parse(raw, DAY_FORMAT).ok()
}

use chrono::NaiveDate;

pub const LINKS_FILE_PREFIX: &str = "links_";

/// `links_{YYYY-MM-DD}.txt` for the given calendar date.
pub fn dated_filename(date: NaiveDate) -> String {
    format!("{LINKS_FILE_PREFIX}{}.txt", date.format("%Y-%m-%d"))
}

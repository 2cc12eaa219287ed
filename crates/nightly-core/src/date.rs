//! Calendar date of a run, in the two spellings the site uses.

use chrono::{Datelike, Local, NaiveDate};

/// The day a nightly run is stamped with.
///
/// Fixed once per run so every artifact name and heading agrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunDate(NaiveDate);

impl RunDate {
    /// Today in local time.
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// `YYYYMMDD`, used in artifact file names.
    pub fn stamp(&self) -> String {
        format!("{:04}{:02}{:02}", self.0.year(), self.0.month(), self.0.day())
    }

    /// `MM / DD / YYYY`, used in page headings.
    pub fn heading(&self) -> String {
        format!(
            "{:02} / {:02} / {:04}",
            self.0.month(),
            self.0.day(),
            self.0.year()
        )
    }
}

impl From<NaiveDate> for RunDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_and_heading_are_zero_padded() {
        let date = RunDate::from_ymd(2006, 5, 1).unwrap();
        assert_eq!(date.stamp(), "20060501");
        assert_eq!(date.heading(), "05 / 01 / 2006");
    }

    #[test]
    fn test_invalid_date() {
        assert!(RunDate::from_ymd(2006, 2, 30).is_none());
    }
}

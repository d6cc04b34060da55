use chrono::{Datelike, NaiveDate};
use serde::{Serialize, Serializer};

/// UK Tax Year (runs 6 April to 5 April)
/// The year value represents the end year (e.g., 2025 = 2024/25 tax year)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxYear(pub i32);

impl TaxYear {
    /// Tax year a disposal on `date` is reported in
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year();
        if (date.month(), date.day()) >= (4, 6) {
            TaxYear(year + 1)
        } else {
            TaxYear(year)
        }
    }

    /// Display as "2024/25" format
    pub fn display(&self) -> String {
        format!("{}/{:02}", self.0 - 1, self.0 % 100)
    }
}

impl std::fmt::Display for TaxYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl Serialize for TaxYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_year_from_date_before_april_6() {
        // 5 April 2024 is in 2023/24 tax year
        let date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        assert_eq!(TaxYear::from_date(date), TaxYear(2024));
    }

    #[test]
    fn tax_year_from_date_on_april_6() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 6).unwrap();
        assert_eq!(TaxYear::from_date(date), TaxYear(2025));
    }

    #[test]
    fn tax_year_from_date_december() {
        let date = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        assert_eq!(TaxYear::from_date(date), TaxYear(2023));
    }

    #[test]
    fn tax_year_display() {
        assert_eq!(TaxYear(2024).display(), "2023/24");
        assert_eq!(TaxYear(2001).display(), "2000/01");
    }

    #[test]
    fn serializes_as_display_string() {
        assert_eq!(serde_json::to_string(&TaxYear(2023)).unwrap(), "\"2022/23\"");
    }
}

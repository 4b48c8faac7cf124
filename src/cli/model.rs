use std::time::Duration;

use tabled::Tabled;

#[derive(Tabled)]
pub struct LookupRow {
    pub id: String,
    pub phone: String,
    pub status: String,
    pub elapsed: String,
}

impl LookupRow {
    pub fn new(id: &str, phone: Option<String>, elapsed: Duration) -> Self {
        let status = if phone.is_some() { "found" } else { "not found" };
        Self {
            id: id.to_string(),
            phone: phone.unwrap_or_else(|| "-".to_string()),
            status: status.to_string(),
            elapsed: format!("{:.1}s", elapsed.as_secs_f64()),
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == "found"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found() {
        let row = LookupRow::new("UNKNOWN", None, Duration::from_secs(30));
        assert!(!row.is_found());
        assert_eq!(row.phone, "-");
        assert_eq!(row.elapsed, "30.0s");
    }

    #[test]
    fn test_row_found() {
        let row = LookupRow::new("J.DOE", Some("+33612345678".to_string()), Duration::from_millis(300));
        assert!(row.is_found());
        assert_eq!(row.elapsed, "0.3s");
    }
}

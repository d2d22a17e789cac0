// src/common/dates.rs

use chrono::NaiveDate;

// Formato único aceito na fronteira da API (ISO-8601, só a data)
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), WIRE_DATE_FORMAT).ok()
}

/// Usado pelo `validator` nos payloads que trazem datas como texto.
pub fn validate_wire_date(raw: &str) -> Result<(), validator::ValidationError> {
    if parse_wire_date(raw).is_some() {
        return Ok(());
    }
    let mut err = validator::ValidationError::new("invalid_date_format");
    err.message = Some("A data deve estar no formato YYYY-MM-DD".into());
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_iso_dates() {
        assert_eq!(parse_wire_date("2024-03-09"), NaiveDate::from_ymd_opt(2024, 3, 9));
        assert!(parse_wire_date("03/09/2024").is_none());
        assert!(parse_wire_date("09-03-2024").is_none());
        assert!(parse_wire_date("2024-02-30").is_none());
    }

    #[test]
    fn validator_hook_reports_format_code() {
        let err = validate_wire_date("31/12/2024").unwrap_err();
        assert_eq!(err.code, "invalid_date_format");
        assert!(validate_wire_date("2024-12-31").is_ok());
    }
}

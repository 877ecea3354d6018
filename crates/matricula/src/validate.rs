use chrono::NaiveDate;

/// National identity numbers are fixed-length numeric strings.
pub fn is_dni(value: &str) -> bool {
    value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())
}

/// School-year labels are exactly four digits.
pub fn is_year_label(value: &str) -> bool {
    value.len() == 4 && value.bytes().all(|b| b.is_ascii_digit())
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// Loose shape check; delivery problems are the mail server's business.
pub fn is_email(value: &str) -> bool {
    let mut parts = value.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dni_requires_exactly_eight_digits() {
        assert!(is_dni("12345678"));
        assert!(!is_dni("1234567"));
        assert!(!is_dni("123456789"));
        assert!(!is_dni("1234567a"));
        assert!(!is_dni(""));
    }

    #[test]
    fn year_label_requires_exactly_four_digits() {
        assert!(is_year_label("2024"));
        assert!(!is_year_label("24"));
        assert!(!is_year_label("20245"));
        assert!(!is_year_label("2O24"));
    }

    #[test]
    fn dates_parse_as_iso_calendar_dates() {
        assert_eq!(
            parse_date("2024-06-01"),
            Ok(NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid date"))
        );
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("01/06/2024").is_err());
    }

    #[test]
    fn email_check_accepts_plausible_addresses_only() {
        assert!(is_email("familia@example.com"));
        assert!(!is_email("familia"));
        assert!(!is_email("familia@"));
        assert!(!is_email("a@b@c.com"));
    }
}

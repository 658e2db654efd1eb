/// Validate an email: must contain '@' and '.', max 254 chars.
pub fn validate_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some("Email is required".to_string());
    }
    if trimmed.len() > 254 {
        return Some("Email must be at most 254 characters".to_string());
    }
    if !trimmed.contains('@') || !trimmed.contains('.') {
        return Some("Email must be a valid address (contain '@' and '.')".to_string());
    }
    None
}

/// Validate a required text field with a max length.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    if trimmed.len() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Validate an optional text field with a max length (empty is OK).
pub fn validate_optional(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if !trimmed.is_empty() && trimmed.len() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Validate an optional ISO date (YYYY-MM-DD).
pub fn validate_date(value: Option<&str>, field_name: &str) -> Option<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .err()
            .map(|_| format!("{field_name} must be a date (YYYY-MM-DD)")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert!(validate_email("").is_some());
        assert!(validate_email("   ").is_some());
        assert!(validate_email("sarah").is_some());
        assert!(validate_email("sarah.johnson@email.com").is_none());
    }

    #[test]
    fn required_and_optional() {
        assert_eq!(
            validate_required(" ", "First name", 100),
            Some("First name is required".to_string())
        );
        assert!(validate_required("Sarah", "First name", 100).is_none());
        assert!(validate_required("abcdef", "Name", 3).is_some());
        assert!(validate_optional("", "Notes", 3).is_none());
        assert!(validate_optional("abcd", "Notes", 3).is_some());
    }

    #[test]
    fn dates() {
        assert!(validate_date(None, "Date of birth").is_none());
        assert!(validate_date(Some(""), "Date of birth").is_none());
        assert!(validate_date(Some("1985-03-15"), "Date of birth").is_none());
        assert!(validate_date(Some("15/03/1985"), "Date of birth").is_some());
    }
}

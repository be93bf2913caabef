use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[0-9 ()\-]{6,}$").expect("valid phone regex")
});

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("valid url regex")
});

/// Collects field-level problems so a request reports all of them at once.
#[derive(Debug, Default)]
pub struct FieldValidator {
    errors: Vec<String>,
}

impl FieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.errors.push(format!("{} is required", field));
        }
        self
    }

    pub fn max_length(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if value.chars().count() > max {
            self.errors.push(format!("{} cannot exceed {} characters", field, max));
        }
        self
    }

    pub fn optional_max_length(&mut self, field: &str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            self.max_length(field, value, max);
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.is_empty() && !EMAIL_PATTERN.is_match(value) {
            self.errors.push(format!("{} is not a valid email address", field));
        }
        self
    }

    pub fn optional_phone(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(phone) = value.filter(|p| !p.is_empty()) {
            if !PHONE_PATTERN.is_match(phone) {
                self.errors.push(format!("{} is not a valid phone number", field));
            }
        }
        self
    }

    pub fn optional_url(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if let Some(url) = value.filter(|u| !u.is_empty()) {
            if !URL_PATTERN.is_match(url) {
                self.errors.push(format!("{} must be an absolute http(s) URL", field));
            }
        }
        self
    }

    pub fn int_range(&mut self, field: &str, value: i64, min: i64, max: i64) -> &mut Self {
        if value < min || value > max {
            self.errors.push(format!("{} must be between {} and {}", field, min, max));
        }
        self
    }

    pub fn decimal_range(&mut self, field: &str, value: Decimal, min: Decimal, max: Decimal) -> &mut Self {
        if value < min || value > max {
            self.errors.push(format!("{} must be between {} and {}", field, min, max));
        }
        self
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        self.errors.extend(password_policy_violations(value)
            .into_iter()
            .map(|rule| format!("{} {}", field, rule)));
        self
    }

    pub fn check(&mut self, condition: bool, message: impl Into<String>) -> &mut Self {
        if !condition {
            self.errors.push(message.into());
        }
        self
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn finish(&self) -> Result<(), String> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors.join("; "))
        }
    }
}

/// Password rules: at least 8 characters with a digit, a lowercase letter,
/// an uppercase letter and a non-alphanumeric character.
pub fn password_policy_violations(password: &str) -> Vec<&'static str> {
    let mut violations = Vec::new();
    if password.chars().count() < 8 {
        violations.push("must be at least 8 characters long");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("must contain a digit");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        violations.push("must contain a lowercase letter");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        violations.push("must contain an uppercase letter");
    }
    if !password.chars().any(|c| !c.is_alphanumeric()) {
        violations.push("must contain a non-alphanumeric character");
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_failure() {
        let mut v = FieldValidator::new();
        v.required("First name", "  ")
            .email("Email", "not-an-email")
            .max_length("Bio", &"x".repeat(501), 500);

        assert_eq!(v.errors().len(), 3);
        let message = v.finish().unwrap_err();
        assert!(message.contains("First name is required"));
        assert!(message.contains("Bio cannot exceed 500 characters"));
    }

    #[test]
    fn accepts_valid_contact_fields() {
        let mut v = FieldValidator::new();
        v.email("Email", "dr.smith@clinic.co.za")
            .optional_phone("Phone", Some("+27 21 555-0100"))
            .optional_url("Image", Some("https://cdn.example.com/a.png"))
            .optional_phone("Phone", None);
        assert!(v.finish().is_ok());
    }

    #[test]
    fn password_policy() {
        assert!(password_policy_violations("User@123").is_empty());
        assert_eq!(password_policy_violations("short").len(), 4);
        assert_eq!(password_policy_violations("alllowercase1!"), vec!["must contain an uppercase letter"]);
    }

    #[test]
    fn decimal_bounds_are_inclusive() {
        let mut v = FieldValidator::new();
        v.decimal_range("Price", Decimal::new(1, 2), Decimal::new(1, 2), Decimal::new(10000, 0));
        assert!(v.finish().is_ok());

        let mut v = FieldValidator::new();
        v.decimal_range("Price", Decimal::ZERO, Decimal::new(1, 2), Decimal::new(10000, 0));
        assert!(v.finish().is_err());
    }
}

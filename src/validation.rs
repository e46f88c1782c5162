use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Accumulated validation failures for one request. Field messages are keyed
/// by input field name; non-field codes cover cross-field checks such as the
/// password confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ValidationErrors {
    pub field_errors: BTreeMap<String, Vec<String>>,
    pub non_field_errors: Vec<String>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, code: impl Into<String>) {
        self.non_field_errors.push(code.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .field_errors
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();
        parts.extend(self.non_field_errors.iter().cloned());
        write!(f, "{}", parts.join("; "))
    }
}

fn full_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Letters (including accented Latin), spaces, hyphens and apostrophes.
    RE.get_or_init(|| Regex::new(r"^[a-zA-ZÀ-ɏ' -]+$").unwrap())
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
}

/// Validate a submitted full name. Returns the first applicable message, in
/// presence, length, charset order.
#[must_use]
pub fn full_name_error(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("Please enter your full name.");
    }
    let length = trimmed.chars().count();
    if length < 3 {
        return Some("The full name must be at least 3 characters long.");
    }
    if length > 50 {
        return Some("The full name must be 50 characters long maximum.");
    }
    if !full_name_regex().is_match(trimmed) {
        return Some("The full name field only accepts letters, hyphen and apostrophe.");
    }
    None
}

/// Validate a submitted email for presence and shape. Uniqueness is checked
/// against the store separately.
#[must_use]
pub fn email_error(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("Please enter your email.");
    }
    if !email_regex().is_match(trimmed) {
        return Some("This email address is not valid.");
    }
    None
}

pub const EMAIL_TAKEN: &str = "This email is already used.";

/// Validate a standalone first name for presence and length.
#[must_use]
pub fn first_name_error(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("Please enter your first name.");
    }
    if trimmed.chars().count() > 100 {
        return Some("The first name must be 100 characters long maximum.");
    }
    None
}

/// Validate a standalone last name for presence and length.
#[must_use]
pub fn last_name_error(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("Please enter your last name.");
    }
    if trimmed.chars().count() > 100 {
        return Some("The last name must be 100 characters long maximum.");
    }
    None
}

#[must_use]
pub fn password_error(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("Please enter a password.");
    }
    let length = trimmed.chars().count();
    if length < 6 {
        return Some("Password must be at least 6 characters long.");
    }
    if length > 50 {
        return Some("Password must be 50 characters long maximum.");
    }
    None
}

/// Non-field code reported when a password and its confirmation differ.
pub const PASSWORD_MISMATCH: &str = "PASSWORD_MISMATCH";

/// Code-style password check used by the token-gated set-password flows,
/// where the caller is a machine following a link rather than a form.
#[must_use]
pub fn password_code_error(value: &str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some("PASSWORD_REQUIRED");
    }
    let length = trimmed.chars().count();
    if length < 6 {
        return Some("PASSWORD_TOO_SHORT");
    }
    if length > 50 {
        return Some("PASSWORD_TOO_LONG");
    }
    None
}

/// Normalize an email for storage and lookup.
#[must_use]
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Split a validated full name on the first space. A name without a space
/// becomes the first name in full.
#[must_use]
pub fn split_full_name(value: &str) -> (String, String) {
    let trimmed = value.trim();
    match trimmed.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.trim().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_accepts_plain_names() {
        assert_eq!(full_name_error("Ethan Sky Blue"), None);
        assert_eq!(full_name_error("  Anne-Marie O'Neil  "), None);
        assert_eq!(full_name_error("Renée"), None);
    }

    #[test]
    fn test_full_name_presence_and_length() {
        assert_eq!(full_name_error("   "), Some("Please enter your full name."));
        assert_eq!(
            full_name_error("ab"),
            Some("The full name must be at least 3 characters long.")
        );
        assert_eq!(
            full_name_error(&"a".repeat(51)),
            Some("The full name must be 50 characters long maximum.")
        );
    }

    #[test]
    fn test_full_name_rejects_symbols_and_digits() {
        assert_eq!(
            full_name_error("ab $ 13"),
            Some("The full name field only accepts letters, hyphen and apostrophe.")
        );
        assert_eq!(
            full_name_error("Ethan 2nd"),
            Some("The full name field only accepts letters, hyphen and apostrophe.")
        );
    }

    #[test]
    fn test_email_shape() {
        assert_eq!(email_error("test@test.com"), None);
        assert_eq!(email_error(""), Some("Please enter your email."));
        assert_eq!(email_error("not-an-email"), Some("This email address is not valid."));
        assert_eq!(email_error("a b@test.com"), Some("This email address is not valid."));
    }

    #[test]
    fn test_password_bounds() {
        assert_eq!(password_error("demo1234"), None);
        assert_eq!(password_error(""), Some("Please enter a password."));
        assert_eq!(
            password_error("abc"),
            Some("Password must be at least 6 characters long.")
        );
        assert_eq!(
            password_error(&"x".repeat(51)),
            Some("Password must be 50 characters long maximum.")
        );
    }

    #[test]
    fn test_name_bounds() {
        assert_eq!(first_name_error("Ethan"), None);
        assert_eq!(first_name_error("  "), Some("Please enter your first name."));
        assert_eq!(
            first_name_error(&"x".repeat(101)),
            Some("The first name must be 100 characters long maximum.")
        );
        assert_eq!(last_name_error(&"y".repeat(100)), None);
        assert_eq!(
            last_name_error(&"y".repeat(101)),
            Some("The last name must be 100 characters long maximum.")
        );
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Test@Test.COM "), "test@test.com");
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(
            split_full_name("Ethan Sky Blue"),
            ("Ethan".to_string(), "Sky Blue".to_string())
        );
        assert_eq!(split_full_name("Plato"), ("Plato".to_string(), String::new()));
    }

    #[test]
    fn test_errors_accumulate() {
        let mut errors = ValidationErrors::new();
        errors.add_field("email", "Please enter your email.");
        errors.add_field("password", "Please enter a password.");
        errors.add_non_field(PASSWORD_MISMATCH);
        assert!(!errors.is_empty());
        assert_eq!(errors.field_errors.len(), 2);
        assert_eq!(errors.non_field_errors, vec![PASSWORD_MISMATCH.to_string()]);
    }
}

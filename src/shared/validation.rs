use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Regex for category slugs (FAQ categories, document categories)
    /// Must be lowercase alphanumeric with hyphens or underscores
    /// - Valid: "payments", "proof-of-address", "id_card"
    /// - Invalid: "-billing", "Billing", "id card", "billing-"
    pub static ref CATEGORY_REGEX: Regex =
        Regex::new(r"^[a-z0-9]+(?:[-_][a-z0-9]+)*$").unwrap();

    /// Regex for permission names in `resource:action` form
    /// - Valid: "faqs:write", "service_requests:read"
    /// - Invalid: "faqs", "Faqs:write", "faqs:", ":write"
    pub static ref PERMISSION_REGEX: Regex = Regex::new(r"^[a-z_]+:[a-z_]+$").unwrap();

    /// ISO 4217 currency code, lowercase as Stripe expects
    pub static ref CURRENCY_REGEX: Regex = Regex::new(r"^[a-z]{3}$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_regex_valid() {
        assert!(CATEGORY_REGEX.is_match("payments"));
        assert!(CATEGORY_REGEX.is_match("proof-of-address"));
        assert!(CATEGORY_REGEX.is_match("id_card"));
        assert!(CATEGORY_REGEX.is_match("form2"));
    }

    #[test]
    fn test_category_regex_invalid() {
        assert!(!CATEGORY_REGEX.is_match("-billing")); // starts with hyphen
        assert!(!CATEGORY_REGEX.is_match("billing-")); // ends with hyphen
        assert!(!CATEGORY_REGEX.is_match("Billing")); // uppercase
        assert!(!CATEGORY_REGEX.is_match("id card")); // space
        assert!(!CATEGORY_REGEX.is_match(""));
    }

    #[test]
    fn test_permission_regex() {
        assert!(PERMISSION_REGEX.is_match("faqs:write"));
        assert!(PERMISSION_REGEX.is_match("service_requests:read"));
        assert!(!PERMISSION_REGEX.is_match("faqs"));
        assert!(!PERMISSION_REGEX.is_match("Faqs:write"));
        assert!(!PERMISSION_REGEX.is_match("faqs:"));
    }

    #[test]
    fn test_currency_regex() {
        assert!(CURRENCY_REGEX.is_match("usd"));
        assert!(!CURRENCY_REGEX.is_match("USD"));
        assert!(!CURRENCY_REGEX.is_match("usdt"));
    }
}

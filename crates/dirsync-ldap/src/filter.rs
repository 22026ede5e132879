//! Filter template substitution.
//!
//! Filter templates come from configuration and carry one `%s` placeholder.
//! Substituted values are escaped per RFC 4515; wildcard patterns keep their
//! `*` characters intact.

use ldap3::ldap_escape;

/// Fill a filter template with an escaped value.
pub fn fill(template: &str, value: &str) -> String {
    template.replace("%s", &ldap_escape(value))
}

/// Fill a filter template with a wildcard pattern, escaping everything
/// except the `*` wildcard itself.
pub fn fill_pattern(template: &str, pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    for ch in pattern.chars() {
        match ch {
            '\\' => escaped.push_str("\\5c"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    template.replace("%s", &escaped)
}

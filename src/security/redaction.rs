// Simple helpers to avoid accidental printing of secrets in logs/tests.
use std::env;

/// Redact a text body unless DEV_PRINT_SECRETS=1 is set in the environment.
/// By default this returns a short placeholder containing only the length.
pub fn redact_body(s: &str) -> String {
    if env::var("DEV_PRINT_SECRETS").ok().as_deref() == Some("1") {
        return s.to_string();
    }
    format!("<redacted len={}>", s.len())
}

/// Short, log-safe label for a proof secret: first 8 chars plus length.
///
/// Proof secrets are bearer value; logs only ever see a prefix.
pub fn secret_label(secret: &str) -> String {
    let prefix: String = secret.chars().take(8).collect();
    format!("{}..(len={})", prefix, secret.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_redact_body_default() {
        env::remove_var("DEV_PRINT_SECRETS");
        assert_eq!(redact_body("abandon about"), "<redacted len=13>");
    }

    #[test]
    fn test_secret_label() {
        assert_eq!(secret_label("407915bc212be61a77e3e6d2"), "407915bc..(len=24)");
        assert_eq!(secret_label("ab"), "ab..(len=2)");
    }
}

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Guest contact data (email, phone) that must never reach a log line in clear.
///
/// `Debug` and `Display` print a fixed mask. Serialization passes the real value
/// through, so the wrapper can sit on API and webhook payloads unchanged.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Masked(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_formatting() {
        let email: Masked<String> = "guest@example.com".into();
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
        assert_eq!(email.expose(), "guest@example.com");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let phone = Masked("+91 98765 43210".to_string());
        let json = serde_json::to_string(&phone).unwrap();
        assert_eq!(json, "\"+91 98765 43210\"");

        let back: Masked<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_inner(), "+91 98765 43210");
    }
}

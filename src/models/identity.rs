use serde::{Deserialize, Serialize};

/// Verified caller identity, supplied by the upstream Identity Gate.
///
/// The ledger never verifies credentials itself; it trusts this value
/// as already-authenticated input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl Caller {
    /// Whether this caller owns a record stamped with the given
    /// owner email / uid pair. Matches by email, falling back to uid
    /// when the email was never stamped.
    pub fn owns(&self, owner_email: &str, owner_uid: Option<&str>) -> bool {
        if !owner_email.is_empty() {
            return owner_email.eq_ignore_ascii_case(&self.email);
        }
        owner_uid.is_some_and(|uid| uid == self.uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(email: &str, uid: &str) -> Caller {
        Caller {
            uid: uid.into(),
            email: email.into(),
            is_admin: false,
        }
    }

    #[test]
    fn owns_by_email_case_insensitive() {
        let c = caller("worker@agency.org", "u1");
        assert!(c.owns("Worker@Agency.org", None));
        assert!(!c.owns("other@agency.org", None));
    }

    #[test]
    fn owns_by_uid_when_email_missing() {
        let c = caller("worker@agency.org", "u1");
        assert!(c.owns("", Some("u1")));
        assert!(!c.owns("", Some("u2")));
        assert!(!c.owns("", None));
    }

    #[test]
    fn email_takes_precedence_over_uid() {
        let c = caller("worker@agency.org", "u1");
        // Stamped email differs — uid match does not rescue it.
        assert!(!c.owns("other@agency.org", Some("u1")));
    }
}

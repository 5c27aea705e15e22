//! Pending login status state machine
//!
//! The transition table lives here so the store, the decision API and the
//! automation outcome callback all agree on which moves are legal.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    Pending,
    OtpRequired,
    Approved,
    Denied,
    Failed,
}

impl LoginStatus {
    /// Allowed transitions:
    /// - pending -> otp_required (admin requests second factor)
    /// - pending | otp_required -> approved (admin approves)
    /// - pending | otp_required -> denied (admin denies)
    /// - approved -> failed (automation outcome callback, hard failure)
    ///
    /// `approved` never rolls back to a review state.
    pub fn can_transition_to(self, target: LoginStatus) -> bool {
        use LoginStatus::*;
        matches!(
            (self, target),
            (Pending, OtpRequired)
                | (Pending, Approved)
                | (OtpRequired, Approved)
                | (Pending, Denied)
                | (OtpRequired, Denied)
                | (Approved, Failed)
        )
    }

    /// Terminal statuses accept no further admin decisions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LoginStatus::Approved | LoginStatus::Denied | LoginStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoginStatus::Pending => "pending",
            LoginStatus::OtpRequired => "otp_required",
            LoginStatus::Approved => "approved",
            LoginStatus::Denied => "denied",
            LoginStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<LoginStatus> {
        match s {
            "pending" => Some(LoginStatus::Pending),
            "otp_required" => Some(LoginStatus::OtpRequired),
            "approved" => Some(LoginStatus::Approved),
            "denied" => Some(LoginStatus::Denied),
            "failed" => Some(LoginStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LoginStatus::*;

    const ALL: [LoginStatus; 5] = [Pending, OtpRequired, Approved, Denied, Failed];

    #[test]
    fn test_transition_table_is_exhaustive() {
        let allowed = [
            (Pending, OtpRequired),
            (Pending, Approved),
            (OtpRequired, Approved),
            (Pending, Denied),
            (OtpRequired, Denied),
            (Approved, Failed),
        ];

        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "transition {} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        for status in ALL {
            assert_eq!(LoginStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LoginStatus::parse("bogus"), None);
    }
}

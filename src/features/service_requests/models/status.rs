use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a service request.
///
/// Forward path: `payment_pending -> awaiting_form -> awaiting_documents ->
/// submitted -> in_review -> in_progress -> completed`. `draft` holds a form
/// saved without finishing; `missing_documents` sends the request back to the
/// customer. Any non-terminal state may move to `rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    PaymentPending,
    AwaitingForm,
    AwaitingDocuments,
    Draft,
    Submitted,
    InReview,
    InProgress,
    MissingDocuments,
    Completed,
    Rejected,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 10] = [
        RequestStatus::PaymentPending,
        RequestStatus::AwaitingForm,
        RequestStatus::AwaitingDocuments,
        RequestStatus::Draft,
        RequestStatus::Submitted,
        RequestStatus::InReview,
        RequestStatus::InProgress,
        RequestStatus::MissingDocuments,
        RequestStatus::Completed,
        RequestStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::PaymentPending => "payment_pending",
            RequestStatus::AwaitingForm => "awaiting_form",
            RequestStatus::AwaitingDocuments => "awaiting_documents",
            RequestStatus::Draft => "draft",
            RequestStatus::Submitted => "submitted",
            RequestStatus::InReview => "in_review",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::MissingDocuments => "missing_documents",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Rejected)
    }

    /// Whether the customer may still upload or remove documents
    pub fn accepts_documents(&self) -> bool {
        matches!(
            self,
            RequestStatus::AwaitingForm
                | RequestStatus::AwaitingDocuments
                | RequestStatus::Draft
                | RequestStatus::MissingDocuments
        )
    }

    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;

        if self.is_terminal() || *self == next {
            return false;
        }
        if next == Rejected {
            return true;
        }

        match self {
            PaymentPending => next == AwaitingForm,
            AwaitingForm => matches!(next, AwaitingDocuments | Draft | Submitted),
            AwaitingDocuments => matches!(next, Submitted | Draft),
            Draft => matches!(next, AwaitingForm | AwaitingDocuments | Submitted),
            Submitted => next == InReview,
            InReview => matches!(next, InProgress | MissingDocuments | Completed),
            InProgress => matches!(next, MissingDocuments | Completed),
            MissingDocuments => matches!(next, Submitted | InReview),
            Completed | Rejected => false,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown service request status '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    #[test]
    fn test_round_trips_through_str() {
        for status in RequestStatus::ALL {
            assert_eq!(status.as_str().parse::<RequestStatus>(), Ok(status));
        }
        assert!("cancelled".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            PaymentPending,
            AwaitingForm,
            AwaitingDocuments,
            Submitted,
            InReview,
            InProgress,
            Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in RequestStatus::ALL {
            assert!(!Completed.can_transition_to(next));
            assert!(!Rejected.can_transition_to(next));
        }
    }

    #[test]
    fn test_completed_to_draft_is_illegal() {
        assert!(!Completed.can_transition_to(Draft));
    }

    #[test]
    fn test_payment_cannot_be_skipped() {
        assert!(!PaymentPending.can_transition_to(Submitted));
        assert!(!PaymentPending.can_transition_to(Draft));
        assert!(PaymentPending.can_transition_to(Rejected));
    }

    #[test]
    fn test_same_status_is_not_a_transition() {
        assert!(!InReview.can_transition_to(InReview));
    }

    #[test]
    fn test_missing_documents_loop() {
        assert!(InReview.can_transition_to(MissingDocuments));
        assert!(MissingDocuments.can_transition_to(Submitted));
        assert!(!MissingDocuments.can_transition_to(Completed));
    }

    #[test]
    fn test_serde_uses_snake_case() {
        assert_eq!(
            serde_json::to_value(MissingDocuments).unwrap(),
            serde_json::json!("missing_documents")
        );
    }
}

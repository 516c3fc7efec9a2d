//! Batch enqueue request accepted at the HTTP boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PollqError;

/// `{count, delaySeconds, recipient, subject, body}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueBatchRequest {
    pub count: i64,
    pub delay_seconds: i64,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl EnqueueBatchRequest {
    /// All fields must be non-empty / positive.
    pub fn validate(&self) -> Result<(), PollqError> {
        if self.count <= 0 {
            return Err(PollqError::InvalidRequest("count must be > 0".into()));
        }
        if self.delay_seconds <= 0 {
            return Err(PollqError::InvalidRequest(
                "delaySeconds must be > 0".into(),
            ));
        }
        for (name, value) in [
            ("recipient", &self.recipient),
            ("subject", &self.subject),
            ("body", &self.body),
        ] {
            if value.trim().is_empty() {
                return Err(PollqError::InvalidRequest(format!(
                    "{name} must not be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn valid() -> EnqueueBatchRequest {
        EnqueueBatchRequest {
            count: 2,
            delay_seconds: 10,
            recipient: "ops@example.com".into(),
            subject: "transfer".into(),
            body: "check user transfer".into(),
        }
    }

    #[test]
    fn accepts_valid_request() {
        assert!(valid().validate().is_ok());
        assert_eq!(valid().delay(), Duration::from_secs(10));
    }

    #[test]
    fn parses_camel_case_body() {
        let req: EnqueueBatchRequest = serde_json::from_str(
            r#"{"count":1,"delaySeconds":5,"recipient":"a","subject":"b","body":"c"}"#,
        )
        .unwrap();
        assert_eq!(req.delay_seconds, 5);
    }

    #[rstest]
    #[case::zero_count(|r: &mut EnqueueBatchRequest| r.count = 0, "count")]
    #[case::negative_delay(|r: &mut EnqueueBatchRequest| r.delay_seconds = -1, "delaySeconds")]
    #[case::blank_recipient(|r: &mut EnqueueBatchRequest| r.recipient = "  ".into(), "recipient")]
    #[case::empty_subject(|r: &mut EnqueueBatchRequest| r.subject.clear(), "subject")]
    #[case::empty_body(|r: &mut EnqueueBatchRequest| r.body.clear(), "body")]
    fn rejects_invalid_field(#[case] mutate: fn(&mut EnqueueBatchRequest), #[case] field: &str) {
        let mut req = valid();
        mutate(&mut req);
        match req.validate() {
            Err(PollqError::InvalidRequest(msg)) => assert!(msg.contains(field), "{msg}"),
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }
}

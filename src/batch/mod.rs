//! Batch delete outcomes and reconciliation against the submitted keys.
//!
//! A batch response reports success for some keys and failure for others.
//! [`BatchResultReconciler`] turns the decoded entries into a [`BatchResult`]
//! holding exactly one outcome per submitted object, in submission order.

use crate::error::ResponseError;
use crate::types::ObjectIdentifier;
use tracing::warn;

/// Code given to submitted objects the service did not report on.
pub const UNREPORTED_CODE: &str = "unreported";

/// A key the service reports as deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteSuccess {
    /// Object key.
    pub key: String,
    /// Version ID deleted, if one was addressed.
    pub version_id: Option<String>,
    /// Whether a delete marker was created or removed.
    pub delete_marker: bool,
    /// Version ID of that delete marker.
    pub delete_marker_version_id: Option<String>,
}

/// A key the service failed to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    /// Object key.
    pub key: String,
    /// Version ID addressed.
    pub version_id: Option<String>,
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Per-key outcome of a batch delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The key was deleted.
    Success(DeleteSuccess),
    /// The key was not deleted.
    Error(DeleteFailure),
}

impl DeleteOutcome {
    /// Object key.
    pub fn key(&self) -> &str {
        match self {
            DeleteOutcome::Success(s) => &s.key,
            DeleteOutcome::Error(f) => &f.key,
        }
    }

    /// Version ID reported with the outcome.
    pub fn version_id(&self) -> Option<&str> {
        match self {
            DeleteOutcome::Success(s) => s.version_id.as_deref(),
            DeleteOutcome::Error(f) => f.version_id.as_deref(),
        }
    }

    /// Whether the key was deleted.
    pub fn is_success(&self) -> bool {
        matches!(self, DeleteOutcome::Success(_))
    }

    /// Failure code, for failed keys.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            DeleteOutcome::Error(f) => Some(&f.code),
            DeleteOutcome::Success(_) => None,
        }
    }

    fn unreported(object: &ObjectIdentifier) -> Self {
        DeleteOutcome::Error(DeleteFailure {
            key: object.key.clone(),
            version_id: object.version_id.clone(),
            code: UNREPORTED_CODE.to_string(),
            message: "The service did not report an outcome for this key".to_string(),
        })
    }
}

/// Outcomes of a batch delete, one per submitted object, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    outcomes: Vec<DeleteOutcome>,
}

impl BatchResult {
    /// All outcomes.
    pub fn outcomes(&self) -> &[DeleteOutcome] {
        &self.outcomes
    }

    /// Consume the result, returning its outcomes.
    pub fn into_outcomes(self) -> Vec<DeleteOutcome> {
        self.outcomes
    }

    /// Number of outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether there are no outcomes.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Keys that were deleted.
    pub fn successes(&self) -> impl Iterator<Item = &DeleteSuccess> {
        self.outcomes.iter().filter_map(|o| match o {
            DeleteOutcome::Success(s) => Some(s),
            DeleteOutcome::Error(_) => None,
        })
    }

    /// Keys that were not deleted, including unreported ones.
    pub fn failures(&self) -> impl Iterator<Item = &DeleteFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            DeleteOutcome::Error(f) => Some(f),
            DeleteOutcome::Success(_) => None,
        })
    }

    /// Whether every key was deleted.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(DeleteOutcome::is_success)
    }

    /// Append the outcomes of a later chunk.
    pub fn extend(&mut self, other: BatchResult) {
        self.outcomes.extend(other.outcomes);
    }
}

/// Reconciles decoded batch outcomes with the submitted objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchResultReconciler;

impl BatchResultReconciler {
    /// Match each decoded outcome to a submitted object.
    ///
    /// A reported key that was never submitted, or reported more often than
    /// submitted, is a protocol violation. Submitted objects without an
    /// outcome get an error outcome with [`UNREPORTED_CODE`].
    pub fn reconcile(
        submitted: &[ObjectIdentifier],
        decoded: Vec<DeleteOutcome>,
    ) -> Result<BatchResult, ResponseError> {
        let mut slots: Vec<Option<DeleteOutcome>> = vec![None; submitted.len()];

        for outcome in decoded {
            let index = Self::slot_for(submitted, &slots, &outcome)?;
            slots[index] = Some(outcome);
        }

        let mut unreported = 0usize;
        let outcomes = slots
            .into_iter()
            .zip(submitted)
            .map(|(slot, object)| {
                slot.unwrap_or_else(|| {
                    unreported += 1;
                    DeleteOutcome::unreported(object)
                })
            })
            .collect();

        if unreported > 0 {
            warn!(
                submitted = submitted.len(),
                unreported, "Batch delete response omitted submitted keys"
            );
        }
        Ok(BatchResult { outcomes })
    }

    fn slot_for(
        submitted: &[ObjectIdentifier],
        slots: &[Option<DeleteOutcome>],
        outcome: &DeleteOutcome,
    ) -> Result<usize, ResponseError> {
        let key = outcome.key();
        let open = |i: &usize| submitted[*i].key == key && slots[*i].is_none();
        let candidates: Vec<usize> = (0..submitted.len()).filter(open).collect();

        if candidates.is_empty() {
            return Err(if submitted.iter().any(|o| o.key == key) {
                ResponseError::DuplicateKey {
                    key: key.to_string(),
                }
            } else {
                ResponseError::UnexpectedKey {
                    key: key.to_string(),
                }
            });
        }

        let exact = candidates
            .iter()
            .copied()
            .find(|i| submitted[*i].version_id.as_deref() == outcome.version_id());
        let compatible = candidates.iter().copied().find(|i| {
            submitted[*i].version_id.is_none() || outcome.version_id().is_none()
        });
        exact
            .or(compatible)
            .ok_or_else(|| ResponseError::UnexpectedVersion {
                key: key.to_string(),
                version_id: outcome.version_id().unwrap_or_default().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn success(key: &str) -> DeleteOutcome {
        DeleteOutcome::Success(DeleteSuccess {
            key: key.to_string(),
            version_id: None,
            delete_marker: false,
            delete_marker_version_id: None,
        })
    }

    fn failure(key: &str, code: &str) -> DeleteOutcome {
        DeleteOutcome::Error(DeleteFailure {
            key: key.to_string(),
            version_id: None,
            code: code.to_string(),
            message: String::new(),
        })
    }

    fn ids(keys: &[&str]) -> Vec<ObjectIdentifier> {
        keys.iter().map(|k| ObjectIdentifier::new(*k)).collect()
    }

    #[test]
    fn test_omitted_key_becomes_unreported() {
        let submitted = ids(&["a", "b", "c"]);
        let decoded = vec![failure("b", "NoSuchKey"), success("a")];

        let result = BatchResultReconciler::reconcile(&submitted, decoded).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result.outcomes()[0], success("a"));
        assert_eq!(result.outcomes()[1].error_code(), Some("NoSuchKey"));
        assert_eq!(result.outcomes()[2].key(), "c");
        assert_eq!(result.outcomes()[2].error_code(), Some(UNREPORTED_CODE));
        assert!(!result.all_succeeded());
        assert_eq!(result.failures().count(), 2);
    }

    #[test]
    fn test_unsubmitted_key_is_a_protocol_violation() {
        let submitted = ids(&["a"]);
        let err = BatchResultReconciler::reconcile(&submitted, vec![success("a"), success("z")])
            .unwrap_err();
        assert!(matches!(err, ResponseError::UnexpectedKey { key } if key == "z"));
    }

    #[test]
    fn test_repeated_key_is_a_protocol_violation() {
        let submitted = ids(&["a", "b"]);
        let err = BatchResultReconciler::reconcile(&submitted, vec![success("a"), success("a")])
            .unwrap_err();
        assert!(matches!(err, ResponseError::DuplicateKey { key } if key == "a"));
    }

    #[test]
    fn test_foreign_version_is_a_protocol_violation() {
        let submitted = vec![ObjectIdentifier::with_version("k", "v1")];
        let decoded = vec![DeleteOutcome::Success(DeleteSuccess {
            key: "k".into(),
            version_id: Some("v9".into()),
            delete_marker: false,
            delete_marker_version_id: None,
        })];

        let err = BatchResultReconciler::reconcile(&submitted, decoded).unwrap_err();
        assert!(matches!(
            err,
            ResponseError::UnexpectedVersion { key, version_id } if key == "k" && version_id == "v9"
        ));
    }

    #[test]
    fn test_versions_of_one_key_match_by_version() {
        let submitted = vec![
            ObjectIdentifier::with_version("k", "v1"),
            ObjectIdentifier::with_version("k", "v2"),
        ];
        let decoded = vec![
            DeleteOutcome::Success(DeleteSuccess {
                key: "k".into(),
                version_id: Some("v2".into()),
                delete_marker: false,
                delete_marker_version_id: None,
            }),
            DeleteOutcome::Error(DeleteFailure {
                key: "k".into(),
                version_id: Some("v1".into()),
                code: "AccessDenied".into(),
                message: String::new(),
            }),
        ];

        let result = BatchResultReconciler::reconcile(&submitted, decoded).unwrap();
        assert_eq!(result.outcomes()[0].version_id(), Some("v1"));
        assert!(!result.outcomes()[0].is_success());
        assert_eq!(result.outcomes()[1].version_id(), Some("v2"));
        assert!(result.outcomes()[1].is_success());
    }

    proptest! {
        #[test]
        fn prop_outcome_keys_equal_submitted_keys(
            keys in proptest::collection::hash_set("[a-z]{1,8}", 1..40),
            mask in proptest::collection::vec(0u8..3, 40),
        ) {
            let keys: Vec<String> = keys.into_iter().collect();
            let submitted: Vec<ObjectIdentifier> =
                keys.iter().map(|k| ObjectIdentifier::new(k.clone())).collect();

            // 0 = reported deleted, 1 = reported failed, 2 = omitted; reported in reverse.
            let decoded: Vec<DeleteOutcome> = keys
                .iter()
                .zip(mask.iter())
                .rev()
                .filter_map(|(k, m)| match m {
                    0 => Some(success(k)),
                    1 => Some(failure(k, "AccessDenied")),
                    _ => None,
                })
                .collect();

            let result = BatchResultReconciler::reconcile(&submitted, decoded).unwrap();
            let returned: Vec<&str> = result.outcomes().iter().map(DeleteOutcome::key).collect();
            let expected: Vec<&str> = keys.iter().map(String::as_str).collect();
            prop_assert_eq!(returned, expected);
        }
    }
}

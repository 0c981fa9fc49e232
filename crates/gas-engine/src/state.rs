use serde::Serialize;

/// Lifecycle of a single asynchronously fetched estimate.
///
/// `Unavailable` covers both a failed fetch and a skipped one; it is left only
/// when one of the estimate's inputs changes or the next poll succeeds.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum EstimateState<T> {
    #[default]
    Idle,
    Loading,
    Resolved(T),
    Unavailable,
}

impl<T> EstimateState<T> {
    pub fn resolved(&self) -> Option<&T> {
        match self {
            EstimateState::Resolved(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EstimateState::Idle | EstimateState::Loading)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> EstimateState<U> {
        match self {
            EstimateState::Idle => EstimateState::Idle,
            EstimateState::Loading => EstimateState::Loading,
            EstimateState::Resolved(value) => EstimateState::Resolved(f(value)),
            EstimateState::Unavailable => EstimateState::Unavailable,
        }
    }
}

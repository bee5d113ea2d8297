use serde::{Deserialize, Serialize};

/// Informational state of a queued action. Both states are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Pending,
    Failed,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Failed => "failed",
        }
    }
}

impl From<&str> for ActionStatus {
    fn from(value: &str) -> Self {
        match value {
            "failed" => ActionStatus::Failed,
            _ => ActionStatus::Pending,
        }
    }
}

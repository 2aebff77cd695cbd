/// Result of a best-effort concurrent task bounded by a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Ok(T),
    TimedOut,
    Failed(String),
}

impl<T> TaskOutcome<T> {
    /// The value, if the task succeeded.
    pub fn ok_value(self) -> Option<T> {
        match self {
            TaskOutcome::Ok(value) => Some(value),
            TaskOutcome::TimedOut | TaskOutcome::Failed(_) => None,
        }
    }
}

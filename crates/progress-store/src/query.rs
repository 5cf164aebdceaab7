/// Builder for listing checkpoints.
///
/// Used for recovery (every non-terminal saga) and for operator listings.
#[derive(Debug, Clone, Default)]
pub struct CheckpointQuery {
    /// Filter by terminal flag.
    pub terminal: Option<bool>,

    /// Filter by status label (any of these).
    pub statuses: Option<Vec<String>>,

    /// Maximum number of checkpoints to return.
    pub limit: Option<usize>,

    /// Number of checkpoints to skip.
    pub offset: Option<usize>,
}

impl CheckpointQuery {
    /// Creates a new empty query matching every checkpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for sagas that have not reached a terminal status.
    pub fn incomplete() -> Self {
        Self {
            terminal: Some(false),
            ..Default::default()
        }
    }

    /// Filters by terminal flag.
    pub fn terminal(mut self, terminal: bool) -> Self {
        self.terminal = Some(terminal);
        self
    }

    /// Filters by a single status label.
    pub fn status(mut self, status: impl Into<String>) -> Self {
        self.statuses = Some(vec![status.into()]);
        self
    }

    /// Filters by several status labels (any of these).
    pub fn statuses(mut self, statuses: Vec<String>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    /// Limits the number of checkpoints returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `offset` checkpoints.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_builder() {
        let query = CheckpointQuery::new()
            .terminal(true)
            .status("FAILED")
            .limit(10)
            .offset(5);

        assert_eq!(query.terminal, Some(true));
        assert_eq!(query.statuses, Some(vec!["FAILED".to_string()]));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
    }

    #[test]
    fn incomplete_query() {
        let query = CheckpointQuery::incomplete();
        assert_eq!(query.terminal, Some(false));
        assert!(query.statuses.is_none());
    }
}

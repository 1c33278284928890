//! Database query counters.

use metrics::counter;

/// Outcome label for `db_query_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Success,
    Error,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStatus::Success => "success",
            QueryStatus::Error => "error",
        }
    }
}

/// Records `db_query_total{operation,status}`.
pub struct DbMetrics;

impl DbMetrics {
    pub fn record(operation: &'static str, status: QueryStatus) {
        counter!(
            "db_query_total",
            "operation" => operation,
            "status" => status.as_str()
        )
        .increment(1);
    }

    /// Record the outcome of `result` and hand it back unchanged.
    pub fn observe<T, E>(operation: &'static str, result: Result<T, E>) -> Result<T, E> {
        let status = if result.is_ok() {
            QueryStatus::Success
        } else {
            QueryStatus::Error
        };
        Self::record(operation, status);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_passes_result_through() {
        let ok: Result<i32, String> = DbMetrics::observe("select", Ok(7));
        assert_eq!(ok, Ok(7));

        let err: Result<i32, String> = DbMetrics::observe("insert", Err("boom".into()));
        assert_eq!(err, Err("boom".to_string()));
    }

    #[test]
    fn test_query_status_labels() {
        assert_eq!(QueryStatus::Success.as_str(), "success");
        assert_eq!(QueryStatus::Error.as_str(), "error");
    }
}

//! Shared guardrails for query payload bounds and traversal limits.

// Core query guards
pub const MAX_QUERY_LENGTH: usize = 512;
pub const MAX_SEARCH_LIMIT: usize = 5000;
pub const MAX_INHERITANCE_DEPTH: usize = 64;
pub const MAX_HIERARCHY_DEPTH: usize = 16;
pub const MAX_HIERARCHY_NODES: usize = 2000;

// Session timing
pub const QUERY_DEBOUNCE_MS: u64 = 250;
pub const HOVER_DEBOUNCE_MS: u64 = 350;

pub fn clamp_int(value: usize, minimum: usize, maximum: usize) -> usize {
    value.max(minimum).min(maximum)
}

pub fn clamp_depth(value: usize, maximum: usize) -> usize {
    clamp_int(value, 1, maximum)
}

pub fn clamp_limit(value: usize, maximum: usize) -> usize {
    clamp_int(value, 1, maximum)
}

/// Drop whitespace and cap the query length on a character boundary.
pub fn truncate_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(MAX_QUERY_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_limit(0, 10), 1);
        assert_eq!(clamp_limit(50, 10), 10);
        assert_eq!(clamp_depth(3, 10), 3);
    }

    #[test]
    fn test_truncate_query() {
        assert_eq!(truncate_query(" User Service "), "UserService");
        let long = "é".repeat(MAX_QUERY_LENGTH + 10);
        assert_eq!(truncate_query(&long).chars().count(), MAX_QUERY_LENGTH);
    }
}

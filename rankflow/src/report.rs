use std::collections::HashMap;

use crate::loader::Node;

/// Formats one output line.  Ranks keep full precision.
/// ```rust
///   use rankflow::report::format_rank;
///
///   assert_eq!(format_rank("a", 1.0), "a has rank: 1.0.");
///   assert_eq!(format_rank("b", 0.575), "b has rank: 0.575.");
/// ```
pub fn format_rank(node: &str, rank: f64) -> String {
    format!("{} has rank: {:?}.", node, rank)
}

/// Output lines for every ranked node, ordered by node.
pub fn report_lines(ranks: &HashMap<Node, f64>) -> Vec<String> {
    let mut sorted: Vec<(&Node, &f64)> = ranks.iter().collect();
    sorted.sort_by(|x, y| x.0.cmp(y.0));
    sorted.into_iter().map(|(node, rank)| format_rank(node, *rank)).collect()
}

#[cfg(test)]
mod report_test {
    use super::*;

    #[test]
    fn test_report_is_sorted() {
        let ranks: HashMap<Node, f64> = vec![("b".to_owned(), 0.5), ("a".to_owned(), 2.0)]
            .into_iter().collect();
        assert_eq!(report_lines(&ranks), vec!["a has rank: 2.0.", "b has rank: 0.5."]);
    }
}

use crate::config::SearchConfig;

/// Build the mailbox search query.
///
/// Parts are joined with single spaces in a fixed order (unread filter,
/// subject disjunction, date bound); a part whose setting is absent or empty
/// is left out entirely. Subjects are quoted verbatim.
pub fn build_search_query(search: &SearchConfig) -> String {
    let mut parts = Vec::new();

    if search.only_unread {
        parts.push("is:unread".to_string());
    }

    let subjects: Vec<String> = search
        .subjects
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("\"{}\"", s))
        .collect();
    if !subjects.is_empty() {
        parts.push(format!("subject:({})", subjects.join(" OR ")));
    }

    if let Some(after) = search.after_date {
        parts.push(format!("after:{}", after.format("%Y/%m/%d")));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn search(subjects: &[&str], only_unread: bool, after: Option<NaiveDate>) -> SearchConfig {
        SearchConfig {
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
            only_unread,
            after_date: after,
        }
    }

    #[test]
    fn test_stock_query() {
        let query = build_search_query(&SearchConfig::default());
        assert_eq!(
            query,
            "is:unread subject:(\"You have been assigned\" OR \"has been assigned to you\") after:2025/04/30"
        );
    }

    #[test]
    fn test_only_subjects() {
        let query = build_search_query(&search(&["New task"], false, None));
        assert_eq!(query, "subject:(\"New task\")");
    }

    #[test]
    fn test_everything_absent() {
        assert_eq!(build_search_query(&search(&[], false, None)), "");
    }

    #[test]
    fn test_blank_subjects_are_omitted() {
        let after = NaiveDate::from_ymd_opt(2024, 12, 1);
        let query = build_search_query(&search(&["", "  "], true, after));
        assert_eq!(query, "is:unread after:2024/12/01");
    }

    #[test]
    fn test_subject_passed_verbatim() {
        let query = build_search_query(&search(&["a \"quoted\" (thing)"], false, None));
        assert_eq!(query, "subject:(\"a \"quoted\" (thing)\")");
    }

    #[test]
    fn test_no_consecutive_blank_segments() {
        let dates = [None, NaiveDate::from_ymd_opt(2025, 1, 2)];
        let subject_sets: [&[&str]; 3] = [&[], &[""], &["x", "y"]];
        for only_unread in [true, false] {
            for after in dates {
                for subjects in subject_sets {
                    let query = build_search_query(&search(subjects, only_unread, after));
                    assert!(!query.contains("  "), "double space in {:?}", query);
                    assert_eq!(query.trim(), query);
                    assert_eq!(query.contains("is:unread"), only_unread);
                    assert_eq!(query.contains("after:"), after.is_some());
                    assert_eq!(query.contains("subject:"), subjects.contains(&"x"));
                }
            }
        }
    }
}

//! Similarity-based deduplication of findings.
//!
//! Several strategies often report the same issue with slightly different
//! wording. The merger folds such reports together conservatively: two
//! findings are duplicates only when their severities match, their locations
//! overlap, and their titles are similar.
//!
//! Clustering is "first representative wins": each finding is compared
//! against the *current* representative of every existing cluster in creation
//! order and joins the first one it matches. A representative can widen its
//! locations after a later cluster was opened, so the pass is repeated over
//! its own output until no two representatives match. The duplicate predicate
//! is not transitive (A~B and B~C does not imply A~C), so this is not a true
//! transitive closure; the first-match behavior is the defined contract.

use crate::analysis::observer::{AuditObserver, NoopObserver};
use crate::models::Finding;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Word-level Jaccard similarity at or above which titles are similar.
const TITLE_JACCARD_THRESHOLD: f64 = 0.75;

/// Share of the shorter title's words that must appear in the longer title.
const TITLE_WORD_OVERLAP: f64 = 0.5;

/// Merge duplicate findings.
pub fn merge(findings: Vec<Finding>) -> Vec<Finding> {
    merge_observed(findings, &NoopObserver)
}

/// Merge duplicate findings, reporting each merge decision to `observer`.
///
/// Output order is cluster creation order. Never fails; malformed findings
/// are passed through like any other.
pub fn merge_observed(findings: Vec<Finding>, observer: &dyn AuditObserver) -> Vec<Finding> {
    if findings.len() <= 1 {
        return findings;
    }

    let input_len = findings.len();
    observer.merge_started(input_len);

    let mut clusters = cluster_pass(findings, observer);
    loop {
        let before = clusters.len();
        clusters = cluster_pass(clusters, observer);
        if clusters.len() == before {
            break;
        }
    }

    observer.merge_finished(input_len, clusters.len());
    clusters
}

/// One first-representative-wins pass over `findings`.
fn cluster_pass(findings: Vec<Finding>, observer: &dyn AuditObserver) -> Vec<Finding> {
    let mut clusters: Vec<Finding> = Vec::with_capacity(findings.len());

    for finding in findings {
        match clusters.iter().position(|rep| is_duplicate(rep, &finding)) {
            Some(idx) => {
                let merged = combine(&clusters[idx], &finding);
                observer.findings_merged(idx, &finding, &merged);
                clusters[idx] = merged;
            }
            None => clusters.push(finding),
        }
    }

    clusters
}

/// The duplicate predicate: matching severity, overlapping locations and
/// similar titles.
pub fn is_duplicate(a: &Finding, b: &Finding) -> bool {
    severities_match(&a.severity, &b.severity)
        && locations_overlap(&a.locations, &b.locations)
        && titles_similar(&a.title, &b.title)
}

/// Fold `incoming` into the cluster representative `current`.
///
/// Ties on title and description keep `current`'s value. A severity tie
/// between two recognized spellings (`high` vs `High`) yields the canonical
/// spelling; an unrecognized tie keeps `current`'s.
pub fn combine(current: &Finding, incoming: &Finding) -> Finding {
    let severity = match incoming.rank().cmp(&current.rank()) {
        Ordering::Greater => incoming.severity.clone(),
        Ordering::Less => current.severity.clone(),
        Ordering::Equal => match current.severity_level() {
            Some(level) => level.to_string(),
            None => current.severity.clone(),
        },
    };

    let description = longer(&current.description, &incoming.description);
    let title = longer(&current.title, &incoming.title);

    let mut locations: Vec<String> = Vec::with_capacity(current.locations.len());
    for location in current.locations.iter().chain(&incoming.locations) {
        if !locations.contains(location) {
            locations.push(location.clone());
        }
    }

    Finding {
        title: title.to_string(),
        description: description.to_string(),
        severity,
        locations,
    }
}

/// Longer of two strings by character count; ties keep `current`.
fn longer<'a>(current: &'a str, incoming: &'a str) -> &'a str {
    if incoming.chars().count() > current.chars().count() {
        incoming
    } else {
        current
    }
}

/// Severities compare as trimmed, case-insensitive strings, not by rank.
fn severities_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_location(location: &str) -> String {
    location.trim().to_lowercase()
}

/// Location sets overlap when they share a normalized element.
///
/// An empty set never overlaps anything, including another empty set. For two
/// non-empty sets a subset relation implies a shared element, so the
/// intersection test covers it.
fn locations_overlap(a: &[String], b: &[String]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }

    let set_a: HashSet<String> = a.iter().map(|l| normalize_location(l)).collect();
    let set_b: HashSet<String> = b.iter().map(|l| normalize_location(l)).collect();

    !set_a.is_disjoint(&set_b)
}

fn titles_similar(a: &str, b: &str) -> bool {
    let norm_a = normalize_title(a);
    let norm_b = normalize_title(b);

    if norm_a == norm_b {
        return true;
    }

    if norm_a.contains(&norm_b) || norm_b.contains(&norm_a) {
        return true;
    }

    let words_a: HashSet<&str> = norm_a.split(' ').collect();
    let words_b: HashSet<&str> = norm_b.split(' ').collect();

    if words_a.is_empty() || words_b.is_empty() {
        return false;
    }

    let intersection = words_a.intersection(&words_b).count();
    let union = words_a.union(&words_b).count();

    let shorter = words_a.len().min(words_b.len());
    if intersection as f64 >= shorter as f64 * TITLE_WORD_OVERLAP {
        return true;
    }

    intersection as f64 / union as f64 >= TITLE_JACCARD_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn finding(title: &str, description: &str, severity: &str, locations: &[&str]) -> Finding {
        Finding::new(
            title,
            description,
            severity,
            locations.iter().map(|l| l.to_string()).collect(),
        )
    }

    fn sorted(mut findings: Vec<Finding>) -> Vec<Finding> {
        findings.sort_by(|a, b| {
            a.title
                .cmp(&b.title)
                .then_with(|| a.severity.cmp(&b.severity))
                .then_with(|| a.description.cmp(&b.description))
        });
        findings
    }

    fn permutations(items: &[Finding]) -> Vec<Vec<Finding>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut result = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                result.push(tail);
            }
        }
        result
    }

    fn mixed_batch() -> Vec<Finding> {
        vec![
            finding(
                "Reentrancy in withdraw",
                "External call before state update.",
                "High",
                &["Bank.sol"],
            ),
            finding(
                "Reentrancy in withdraw",
                "External call before the balance is decremented lets an attacker re-enter.",
                "High",
                &["Bank.sol", "Vault.sol"],
            ),
            finding(
                "Missing access control",
                "Anyone can call emergencyWithdraw.",
                "High",
                &["Vault.sol"],
            ),
            finding(
                "Gas Optimization",
                "Cache array length.",
                "Info",
                &["Bank.sol"],
            ),
        ]
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(Vec::new()).is_empty());
    }

    #[test]
    fn test_merge_single_unchanged() {
        let input = vec![finding("", "", "weird", &[])];
        assert_eq!(merge(input.clone()), input);
    }

    #[test]
    fn test_identical_titles_keep_longer_description() {
        let short = "a".repeat(50);
        let long = "b".repeat(120);
        let merged = merge(vec![
            finding("Reentrancy in withdraw", &short, "High", &["Bank.sol"]),
            finding("Reentrancy in withdraw", &long, "High", &["Bank.sol"]),
        ]);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].description, long);
        assert_eq!(merged[0].severity, "High");
        assert_eq!(merged[0].locations, vec!["Bank.sol"]);
    }

    #[test]
    fn test_substring_titles_without_shared_location_not_merged() {
        let merged = merge(vec![
            finding("Reentrancy Issue", "desc", "High", &["Bank.sol"]),
            finding(
                "Reentrancy Issue in withdraw function",
                "desc",
                "Critical",
                &["Vault.sol"],
            ),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_dissimilar_titles_sharing_location_not_merged() {
        let merged = merge(vec![
            finding("Gas Optimization", "desc", "Info", &["Bank.sol"]),
            finding("Reentrancy", "desc", "High", &["Bank.sol"]),
        ]);
        assert_eq!(merged.len(), 2);

        // Same severity still does not make the titles similar.
        let merged = merge(vec![
            finding("Gas Optimization", "desc", "High", &["Bank.sol"]),
            finding("Reentrancy", "desc", "High", &["Bank.sol"]),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_severity_comparison_is_case_insensitive_but_not_ranked() {
        let a = finding("Reentrancy", "d", " High ", &["A.sol"]);
        let b = finding("Reentrancy", "d", "high", &["A.sol"]);
        let c = finding("Reentrancy", "d", "Critical", &["A.sol"]);

        assert!(is_duplicate(&a, &b));
        assert!(!is_duplicate(&a, &c));
    }

    #[test]
    fn test_location_overlap_rules() {
        let loc = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert!(locations_overlap(&loc(&[" Bank.sol "]), &loc(&["bank.sol"])));
        assert!(locations_overlap(
            &loc(&["A.sol"]),
            &loc(&["A.sol", "B.sol"])
        ));
        assert!(!locations_overlap(&loc(&["A.sol"]), &loc(&["B.sol"])));
        assert!(!locations_overlap(&loc(&[]), &loc(&[])));
        assert!(!locations_overlap(&loc(&[]), &loc(&["A.sol"])));
        assert!(!locations_overlap(&loc(&["A.sol"]), &loc(&[])));
    }

    #[test]
    fn test_empty_locations_never_merge() {
        let merged = merge(vec![
            finding("Reentrancy", "d", "High", &[]),
            finding("Reentrancy", "d", "High", &[]),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_title_similarity_rules() {
        // Normalization
        assert!(titles_similar("  Reentrancy   In Withdraw", "reentrancy in withdraw"));
        // Substring
        assert!(titles_similar("Reentrancy", "Reentrancy vulnerability in Bank"));
        // Half of the shorter title's words appear in the longer one
        assert!(titles_similar(
            "Unchecked transfer return",
            "Return value of transfer ignored"
        ));
        // No overlap
        assert!(!titles_similar("Gas Optimization", "Reentrancy"));
        assert!(!titles_similar(
            "Missing access control",
            "Oracle price manipulation via flash loan"
        ));
    }

    #[test]
    fn test_combine_takes_higher_rank_and_unions_locations() {
        let current = finding("Price oracle issue", "short", "medium", &["A.sol", "B.sol"]);
        let incoming = finding(
            "Price oracle manipulation issue",
            "a much longer description",
            "Medium",
            &["B.sol", "C.sol"],
        );

        let merged = combine(&current, &incoming);
        assert_eq!(merged.title, "Price oracle manipulation issue");
        assert_eq!(merged.description, "a much longer description");
        // Equal rank takes the canonical spelling.
        assert_eq!(merged.severity, "Medium");
        assert_eq!(merged.locations, vec!["A.sol", "B.sol", "C.sol"]);
    }

    #[test]
    fn test_combine_unknown_severity_ranks_lowest() {
        let current = finding("t", "d", "Severe", &["A.sol"]);
        let incoming = finding("t", "d", "Low", &["A.sol"]);
        assert_eq!(combine(&current, &incoming).severity, "Low");
        assert_eq!(combine(&incoming, &current).severity, "Low");
    }

    #[test]
    fn test_severity_spelling_does_not_depend_on_order() {
        let lower = finding("Reentrancy", "d", "high", &["A.sol"]);
        let upper = finding("Reentrancy", "d", " High", &["A.sol"]);

        assert_eq!(merge(vec![lower.clone(), upper.clone()])[0].severity, "High");
        assert_eq!(merge(vec![upper, lower])[0].severity, "High");

        let odd = finding("Reentrancy", "d", "severe", &["A.sol"]);
        let odd_upper = finding("Reentrancy", "d", "Severe", &["A.sol"]);
        assert_eq!(combine(&odd, &odd_upper).severity, "severe");
    }

    #[test]
    fn test_combine_ties_keep_current() {
        let current = finding("abcd", "1234", "High", &["A.sol"]);
        let incoming = finding("wxyz", "5678", "High", &["A.sol"]);
        let merged = combine(&current, &incoming);
        assert_eq!(merged.title, "abcd");
        assert_eq!(merged.description, "1234");
    }

    #[test]
    fn test_first_representative_wins() {
        // The third finding matches both earlier clusters; it joins the first.
        let merged = merge(vec![
            finding("Reentrancy in withdraw", "d", "High", &["A.sol"]),
            finding("Unchecked call in deposit", "d", "High", &["B.sol"]),
            finding("Reentrancy in deposit", "longer d", "High", &["A.sol", "B.sol"]),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, "Reentrancy in withdraw");
        assert_eq!(merged[0].locations, vec!["A.sol", "B.sol"]);
        assert_eq!(merged[1].title, "Unchecked call in deposit");
    }

    #[test]
    fn test_compares_against_current_representative() {
        // The third finding only overlaps the location added by the second.
        let merged = merge(vec![
            finding("Reentrancy in withdraw", "d", "High", &["A.sol"]),
            finding("Reentrancy in withdraw", "d", "High", &["A.sol", "B.sol"]),
            finding("Reentrancy in withdraw", "d", "High", &["B.sol"]),
        ]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_output_in_cluster_creation_order() {
        let merged = merge(mixed_batch());
        let titles: Vec<_> = merged.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Reentrancy in withdraw",
                "Missing access control",
                "Gas Optimization"
            ]
        );
        assert_eq!(merged[0].locations, vec!["Bank.sol", "Vault.sol"]);
    }

    /// A later finding bridges two clusters that were opened separately.
    fn bridging_batch() -> Vec<Finding> {
        vec![
            finding("Reentrancy", "d", "High", &["a.sol"]),
            finding("Reentrancy", "d", "High", &["b.sol"]),
            finding("Reentrancy", "d", "High", &["a.sol", "b.sol"]),
        ]
    }

    fn normalized(findings: Vec<Finding>) -> Vec<Finding> {
        sorted(findings)
            .into_iter()
            .map(|mut f| {
                f.locations.sort();
                f
            })
            .collect()
    }

    #[test]
    fn test_merge_is_idempotent() {
        for batch in [mixed_batch(), bridging_batch()] {
            let once = merge(batch);
            let twice = merge(once.clone());
            assert_eq!(sorted(once), sorted(twice));
        }
    }

    #[test]
    fn test_merge_is_order_independent() {
        for batch in [mixed_batch(), bridging_batch()] {
            let expected = normalized(merge(batch.clone()));
            for permutation in permutations(&batch) {
                assert_eq!(normalized(merge(permutation)), expected);
            }
        }
    }

    #[test]
    fn test_bridged_clusters_collapse() {
        let merged = merge(bridging_batch());

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].locations, vec!["a.sol", "b.sol"]);
    }

    #[test]
    fn test_output_has_no_duplicate_pairs() {
        for batch in [mixed_batch(), bridging_batch()] {
            let merged = merge(batch);
            for (i, a) in merged.iter().enumerate() {
                for b in &merged[i + 1..] {
                    assert!(!is_duplicate(a, b), "{:?} still matches {:?}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_cardinality_bounds() {
        let batch = mixed_batch();
        assert!(merge(batch.clone()).len() <= batch.len());

        let distinct = vec![
            finding("Reentrancy", "d", "High", &["A.sol"]),
            finding("Missing access control", "d", "High", &["A.sol"]),
            finding("Reentrancy", "d", "Low", &["A.sol"]),
            finding("Reentrancy", "d", "High", &["B.sol"]),
        ];
        assert_eq!(merge(distinct.clone()).len(), distinct.len());
    }

    #[derive(Default)]
    struct CountingObserver {
        merges: Mutex<Vec<usize>>,
        finished: Mutex<Option<(usize, usize)>>,
    }

    impl AuditObserver for CountingObserver {
        fn findings_merged(&self, cluster: usize, _absorbed: &Finding, _rep: &Finding) {
            self.merges.lock().unwrap().push(cluster);
        }

        fn merge_finished(&self, input: usize, output: usize) {
            *self.finished.lock().unwrap() = Some((input, output));
        }
    }

    #[test]
    fn test_merge_reports_decisions() {
        let observer = CountingObserver::default();
        let merged = merge_observed(mixed_batch(), &observer);

        assert_eq!(merged.len(), 3);
        assert_eq!(*observer.merges.lock().unwrap(), vec![0]);
        assert_eq!(*observer.finished.lock().unwrap(), Some((4, 3)));
    }
}

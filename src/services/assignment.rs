//! Reviewer assignment policy.
//!
//! Uniform random choice without replacement. Current review load is not
//! taken into account.

use rand::seq::SliceRandom;
use rand::Rng;

/// Maximum number of reviewers assigned when a pull request is created.
pub const INITIAL_REVIEWER_COUNT: usize = 2;

/// Shuffle `candidates` and keep the first `k`.
///
/// Returns every candidate when fewer than `k` are available.
pub fn select_reviewers<R: Rng + ?Sized>(
    mut candidates: Vec<String>,
    k: usize,
    rng: &mut R,
) -> Vec<String> {
    candidates.shuffle(rng);
    candidates.truncate(k);
    candidates
}

/// Pick exactly one replacement reviewer, or `None` if there is no candidate.
pub fn pick_replacement<R: Rng + ?Sized>(candidates: &[String], rng: &mut R) -> Option<String> {
    candidates.choose(rng).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_takes_k_distinct_candidates() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = ids(&["a", "b", "c", "d", "e"]);

        for _ in 0..50 {
            let picked = select_reviewers(pool.clone(), INITIAL_REVIEWER_COUNT, &mut rng);
            assert_eq!(picked.len(), 2);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 2);
            assert!(picked.iter().all(|p| pool.contains(p)));
        }
    }

    #[test]
    fn test_select_returns_all_when_pool_is_small() {
        let mut rng = StdRng::seed_from_u64(1);

        let picked = select_reviewers(ids(&["only"]), INITIAL_REVIEWER_COUNT, &mut rng);
        assert_eq!(picked, ids(&["only"]));

        let picked = select_reviewers(Vec::new(), INITIAL_REVIEWER_COUNT, &mut rng);
        assert!(picked.is_empty());
    }

    #[test]
    fn test_select_reaches_every_candidate() {
        let mut rng = StdRng::seed_from_u64(42);
        let pool = ids(&["a", "b", "c", "d"]);
        let mut seen = HashSet::new();

        for _ in 0..200 {
            seen.extend(select_reviewers(pool.clone(), 2, &mut rng));
        }

        assert_eq!(seen.len(), pool.len());
    }

    #[test]
    fn test_pick_replacement() {
        let mut rng = StdRng::seed_from_u64(3);

        assert_eq!(pick_replacement(&[], &mut rng), None);
        assert_eq!(
            pick_replacement(&ids(&["solo"]), &mut rng),
            Some("solo".to_string())
        );

        let pool = ids(&["x", "y", "z"]);
        let picked = pick_replacement(&pool, &mut rng).unwrap();
        assert!(pool.contains(&picked));
    }
}

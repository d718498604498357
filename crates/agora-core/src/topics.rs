use std::collections::HashSet;

use rand::Rng;
use rand::seq::SliceRandom;

/// Rotates through the configured topic pool. Within one coverage cycle no
/// topic repeats; once the pool is exhausted the used set is cleared and
/// every topic becomes eligible again.
#[derive(Debug, Clone)]
pub struct TopicRotator {
    pool: Vec<String>,
    used: HashSet<usize>,
}

impl TopicRotator {
    pub fn new(pool: Vec<String>) -> Self {
        Self {
            pool,
            used: HashSet::new(),
        }
    }

    /// Uniform pick from the not-yet-used subset of the pool.
    pub fn pick<R: Rng>(&mut self, rng: &mut R) -> String {
        if self.used.len() >= self.pool.len() {
            self.used.clear();
        }
        let available: Vec<usize> = (0..self.pool.len())
            .filter(|i| !self.used.contains(i))
            .collect();
        match available.choose(rng) {
            Some(&index) => {
                self.used.insert(index);
                self.pool[index].clone()
            }
            // Unreachable with a non-empty pool; the catalog rejects empty.
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("topic {i}")).collect()
    }

    #[test]
    fn full_pool_coverage_before_any_repeat() {
        let mut rotator = TopicRotator::new(pool(8));
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = HashSet::new();
        for _ in 0..8 {
            let topic = rotator.pick(&mut rng);
            assert!(seen.insert(topic), "topic repeated within a coverage cycle");
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn all_topics_eligible_again_after_exhaustion() {
        let mut rotator = TopicRotator::new(pool(5));
        let mut rng = StdRng::seed_from_u64(9);

        for _ in 0..5 {
            rotator.pick(&mut rng);
        }
        // Second cycle must also cover the full pool without repeats.
        let mut second = HashSet::new();
        for _ in 0..5 {
            second.insert(rotator.pick(&mut rng));
        }
        assert_eq!(second.len(), 5);
    }

    #[test]
    fn single_topic_pool_keeps_cycling() {
        let mut rotator = TopicRotator::new(pool(1));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(rotator.pick(&mut rng), "topic 0");
        assert_eq!(rotator.pick(&mut rng), "topic 0");
    }
}

//! Channel name allocation.

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::ChannelOrderStrategy;
use super::config::VoiceConfig;

/// Picks the next free channel name under the configured ordering strategy.
///
/// Candidate names are tried first; once they are all taken the allocator
/// falls back to the overflow name, numbered when unique names are
/// required. The search has no upper bound; it increments until it finds a
/// name that is not in use.
#[derive(Debug)]
pub struct NameAllocator {
    strategy: ChannelOrderStrategy,
    candidates: Vec<String>,
    overflow_template: String,
    ensure_unique_names: bool,
}

impl NameAllocator {
    pub fn new(config: &VoiceConfig) -> Self {
        Self {
            strategy: config.channel_order_strategy,
            candidates: config.available_channel_names.clone(),
            overflow_template: config.overflow_channel_name.clone(),
            ensure_unique_names: config.ensure_unique_names,
        }
    }

    /// Returns the next channel name not present in `in_use`.
    ///
    /// The random source is passed in so callers (and tests) control the
    /// permutation.
    pub fn next_name<R: Rng>(&self, in_use: &[String], rng: &mut R) -> String {
        let mut candidates: Vec<&str> = self.candidates.iter().map(String::as_str).collect();
        if self.strategy == ChannelOrderStrategy::Random {
            candidates.shuffle(rng);
        }

        for name in candidates {
            if !in_use.iter().any(|taken| taken == name) {
                return name.to_string();
            }
        }

        self.overflow_name(in_use, rng)
    }

    fn overflow_name<R: Rng>(&self, in_use: &[String], rng: &mut R) -> String {
        if !self.ensure_unique_names {
            // Duplicate channel names are allowed by the platform.
            return self.overflow_template.clone();
        }

        let mut number: u32 = match self.strategy {
            ChannelOrderStrategy::Random => rng.gen_range(1..=100),
            ChannelOrderStrategy::FirstAvailable => 1,
        };

        loop {
            let name = self.overflow_template.replace("{number}", &number.to_string());
            if !in_use.iter().any(|taken| *taken == name) {
                return name;
            }
            number += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn config(strategy: ChannelOrderStrategy, unique: bool) -> VoiceConfig {
        VoiceConfig {
            channel_order_strategy: strategy,
            ensure_unique_names: unique,
            overflow_channel_name: "Overflow {number}".to_string(),
            available_channel_names: ["A", "B", "C"].map(String::from).to_vec(),
            ..Default::default()
        }
    }

    fn names(taken: &[&str]) -> Vec<String> {
        taken.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn first_available_picks_the_first_free_candidate() {
        let allocator = NameAllocator::new(&config(ChannelOrderStrategy::FirstAvailable, true));
        let mut rng = StdRng::seed_from_u64(0);

        let name = allocator.next_name(&names(&["A", "C"]), &mut rng);
        assert_eq!(name, "B");
    }

    #[test]
    fn random_strategy_still_picks_only_free_candidates() {
        let allocator = NameAllocator::new(&config(ChannelOrderStrategy::Random, true));
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            let name = allocator.next_name(&names(&["A", "C"]), &mut rng);
            assert_eq!(name, "B");
        }
    }

    #[test]
    fn overflow_numbering_skips_taken_numbers() {
        let allocator = NameAllocator::new(&config(ChannelOrderStrategy::FirstAvailable, true));
        let mut rng = StdRng::seed_from_u64(0);

        let name = allocator.next_name(&names(&["A", "B", "C", "Overflow 1"]), &mut rng);
        assert_eq!(name, "Overflow 2");
    }

    #[test]
    fn overflow_is_verbatim_without_unique_names() {
        let allocator = NameAllocator::new(&config(ChannelOrderStrategy::FirstAvailable, false));
        let mut rng = StdRng::seed_from_u64(0);

        let name = allocator.next_name(&names(&["A", "B", "C", "Overflow {number}"]), &mut rng);
        // Collisions are allowed; the template comes back untouched.
        assert_eq!(name, "Overflow {number}");
    }

    #[test]
    fn empty_candidate_list_goes_straight_to_overflow() {
        let config = VoiceConfig {
            available_channel_names: vec![],
            ..config(ChannelOrderStrategy::FirstAvailable, true)
        };
        let allocator = NameAllocator::new(&config);
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(allocator.next_name(&[], &mut rng), "Overflow 1");
    }
}

use crate::error::{RecordError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ID_PREFIX: char = 'M';
const ID_SPACE: u32 = 10_000;
const RANDOM_ATTEMPTS: usize = 10_000;

/// True for `M` followed by exactly four ASCII digits.
pub fn is_meeting_id(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    chars.next() == Some(ID_PREFIX)
        && candidate.len() == 5
        && chars.all(|c| c.is_ascii_digit())
}

fn format_id(n: u32) -> String {
    format!("{ID_PREFIX}{n:04}")
}

/// Random `M####` ids, retried against the caller's view of taken ids.
pub struct MeetingIdGenerator {
    rng: StdRng,
}

impl MeetingIdGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw ids until one is free. Falls back to a linear scan once random
    /// draws keep colliding, so a nearly full id space still succeeds.
    pub fn generate(&mut self, is_taken: impl Fn(&str) -> bool) -> Result<String> {
        for _ in 0..RANDOM_ATTEMPTS {
            let candidate = format_id(self.rng.gen_range(0..ID_SPACE));
            if !is_taken(&candidate) {
                return Ok(candidate);
            }
        }

        log::debug!("Random meeting id draws kept colliding; scanning id space");
        (0..ID_SPACE)
            .map(format_id)
            .find(|candidate| !is_taken(candidate))
            .ok_or(RecordError::IdSpaceExhausted)
    }
}

impl Default for MeetingIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn recognizes_meeting_ids() {
        assert!(is_meeting_id("M0001"));
        assert!(is_meeting_id("M9999"));
        assert!(!is_meeting_id("M001"));
        assert!(!is_meeting_id("m0001"));
        assert!(!is_meeting_id("M00012"));
        assert!(!is_meeting_id("MABCD"));
    }

    #[test]
    fn generated_ids_have_expected_shape() {
        let mut ids = MeetingIdGenerator::seeded(7);
        for _ in 0..50 {
            let id = ids.generate(|_| false).unwrap();
            assert!(is_meeting_id(&id), "bad id {id}");
        }
    }

    #[test]
    fn skips_taken_ids() {
        let mut ids = MeetingIdGenerator::seeded(1);
        let taken: HashSet<String> = (0..ID_SPACE - 1).map(format_id).collect();
        let id = ids.generate(|c| taken.contains(c)).unwrap();
        assert_eq!(id, "M9999");
    }

    #[test]
    fn full_id_space_is_an_error() {
        let mut ids = MeetingIdGenerator::seeded(3);
        assert!(matches!(
            ids.generate(|_| true),
            Err(RecordError::IdSpaceExhausted)
        ));
    }
}

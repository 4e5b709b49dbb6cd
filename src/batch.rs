use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BATCH_NUMBER_MIN: u32 = 10_000;
pub const BATCH_NUMBER_MAX: u32 = 99_999;

/// Supplies raw batch numbers. Values outside the 5-digit range are folded
/// back into it by [`generate_batch_number`].
pub trait BatchNumberSource {
    fn next_batch_number(&mut self) -> u32;
}

pub struct RandomBatchSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RandomBatchSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomBatchSource<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> BatchNumberSource for RandomBatchSource<R> {
    fn next_batch_number(&mut self) -> u32 {
        self.rng.gen_range(BATCH_NUMBER_MIN..=BATCH_NUMBER_MAX)
    }
}

/// Replays a fixed list of numbers, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct SequenceBatchSource {
    values: Vec<u32>,
    cursor: usize,
}

impl SequenceBatchSource {
    pub fn new(values: impl Into<Vec<u32>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }
}

impl BatchNumberSource for SequenceBatchSource {
    fn next_batch_number(&mut self) -> u32 {
        if self.values.is_empty() {
            return BATCH_NUMBER_MIN;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value
    }
}

pub fn generate_batch_number(source: &mut dyn BatchNumberSource) -> String {
    let span = BATCH_NUMBER_MAX - BATCH_NUMBER_MIN + 1;
    let raw = source.next_batch_number();
    let value = if (BATCH_NUMBER_MIN..=BATCH_NUMBER_MAX).contains(&raw) {
        raw
    } else {
        BATCH_NUMBER_MIN + raw % span
    };
    format!("{value:05}")
}

/// Product name to batch number table for one print session.
///
/// Two different products may draw the same number; the 90,000-value space
/// is what the printed label format allows and collisions are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRegistry {
    by_name: BTreeMap<String, String>,
}

impl BatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.trim().to_string()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.by_name.get(&Self::key(name)).map(String::as_str)
    }

    /// Returns the product's batch number, drawing a new one on first sight.
    pub fn assign(&mut self, name: &str, source: &mut dyn BatchNumberSource) -> String {
        self.by_name
            .entry(Self::key(name))
            .or_insert_with(|| generate_batch_number(source))
            .clone()
    }

    /// Records an externally assigned number, replacing any earlier one.
    pub fn insert(&mut self, name: &str, batch_number: impl Into<String>) {
        self.by_name.insert(Self::key(name), batch_number.into());
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_name.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_numbers_are_five_digits() {
        let mut source = RandomBatchSource::seeded(7);
        for _ in 0..2000 {
            let batch = generate_batch_number(&mut source);
            assert_eq!(batch.len(), 5);
            let value: u32 = batch.parse().expect("numeric");
            assert!((BATCH_NUMBER_MIN..=BATCH_NUMBER_MAX).contains(&value));
        }
    }

    #[test]
    fn seeded_sources_repeat() {
        let mut a = RandomBatchSource::seeded(42);
        let mut b = RandomBatchSource::seeded(42);
        let left: Vec<String> = (0..10).map(|_| generate_batch_number(&mut a)).collect();
        let right: Vec<String> = (0..10).map(|_| generate_batch_number(&mut b)).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn out_of_range_values_fold_into_range() {
        let mut source = SequenceBatchSource::new(vec![5, 123_456, 99_999]);
        assert_eq!(generate_batch_number(&mut source), "10005");
        assert_eq!(generate_batch_number(&mut source), "43456");
        assert_eq!(generate_batch_number(&mut source), "99999");
    }

    #[test]
    fn registry_reuses_number_per_product() {
        let mut source = SequenceBatchSource::new(vec![11111, 22222, 33333]);
        let mut registry = BatchRegistry::new();
        assert_eq!(registry.assign("Almonds", &mut source), "11111");
        assert_eq!(registry.assign("Walnuts", &mut source), "22222");
        assert_eq!(registry.assign(" Almonds ", &mut source), "11111");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("Walnuts"), Some("22222"));
        assert_eq!(registry.get("Saffron"), None);
    }

    #[test]
    fn colliding_draws_are_kept() {
        let mut source = SequenceBatchSource::new(vec![50505]);
        let mut registry = BatchRegistry::new();
        let a = registry.assign("Almonds", &mut source);
        let b = registry.assign("Walnuts", &mut source);
        assert_eq!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn registry_round_trips_through_json() {
        let mut registry = BatchRegistry::new();
        registry.insert("Honey", "12345");
        let json = serde_json::to_string(&registry).expect("ser");
        let back: BatchRegistry = serde_json::from_str(&json).expect("de");
        assert_eq!(back, registry);
        assert_eq!(back.iter().collect::<Vec<_>>(), vec![("Honey", "12345")]);
    }
}

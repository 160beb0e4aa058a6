use rand::Rng;

/// Unbiased in-place Fisher–Yates shuffle.
pub fn fisher_yates<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Uniform sample of `k` items without replacement, in random order.
pub fn sample<T, R: Rng + ?Sized>(mut pool: Vec<T>, k: usize, rng: &mut R) -> Vec<T> {
    fisher_yates(&mut pool, rng);
    pool.truncate(k);
    pool
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut items: Vec<u32> = (0..50).collect();
        fisher_yates(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_order() {
        let mut a: Vec<u32> = (0..20).collect();
        let mut b = a.clone();
        fisher_yates(&mut a, &mut StdRng::seed_from_u64(42));
        fisher_yates(&mut b, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn tiny_inputs_are_untouched() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut empty: Vec<u8> = vec![];
        fisher_yates(&mut empty, &mut rng);
        assert!(empty.is_empty());
        assert_eq!(sample(vec![9], 5, &mut rng), vec![9]);
    }

    #[test]
    fn all_permutations_are_equally_likely() {
        let mut rng = StdRng::seed_from_u64(2024);
        let trials = 60_000;
        let mut counts: HashMap<Vec<u8>, usize> = HashMap::new();
        for _ in 0..trials {
            let mut items = vec![0u8, 1, 2];
            fisher_yates(&mut items, &mut rng);
            *counts.entry(items).or_default() += 1;
        }
        assert_eq!(counts.len(), 6);
        let expected = trials as f64 / 6.0;
        for count in counts.values() {
            let deviation = (*count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "permutation skewed: {counts:?}");
        }
    }

    #[test]
    fn sample_draws_each_item_equally_often() {
        let mut rng = StdRng::seed_from_u64(99);
        let pool_size = 8;
        let k = 5;
        let trials = 40_000;
        let mut hits = vec![0usize; pool_size];
        for _ in 0..trials {
            let picked = sample((0..pool_size).collect(), k, &mut rng);
            assert_eq!(picked.len(), k);
            let mut distinct = picked.clone();
            distinct.sort_unstable();
            distinct.dedup();
            assert_eq!(distinct.len(), k);
            for item in picked {
                hits[item] += 1;
            }
        }
        let expected = trials as f64 * k as f64 / pool_size as f64;
        for hit in hits {
            assert!((hit as f64 - expected).abs() / expected < 0.03);
        }
    }
}

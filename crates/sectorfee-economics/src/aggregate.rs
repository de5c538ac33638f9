//! Date-bucket aggregation
//!
//! Per-sector amounts are bucketed by calendar-date key. Accumulation is
//! commutative and associative, so sectors may be processed in any order and
//! partitioned across workers whose partial aggregators are merged at the
//! end; the totals are identical to a sequential pass.
//!
//! Duplicate sector numbers are a caller error: the stored per-sector pledge
//! entry is overwritten while the penalty is added again. That behavior is
//! pinned by tests rather than silently changed; aggregation is only
//! order-independent when sector numbers are unique.

use std::collections::BTreeMap;

use sectorfee_core::amount::TokenAmount;

/// Accumulated totals for one calendar date
#[derive(Clone, Debug, Default)]
pub struct DateBucket {
    /// Per-sector pledge entries, keyed by sector number
    sectors: BTreeMap<u64, TokenAmount>,
    /// Penalty sum over every recorded sector
    penalty: TokenAmount,
}

impl DateBucket {
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    pub fn pledge_sum(&self) -> TokenAmount {
        self.sectors.values().cloned().sum()
    }

    pub fn penalty_sum(&self) -> &TokenAmount {
        &self.penalty
    }
}

/// Order-independent accumulator of (date, sector, pledge, penalty) tuples
#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    buckets: BTreeMap<String, DateBucket>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one sector's contribution to its date bucket
    pub fn record(
        &mut self,
        date_key: String,
        sector_number: u64,
        pledge: TokenAmount,
        penalty: TokenAmount,
    ) {
        let bucket = self.buckets.entry(date_key).or_default();
        bucket.sectors.insert(sector_number, pledge);
        bucket.penalty += &penalty;
    }

    /// Folds another (partial) aggregation into this one
    pub fn merge(&mut self, other: Aggregator) {
        for (date, incoming) in other.buckets {
            let bucket = self.buckets.entry(date).or_default();
            bucket.penalty += &incoming.penalty;
            bucket.sectors.extend(incoming.sectors);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Buckets in ascending date order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DateBucket)> {
        self.buckets.iter()
    }

    /// Grand totals: (sector count, pledge sum, penalty sum)
    pub fn totals(&self) -> (usize, TokenAmount, TokenAmount) {
        let mut count = 0;
        let mut pledge = TokenAmount::zero();
        let mut penalty = TokenAmount::zero();
        for bucket in self.buckets.values() {
            count += bucket.sector_count();
            pledge += &bucket.pledge_sum();
            penalty += &bucket.penalty;
        }
        (count, pledge, penalty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn atto(v: i64) -> TokenAmount {
        TokenAmount::from_atto(v)
    }

    #[test]
    fn test_two_sectors_share_a_bucket() {
        let mut agg = Aggregator::new();
        agg.record("2031-01-01".into(), 1, atto(100), atto(10_000_000_000_000_000));
        agg.record("2031-01-01".into(), 2, atto(200), atto(20_000_000_000_000_000));

        assert_eq!(agg.len(), 1);
        let bucket = agg.iter().next().unwrap().1;
        assert_eq!(bucket.sector_count(), 2);
        assert_eq!(bucket.pledge_sum(), atto(300));
        // penalties 0.01 + 0.02 = 0.03
        assert_eq!(bucket.penalty_sum().format_units(10), "0.0300000000");
    }

    #[test]
    fn test_duplicate_sector_number_semantics() {
        // Pledge entry is overwritten, penalty double-adds. Pinned so a
        // malformed sector set cannot silently change totals.
        let mut agg = Aggregator::new();
        agg.record("2031-01-01".into(), 7, atto(100), atto(5));
        agg.record("2031-01-01".into(), 7, atto(300), atto(5));

        let bucket = agg.iter().next().unwrap().1;
        assert_eq!(bucket.sector_count(), 1);
        assert_eq!(bucket.pledge_sum(), atto(300));
        assert_eq!(bucket.penalty_sum(), &atto(10));
    }

    #[test]
    fn test_merge_matches_sequential() {
        let rows = [
            ("2031-01-01", 1u64, 10i64, 1i64),
            ("2031-01-02", 2, 20, 2),
            ("2031-01-01", 3, 30, 3),
            ("2031-01-03", 4, 40, 4),
        ];

        let mut sequential = Aggregator::new();
        for (d, n, pl, pe) in rows {
            sequential.record(d.into(), n, atto(pl), atto(pe));
        }

        let mut left = Aggregator::new();
        let mut right = Aggregator::new();
        for (i, (d, n, pl, pe)) in rows.into_iter().enumerate() {
            let part = if i % 2 == 0 { &mut left } else { &mut right };
            part.record(d.into(), n, atto(pl), atto(pe));
        }
        let mut merged = Aggregator::new();
        merged.merge(right);
        merged.merge(left);

        assert_eq!(merged.totals(), sequential.totals());
        assert_eq!(merged.len(), sequential.len());
    }

    #[test]
    fn test_totals_equal_elementwise_sum() {
        let mut agg = Aggregator::new();
        let mut pledge_sum = 0i64;
        let mut penalty_sum = 0i64;
        for n in 0..100u64 {
            let pl = (n * 7 + 1) as i64;
            let pe = (n * 3 + 2) as i64;
            pledge_sum += pl;
            penalty_sum += pe;
            agg.record(format!("2031-01-{:02}", n % 28 + 1), n, atto(pl), atto(pe));
        }
        let (count, pledge, penalty) = agg.totals();
        assert_eq!(count, 100);
        assert_eq!(pledge, atto(pledge_sum));
        assert_eq!(penalty, atto(penalty_sum));
    }

    proptest! {
        #[test]
        fn prop_partitioning_never_changes_totals(
            rows in proptest::collection::vec(
                (0u32..8, 0u64..1000, 0i64..1_000_000, 0i64..1_000_000),
                0..200,
            ),
            split_mask in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            // Unique sector numbers per date-key: index them
            let mut sequential = Aggregator::new();
            let mut parts = [Aggregator::new(), Aggregator::new()];
            for (i, (day, _sector, pl, pe)) in rows.iter().enumerate() {
                let date = format!("2031-02-{:02}", day + 1);
                let sector = i as u64;
                sequential.record(date.clone(), sector, atto(*pl), atto(*pe));
                let side = *split_mask.get(i).unwrap_or(&false) as usize;
                parts[side].record(date, sector, atto(*pl), atto(*pe));
            }
            let [a, b] = parts;
            let mut merged = Aggregator::new();
            merged.merge(b);
            merged.merge(a);
            prop_assert_eq!(merged.totals(), sequential.totals());
            prop_assert_eq!(merged.len(), sequential.len());
        }
    }
}

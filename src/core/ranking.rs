use std::fmt::{Debug, Formatter};

use itertools::Itertools;

use crate::core::rate::KilowattHourRate;

/// Price of a single hour of the day.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PricePoint {
    /// Local hour of the day, `0..=23`.
    pub hour: u8,

    pub rate: KilowattHourRate,
}

impl PricePoint {
    pub const fn new(hour: u8, rate: KilowattHourRate) -> Self {
        Self { hour, rate }
    }
}

/// Hours of a day ordered from the cheapest to the most expensive.
///
/// Equal prices keep the order in which the hours were fetched, so the first N entries are
/// stable across repeated rankings of the same prices.
#[derive(Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct HourRanking(Vec<u8>);

impl HourRanking {
    /// Rank the price points without touching them.
    pub fn rank(points: &[PricePoint]) -> Self {
        // `sorted_by_key` is a stable sort.
        Self(points.iter().sorted_by_key(|point| point.rate).map(|point| point.hour).collect())
    }

    /// The `budget` cheapest hours, clamped to the ranking length.
    ///
    /// The repeated hour of a fall-back day takes two of the `budget` slots.
    #[must_use]
    pub fn cheapest(&self, budget: usize) -> &[u8] {
        &self.0[..budget.min(self.0.len())]
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HourRanking {
    fn from(hours: Vec<u8>) -> Self {
        Self(hours)
    }
}

impl Debug for HourRanking {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(rates: &[(u8, f64)]) -> Vec<PricePoint> {
        rates.iter().map(|(hour, rate)| PricePoint::new(*hour, KilowattHourRate(*rate))).collect()
    }

    #[test]
    fn rank_ok() {
        let ranking = HourRanking::rank(&points(&[(0, 0.10), (1, 0.05), (2, 0.20)]));
        assert_eq!(ranking.as_slice(), [1, 0, 2]);
        assert_eq!(ranking.cheapest(2), [1, 0]);
    }

    #[test]
    fn rank_empty() {
        let ranking = HourRanking::rank(&[]);
        assert!(ranking.is_empty());
        assert!(ranking.cheapest(5).is_empty());
    }

    #[test]
    fn rank_keeps_hour_order_for_equal_prices() {
        let points = points(&[(0, 0.2), (1, 0.1), (2, 0.2), (3, 0.1), (4, 0.2)]);
        let ranking = HourRanking::rank(&points);
        assert_eq!(ranking.as_slice(), [1, 3, 0, 2, 4]);
        assert_eq!(HourRanking::rank(&points), ranking);
    }

    #[test]
    fn rank_is_sorted_permutation() {
        let points = points(&[
            (0, 0.131),
            (1, 0.098),
            (2, 0.087),
            (3, 0.087),
            (4, 0.112),
            (5, 0.154),
            (6, 0.201),
            (7, 0.098),
        ]);
        let ranking = HourRanking::rank(&points);

        let mut hours = ranking.as_slice().to_vec();
        hours.sort_unstable();
        assert_eq!(hours, points.iter().map(|point| point.hour).collect_vec());

        let rate_of = |hour: u8| points.iter().find(|point| point.hour == hour).unwrap().rate;
        assert!(ranking.as_slice().iter().tuple_windows().all(|(a, b)| rate_of(*a) <= rate_of(*b)));
    }

    #[test]
    fn rank_does_not_assume_full_day() {
        // Spring-forward day: 23 hours.
        let points = (0..23_u8)
            .filter(|hour| *hour != 2)
            .map(|hour| PricePoint::new(hour, KilowattHourRate(f64::from(24 - hour))))
            .collect_vec();
        let ranking = HourRanking::rank(&points);
        assert_eq!(ranking.len(), 22);
        assert_eq!(ranking.cheapest(100).len(), 22);
        assert_eq!(ranking.cheapest(1), [22]);
    }

    #[test]
    fn cheapest_zero_budget() {
        let ranking = HourRanking::from(vec![1, 0, 2]);
        assert!(ranking.cheapest(0).is_empty());
    }
}

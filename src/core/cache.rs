use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use chrono::NaiveDate;
use tokio::sync::watch;

use crate::{
    api::price_source::PriceSource,
    core::{error::PriceFetchError, ranking::HourRanking},
    prelude::*,
};

type Fetched = Result<Arc<HourRanking>, PriceFetchError>;

/// Hour rankings memoized per calendar date.
///
/// At most one fetch per date is in flight: concurrent callers for the same missing date wait
/// for the leader's outcome. Failures are handed to the waiters and then forgotten.
pub struct DailyRankingCache {
    source: Box<dyn PriceSource>,
    rankings: RwLock<BTreeMap<NaiveDate, Arc<HourRanking>>>,
    in_flight: Mutex<HashMap<NaiveDate, watch::Receiver<Option<Fetched>>>>,
}

enum Role {
    Leader(watch::Sender<Option<Fetched>>),
    Follower(watch::Receiver<Option<Fetched>>),
}

/// Removes the in-flight marker even when the leader is dropped mid-fetch.
struct InFlightGuard<'a> {
    cache: &'a DailyRankingCache,
    date: NaiveDate,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.cache.in_flight.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.date);
    }
}

impl DailyRankingCache {
    pub fn new(source: Box<dyn PriceSource>) -> Self {
        Self { source, rankings: RwLock::default(), in_flight: Mutex::default() }
    }

    /// Cached ranking, never calls the source.
    pub fn get(&self, date: NaiveDate) -> Option<Arc<HourRanking>> {
        self.rankings.read().unwrap_or_else(PoisonError::into_inner).get(&date).cloned()
    }

    #[instrument(skip_all, fields(date = %date))]
    pub async fn get_or_refresh(&self, date: NaiveDate) -> Fetched {
        if let Some(ranking) = self.get(date) {
            return Ok(ranking);
        }

        let role = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            // The leader stores the ranking before it clears the marker.
            if let Some(ranking) = self.get(date) {
                return Ok(ranking);
            }
            if let Some(receiver) = in_flight.get(&date) {
                Role::Follower(receiver.clone())
            } else {
                let (sender, receiver) = watch::channel(None);
                in_flight.insert(date, receiver);
                Role::Leader(sender)
            }
        };

        match role {
            Role::Follower(mut receiver) => {
                debug!("waiting for the fetch in flight…");
                let fetched = receiver.wait_for(Option::is_some).await.ok().and_then(|it| it.clone());
                fetched.unwrap_or(Err(PriceFetchError::Abandoned))
            }
            Role::Leader(sender) => {
                let guard = InFlightGuard { cache: self, date };
                let fetched = self.refresh(date).await;
                drop(guard);
                sender.send_replace(Some(fetched.clone()));
                fetched
            }
        }
    }

    /// Drop the rankings of the dates strictly before `date`.
    pub fn prune_before(&self, date: NaiveDate) {
        let mut rankings = self.rankings.write().unwrap_or_else(PoisonError::into_inner);
        let retained = rankings.split_off(&date);
        let n_pruned = rankings.len();
        *rankings = retained;
        if n_pruned != 0 {
            debug!(n_pruned, "pruned old rankings");
        }
    }

    pub fn n_rankings(&self) -> usize {
        self.rankings.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn refresh(&self, date: NaiveDate) -> Fetched {
        info!("fetching prices…");
        let points = self.source.fetch(date).await?;
        let ranking = Arc::new(HourRanking::rank(&points));
        info!(n_points = points.len(), ?ranking, "ranked");
        self.rankings.write().unwrap_or_else(PoisonError::into_inner).insert(date, ranking.clone());
        Ok(ranking)
    }
}

#[cfg(test)]
pub mod tests {
    use std::{
        sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;

    use super::*;
    use crate::core::{rate::KilowattHourRate, ranking::PricePoint};

    /// Counts the calls and optionally fails them. Clones share the counters.
    #[derive(Clone, Default)]
    pub struct StubSource {
        pub n_calls: Arc<AtomicUsize>,
        pub failing: Arc<AtomicBool>,
        pub latency: Duration,
    }

    #[async_trait]
    impl PriceSource for StubSource {
        async fn fetch(&self, _on: NaiveDate) -> Result<Vec<PricePoint>, PriceFetchError> {
            self.n_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(PriceFetchError::Status(503));
            }
            Ok(vec![
                PricePoint::new(0, KilowattHourRate(0.10)),
                PricePoint::new(1, KilowattHourRate(0.05)),
                PricePoint::new(2, KilowattHourRate(0.20)),
            ])
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[tokio::test]
    async fn get_or_refresh_fetches_once() -> Result {
        let source = StubSource::default();
        let n_calls = source.n_calls.clone();
        let cache = DailyRankingCache::new(Box::new(source));

        let first = cache.get_or_refresh(date(5)).await?;
        let second = cache.get_or_refresh(date(5)).await?;

        assert_eq!(first.as_slice(), [1, 0, 2]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(n_calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_the_fetch() -> Result {
        let source = StubSource { latency: Duration::from_secs(1), ..StubSource::default() };
        let n_calls = source.n_calls.clone();
        let cache = DailyRankingCache::new(Box::new(source));

        let (first, second, third) = tokio::join!(
            cache.get_or_refresh(date(5)),
            cache.get_or_refresh(date(5)),
            cache.get_or_refresh(date(5)),
        );

        assert_eq!(first?.as_slice(), [1, 0, 2]);
        assert_eq!(second?.as_slice(), [1, 0, 2]);
        assert_eq!(third?.as_slice(), [1, 0, 2]);
        assert_eq!(n_calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_shared_and_not_cached() {
        let source = StubSource { latency: Duration::from_secs(1), ..StubSource::default() };
        source.failing.store(true, Ordering::SeqCst);
        let (n_calls, failing) = (source.n_calls.clone(), source.failing.clone());
        let cache = DailyRankingCache::new(Box::new(source));

        let (first, second) =
            tokio::join!(cache.get_or_refresh(date(5)), cache.get_or_refresh(date(5)));
        assert!(matches!(first, Err(PriceFetchError::Status(503))));
        assert!(matches!(second, Err(PriceFetchError::Status(503))));
        assert_eq!(n_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.n_rankings(), 0);
        assert!(cache.get(date(5)).is_none());

        failing.store(false, Ordering::SeqCst);
        assert!(cache.get_or_refresh(date(5)).await.is_ok());
        assert_eq!(n_calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.n_rankings(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_leader_releases_followers() {
        let source = StubSource { latency: Duration::from_secs(10), ..StubSource::default() };
        let n_calls = source.n_calls.clone();
        let cache = DailyRankingCache::new(Box::new(source));

        let leader = tokio::time::timeout(Duration::from_secs(1), cache.get_or_refresh(date(5)));
        let follower = async {
            tokio::task::yield_now().await;
            cache.get_or_refresh(date(5)).await
        };
        let (leader, follower) = tokio::join!(leader, follower);

        assert!(leader.is_err());
        assert!(matches!(follower, Err(PriceFetchError::Abandoned)));
        assert!(cache.in_flight.lock().unwrap().is_empty());

        assert!(cache.get_or_refresh(date(5)).await.is_ok());
        assert_eq!(n_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prune_before_ok() -> Result {
        let cache = DailyRankingCache::new(Box::new(StubSource::default()));
        cache.get_or_refresh(date(4)).await?;
        cache.get_or_refresh(date(5)).await?;
        cache.get_or_refresh(date(6)).await?;

        cache.prune_before(date(5));

        assert!(cache.get(date(4)).is_none());
        assert!(cache.get(date(5)).is_some());
        assert!(cache.get(date(6)).is_some());
        assert_eq!(cache.n_rankings(), 2);
        Ok(())
    }
}

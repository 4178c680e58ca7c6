//! Per-scope analysis cache with single-flight generation.
//!
//! Each scope is `absent`, `processing` (one caller is generating), or
//! `ready`. The map lives behind a `std::sync::Mutex` that is never held
//! across an `.await`; callers that find a scope `processing` park on the
//! generator's [`Notify`] and re-check once it finishes.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use problem_map_ai::{
    BriefAnswer, ExtendedAnswer, GenerationRequest, ModelChoice, ResponseSchema, TextGenerator,
};
use problem_map_analysis_models::{BriefForecast, CachedAnalysis, PopAnalysis};
use problem_map_analytics::{stats_by_city, stats_for_scope};
use problem_map_database::ProblemStore;
use problem_map_database_models::CachedAnalysisRow;
use problem_map_problem_models::Scope;
use tokio::sync::Notify;

use crate::config::AnalysisConfig;
use crate::prompts::{PromptKind, PromptTemplates};
use crate::{AnalysisError, UnavailableReason};

enum ScopeState {
    Processing(Arc<Notify>),
    Ready(CachedAnalysis),
}

enum Slot<'a> {
    Ready(CachedAnalysis),
    InFlight(Arc<Notify>),
    Claimed(Claim<'a>),
}

/// A claimed `processing` entry. Dropping it without a result returns the
/// scope to `absent`; either way waiters are woken.
struct Claim<'a> {
    scopes: &'a Mutex<BTreeMap<Scope, ScopeState>>,
    scope: Scope,
    notify: Arc<Notify>,
    result: Option<CachedAnalysis>,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        {
            let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
            let ours = matches!(
                scopes.get(&self.scope),
                Some(ScopeState::Processing(notify)) if Arc::ptr_eq(notify, &self.notify)
            );
            if ours {
                match self.result.take() {
                    Some(analysis) => {
                        scopes.insert(self.scope, ScopeState::Ready(analysis));
                    }
                    None => {
                        scopes.remove(&self.scope);
                    }
                }
            }
        }
        self.notify.notify_waiters();
    }
}

fn from_row(row: CachedAnalysisRow) -> CachedAnalysis {
    CachedAnalysis {
        scope: row.scope,
        text: row.text,
        status: row.status,
        created_at: row.created_at,
    }
}

/// Generates and caches analyses. Construct one at startup and share it
/// through an `Arc`.
pub struct AnalysisCache {
    store: Arc<dyn ProblemStore>,
    generator: Arc<dyn TextGenerator>,
    prompts: PromptTemplates,
    config: AnalysisConfig,
    scopes: Mutex<BTreeMap<Scope, ScopeState>>,
}

impl AnalysisCache {
    /// Creates an empty cache over `store`, generating with `generator`.
    #[must_use]
    pub fn new(
        store: Arc<dyn ProblemStore>,
        generator: Arc<dyn TextGenerator>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            store,
            generator,
            prompts: PromptTemplates::embedded(),
            config,
            scopes: Mutex::new(BTreeMap::new()),
        }
    }

    /// The settings this cache runs with.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<Scope, ScopeState>> {
        self.scopes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the commentary for `scope`, generating it on first use.
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::UnknownScope`] if the district does not exist
    /// * [`AnalysisError::Unavailable`] if generation or persistence fails,
    ///   or the scope stays in flight for too many re-checks
    /// * [`AnalysisError::Store`] if the existence lookup fails
    pub async fn get_analysis(&self, scope: Scope) -> Result<CachedAnalysis, AnalysisError> {
        self.validate(scope).await?;

        let mut waits = 0;
        loop {
            let notify = match self.slot(scope) {
                Slot::Ready(analysis) => {
                    log::debug!("Analysis cache hit for {scope}");
                    return Ok(analysis);
                }
                Slot::Claimed(claim) => return self.fill(claim).await,
                Slot::InFlight(notify) => notify,
            };

            if waits == self.config.max_attempts {
                return Err(AnalysisError::Unavailable {
                    scope,
                    reason: UnavailableReason::AttemptsExhausted { attempts: waits },
                });
            }
            waits += 1;

            log::debug!("Waiting for in-flight analysis of {scope} ({waits})");
            let mut notified = pin!(notify.notified());
            notified.as_mut().enable();
            if self.is_in_flight(scope, &notify) {
                notified.await;
            }
        }
    }

    fn slot(&self, scope: Scope) -> Slot<'_> {
        let mut scopes = self.lock();
        match scopes.get(&scope) {
            Some(ScopeState::Ready(analysis)) => Slot::Ready(analysis.clone()),
            Some(ScopeState::Processing(notify)) => Slot::InFlight(Arc::clone(notify)),
            None => {
                let notify = Arc::new(Notify::new());
                scopes.insert(scope, ScopeState::Processing(Arc::clone(&notify)));
                Slot::Claimed(Claim {
                    scopes: &self.scopes,
                    scope,
                    notify,
                    result: None,
                })
            }
        }
    }

    fn is_in_flight(&self, scope: Scope, notify: &Arc<Notify>) -> bool {
        matches!(
            self.lock().get(&scope),
            Some(ScopeState::Processing(current)) if Arc::ptr_eq(current, notify)
        )
    }

    async fn fill(&self, mut claim: Claim<'_>) -> Result<CachedAnalysis, AnalysisError> {
        let scope = claim.scope;
        match self.load_or_generate(scope).await {
            Ok(analysis) => {
                claim.result = Some(analysis.clone());
                Ok(analysis)
            }
            Err(reason) => {
                log::warn!("Analysis for {scope} failed: {reason}");
                Err(AnalysisError::Unavailable { scope, reason })
            }
        }
    }

    async fn load_or_generate(&self, scope: Scope) -> Result<CachedAnalysis, UnavailableReason> {
        if let Some(row) = self.store.get_cached_analysis(scope).await? {
            log::debug!("Loaded persisted analysis for {scope}");
            return Ok(from_row(row));
        }

        let prompt = self.prompt(PromptKind::Extended, scope).await?;

        log::info!("Generating analysis for {scope}");
        let raw = self
            .generator
            .generate(&GenerationRequest {
                model: ModelChoice::Default,
                prompt,
                schema: ResponseSchema::Extended,
            })
            .await?;
        let answer: ExtendedAnswer = ResponseSchema::Extended.decode(&raw)?;

        let row = self
            .store
            .put_cached_analysis(scope, &answer.extended_answer, &answer.status)
            .await?;

        Ok(from_row(row))
    }

    async fn prompt(&self, kind: PromptKind, scope: Scope) -> Result<String, UnavailableReason> {
        let stats = stats_for_scope(self.store.as_ref(), scope).await?;
        let city = if scope == Scope::City {
            None
        } else {
            Some(stats_by_city(self.store.as_ref()).await?)
        };

        self.prompts
            .render(kind, &self.config.city_name, &stats, city.as_ref())
            .map_err(UnavailableReason::from)
    }

    async fn validate(&self, scope: Scope) -> Result<(), AnalysisError> {
        match scope {
            Scope::District(id) => {
                if !self.store.district_exists(id).await? {
                    return Err(AnalysisError::UnknownScope {
                        kind: scope.kind(),
                        id,
                    });
                }
            }
            Scope::Category(_) | Scope::City => {}
        }
        Ok(())
    }

    /// Drops the cached commentary for `scope`, in memory and persisted,
    /// so the next read regenerates it. A generation already in flight is
    /// left alone.
    ///
    /// Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::Store`] if the persisted row cannot be
    /// deleted.
    pub async fn invalidate(&self, scope: Scope) -> Result<bool, AnalysisError> {
        let in_memory = {
            let mut scopes = self.lock();
            if matches!(scopes.get(&scope), Some(ScopeState::Ready(_))) {
                scopes.remove(&scope);
                true
            } else {
                false
            }
        };

        let persisted = self.store.delete_cached_analysis(scope).await?;
        if in_memory || persisted {
            log::info!("Invalidated analysis for {scope}");
        }

        Ok(in_memory || persisted)
    }

    /// Produces short forecasts for two scopes concurrently. Nothing is
    /// cached.
    ///
    /// If `cancel` completes first, the district checks and both
    /// generations are dropped and the call fails with
    /// [`AnalysisError::Cancelled`].
    ///
    /// # Errors
    ///
    /// * [`AnalysisError::UnknownScope`] if either district does not exist
    /// * [`AnalysisError::Unavailable`] if either generation fails
    /// * [`AnalysisError::Cancelled`] if `cancel` fires first
    pub async fn pop_analysis(
        &self,
        first: Scope,
        second: Scope,
        cancel: impl Future<Output = ()>,
    ) -> Result<PopAnalysis, AnalysisError> {
        let both = async {
            self.validate(first).await?;
            self.validate(second).await?;
            tokio::try_join!(self.brief(first), self.brief(second))
        };

        tokio::select! {
            result = both => {
                let (first, second) = result?;
                Ok(PopAnalysis { first, second })
            }
            () = cancel => {
                log::warn!("Pop analysis for {first} and {second} cancelled");
                Err(AnalysisError::Cancelled)
            }
        }
    }

    /// [`Self::pop_analysis`] cancelled after `timeout`.
    ///
    /// # Errors
    ///
    /// See [`Self::pop_analysis`].
    pub async fn pop_analysis_with_timeout(
        &self,
        first: Scope,
        second: Scope,
        timeout: Duration,
    ) -> Result<PopAnalysis, AnalysisError> {
        self.pop_analysis(first, second, tokio::time::sleep(timeout))
            .await
    }

    async fn brief(&self, scope: Scope) -> Result<BriefForecast, AnalysisError> {
        let text = self
            .generate_brief(scope)
            .await
            .map_err(|reason| AnalysisError::Unavailable { scope, reason })?;
        Ok(BriefForecast { scope, text })
    }

    async fn generate_brief(&self, scope: Scope) -> Result<String, UnavailableReason> {
        let prompt = self.prompt(PromptKind::Pop, scope).await?;
        let raw = self
            .generator
            .generate(&GenerationRequest {
                model: ModelChoice::Light,
                prompt,
                schema: ResponseSchema::Brief,
            })
            .await?;
        let answer: BriefAnswer = ResponseSchema::Brief.decode(&raw)?;
        Ok(answer.brief_answer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use geo::{LineString, MultiPolygon, Polygon};
    use problem_map_ai::AiError;
    use problem_map_database::{DbError, MemoryStore};
    use problem_map_database_models::{
        DensityMap, DistrictRef, DistrictRow, NewDistrict, NewProblem, ProblemRow, RollupFilter,
        RollupRow,
    };
    use problem_map_problem_models::{ProblemCategory, ProblemStatus};

    use super::*;

    const DISTRICT: i64 = 3_072_217;
    const OTHER_DISTRICT: i64 = 3_390_291;

    /// Answers every request after `delay`, failing the first `failures`
    /// calls.
    struct ScriptedGenerator {
        calls: AtomicUsize,
        delay: Duration,
        failures: usize,
        reply: Option<String>,
    }

    impl ScriptedGenerator {
        fn new(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay,
                failures: 0,
                reply: None,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, AiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if call <= self.failures {
                return Err(AiError::Provider {
                    message: "quota exceeded".to_string(),
                });
            }
            if let Some(reply) = &self.reply {
                return Ok(reply.clone());
            }

            let answer = match request.schema {
                ResponseSchema::Extended => serde_json::json!({
                    "extended_answer": format!("Analysis #{call}"),
                    "status": "ok",
                }),
                ResponseSchema::Brief => serde_json::json!({
                    "brief_answer": format!("expected: roads #{call}"),
                }),
            };
            Ok(answer.to_string())
        }
    }

    fn square(min_x: f64, min_y: f64, size: f64) -> MultiPolygon<f64> {
        let ring = LineString::from(vec![
            (min_x, min_y),
            (min_x + size, min_y),
            (min_x + size, min_y + size),
            (min_x, min_y + size),
            (min_x, min_y),
        ]);
        MultiPolygon(vec![Polygon::new(ring, vec![])])
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        store.add_district(DISTRICT, "Almaly", square(76.90, 43.20, 0.05));
        store.add_district(OTHER_DISTRICT, "Bostandyk", square(76.85, 43.15, 0.05));
        store
            .insert_problem(&NewProblem {
                district_id: DISTRICT,
                longitude: 76.92,
                latitude: 43.22,
                name: "Pothole".to_string(),
                description: "Deep pothole on the crossing".to_string(),
                category: ProblemCategory::RoadsTransport,
                importance: 7.0,
                status: ProblemStatus::Created,
                image_ref: None,
            })
            .await
            .unwrap();
        Arc::new(store)
    }

    fn cache(store: Arc<MemoryStore>, generator: Arc<ScriptedGenerator>) -> AnalysisCache {
        AnalysisCache::new(store, generator, AnalysisConfig::default())
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let cache = cache(seeded_store().await, generator.clone());

        let first = cache.get_analysis(Scope::District(DISTRICT)).await.unwrap();
        let second = cache.get_analysis(Scope::District(DISTRICT)).await.unwrap();

        assert_eq!(first.text, "Analysis #1");
        assert_eq!(first, second);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_cold_calls_generate_once() {
        let store = seeded_store().await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_millis(500)));
        let cache = cache(store.clone(), generator.clone());

        let results = futures::future::join_all(
            (0..8).map(|_| cache.get_analysis(Scope::Category(ProblemCategory::RoadsTransport))),
        )
        .await;

        assert_eq!(generator.calls(), 1);
        for result in &results {
            assert_eq!(result.as_ref().unwrap().text, "Analysis #1");
        }
        let persisted = store
            .get_cached_analysis(Scope::Category(ProblemCategory::RoadsTransport))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(persisted.text, "Analysis #1");
    }

    #[tokio::test]
    async fn failure_releases_scope_for_retry() {
        let store = seeded_store().await;
        let generator = Arc::new(ScriptedGenerator {
            failures: 1,
            ..ScriptedGenerator::new(Duration::ZERO)
        });
        let cache = cache(store.clone(), generator.clone());

        let err = cache.get_analysis(Scope::City).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Unavailable {
                reason: UnavailableReason::GenerationFailed(_),
                ..
            }
        ));
        assert!(cache.lock().is_empty());
        assert!(store.get_cached_analysis(Scope::City).await.unwrap().is_none());

        let analysis = cache.get_analysis(Scope::City).await.unwrap();
        assert_eq!(analysis.text, "Analysis #2");
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn malformed_answer_is_a_generation_failure() {
        let generator = Arc::new(ScriptedGenerator {
            reply: Some(r#"{"extended_answer": "no status"}"#.to_string()),
            ..ScriptedGenerator::new(Duration::ZERO)
        });
        let cache = cache(seeded_store().await, generator);

        let err = cache.get_analysis(Scope::City).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Unavailable {
                reason: UnavailableReason::GenerationFailed(AiError::Schema { .. }),
                ..
            }
        ));
        assert!(cache.lock().is_empty());
    }

    #[tokio::test]
    async fn unknown_district_never_reaches_generator() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let cache = cache(seeded_store().await, generator.clone());

        let err = cache.get_analysis(Scope::District(42)).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::UnknownScope {
                kind: "district",
                id: 42
            }
        ));

        let err = cache
            .pop_analysis_with_timeout(
                Scope::District(DISTRICT),
                Scope::District(42),
                Duration::from_secs(30),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::UnknownScope { id: 42, .. }));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn persisted_analysis_outlives_the_cache() {
        let store = seeded_store().await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));

        let first = cache(store.clone(), generator.clone())
            .get_analysis(Scope::District(DISTRICT))
            .await
            .unwrap();
        let restarted = cache(store, generator.clone())
            .get_analysis(Scope::District(DISTRICT))
            .await
            .unwrap();

        assert_eq!(first, restarted);
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_regeneration() {
        let store = seeded_store().await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let cache = cache(store.clone(), generator.clone());

        cache.get_analysis(Scope::City).await.unwrap();
        assert!(cache.invalidate(Scope::City).await.unwrap());
        assert!(store.get_cached_analysis(Scope::City).await.unwrap().is_none());
        assert!(!cache.invalidate(Scope::City).await.unwrap());

        let analysis = cache.get_analysis(Scope::City).await.unwrap();
        assert_eq!(analysis.text, "Analysis #2");
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_generation_releases_scope() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_secs(5)));
        let cache = cache(seeded_store().await, generator.clone());

        let timed_out =
            tokio::time::timeout(Duration::from_secs(1), cache.get_analysis(Scope::City)).await;
        assert!(timed_out.is_err());
        assert!(cache.lock().is_empty());

        let analysis = cache.get_analysis(Scope::City).await.unwrap();
        assert_eq!(analysis.text, "Analysis #2");
    }

    #[tokio::test]
    async fn waiter_gives_up_after_max_attempts() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let cache = AnalysisCache::new(
            seeded_store().await,
            generator.clone(),
            AnalysisConfig {
                max_attempts: 2,
                ..AnalysisConfig::default()
            },
        );

        let stuck = Arc::new(Notify::new());
        cache
            .lock()
            .insert(Scope::City, ScopeState::Processing(stuck.clone()));

        let (result, ()) = tokio::join!(cache.get_analysis(Scope::City), async {
            for _ in 0..5 {
                tokio::task::yield_now().await;
                stuck.notify_waiters();
            }
        });

        assert!(matches!(
            result,
            Err(AnalysisError::Unavailable {
                reason: UnavailableReason::AttemptsExhausted { attempts: 2 },
                ..
            })
        ));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn pop_analysis_returns_both_forecasts_uncached() {
        let store = seeded_store().await;
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let cache = cache(store.clone(), generator.clone());

        let pop = cache
            .pop_analysis_with_timeout(
                Scope::District(DISTRICT),
                Scope::District(OTHER_DISTRICT),
                Duration::from_secs(30),
            )
            .await
            .unwrap();

        assert_eq!(pop.first.scope, Scope::District(DISTRICT));
        assert_eq!(pop.second.scope, Scope::District(OTHER_DISTRICT));
        assert!(pop.first.text.starts_with("expected: "));
        assert!(pop.second.text.starts_with("expected: "));
        assert_eq!(generator.calls(), 2);
        assert!(
            store
                .get_cached_analysis(Scope::District(DISTRICT))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pop_analysis_is_cancelled_at_timeout() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::from_secs(5)));
        let cache = cache(seeded_store().await, generator);

        let started = tokio::time::Instant::now();
        let err = cache
            .pop_analysis_with_timeout(
                Scope::District(DISTRICT),
                Scope::District(OTHER_DISTRICT),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, AnalysisError::Cancelled));
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
    }

    /// Store whose district lookups hang for `delay`.
    struct SlowStore {
        inner: Arc<MemoryStore>,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl ProblemStore for SlowStore {
        async fn find_districts(&self, point_wkt: &str) -> Result<Vec<DistrictRef>, DbError> {
            self.inner.find_districts(point_wkt).await
        }
        async fn district_exists(&self, district_id: i64) -> Result<bool, DbError> {
            tokio::time::sleep(self.delay).await;
            self.inner.district_exists(district_id).await
        }
        async fn list_districts(&self) -> Result<Vec<DistrictRow>, DbError> {
            self.inner.list_districts().await
        }
        async fn upsert_district(&self, district: &NewDistrict) -> Result<(), DbError> {
            self.inner.upsert_district(district).await
        }
        async fn insert_problem(&self, problem: &NewProblem) -> Result<ProblemRow, DbError> {
            self.inner.insert_problem(problem).await
        }
        async fn get_problem(&self, id: i64) -> Result<Option<ProblemRow>, DbError> {
            self.inner.get_problem(id).await
        }
        async fn list_problems(&self) -> Result<Vec<ProblemRow>, DbError> {
            self.inner.list_problems().await
        }
        async fn list_problems_by_district(
            &self,
            district_id: i64,
        ) -> Result<Vec<ProblemRow>, DbError> {
            self.inner.list_problems_by_district(district_id).await
        }
        async fn rollup(&self, filter: RollupFilter) -> Result<Vec<RollupRow>, DbError> {
            self.inner.rollup(filter).await
        }
        async fn get_cached_analysis(
            &self,
            scope: Scope,
        ) -> Result<Option<CachedAnalysisRow>, DbError> {
            self.inner.get_cached_analysis(scope).await
        }
        async fn put_cached_analysis(
            &self,
            scope: Scope,
            text: &str,
            status: &str,
        ) -> Result<CachedAnalysisRow, DbError> {
            self.inner.put_cached_analysis(scope, text, status).await
        }
        async fn delete_cached_analysis(&self, scope: Scope) -> Result<bool, DbError> {
            self.inner.delete_cached_analysis(scope).await
        }
        async fn get_density_map(&self) -> Result<Option<DensityMap>, DbError> {
            self.inner.get_density_map().await
        }
        async fn put_density_map(&self, map: &DensityMap) -> Result<(), DbError> {
            self.inner.put_density_map(map).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pop_analysis_timeout_covers_district_checks() {
        let generator = Arc::new(ScriptedGenerator::new(Duration::ZERO));
        let store = Arc::new(SlowStore {
            inner: seeded_store().await,
            delay: Duration::from_secs(5),
        });
        let cache = AnalysisCache::new(store, generator.clone(), AnalysisConfig::default());

        let started = tokio::time::Instant::now();
        let err = cache
            .pop_analysis_with_timeout(
                Scope::District(DISTRICT),
                Scope::District(OTHER_DISTRICT),
                Duration::from_secs(2),
            )
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, AnalysisError::Cancelled));
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_secs(3));
        assert_eq!(generator.calls(), 0);
    }
}

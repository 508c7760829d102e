//! Multi-platform result aggregation
//!
//! Indexes results by (unique name, platform), tracks when a case has a
//! result for every platform it expects, and counts outcomes per platform.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::models::{Platform, ResultKind, TestIdentity, TestResult};

/// Errors raised when recording a result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregatorError {
    #[error("Result for {name} on {platform} already recorded")]
    DuplicateResult { name: String, platform: Platform },

    #[error("Platform {platform} is not expected for {name}")]
    UnexpectedPlatform { name: String, platform: Platform },
}

/// Completion state of one case
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CaseState {
    /// No platform has reported
    Pending,
    /// Some but not all expected platforms have reported
    Partial,
    /// Every expected platform has exactly one result
    Complete,
}

/// Copy of one case's aggregated state
#[derive(Clone, Debug)]
pub struct CaseSnapshot {
    pub identity: Arc<TestIdentity>,
    pub state: CaseState,
    /// Results in expected platform order; `None` where not yet reported
    pub results: Vec<(Platform, Option<TestResult>)>,
}

impl CaseSnapshot {
    pub fn is_complete(&self) -> bool {
        self.state == CaseState::Complete
    }

    /// Reported results in platform order
    pub fn reported(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter_map(|(_, r)| r.as_ref())
    }

    /// Platforms grouped by outcome, in kind order
    pub fn platforms_by_kind(&self) -> BTreeMap<ResultKind, Vec<Platform>> {
        let mut groups: BTreeMap<ResultKind, Vec<Platform>> = BTreeMap::new();
        for result in self.reported() {
            groups
                .entry(result.kind)
                .or_default()
                .push(result.platform.clone());
        }
        groups
    }

    /// Platforms grouped by identical output, in first-seen order
    pub fn outputs(&self) -> Vec<(Vec<Platform>, String)> {
        let mut groups: Vec<(Vec<Platform>, String)> = Vec::new();
        for result in self.reported() {
            match groups.iter_mut().find(|(_, text)| *text == result.output) {
                Some((platforms, _)) => platforms.push(result.platform.clone()),
                None => groups.push((vec![result.platform.clone()], result.output.clone())),
            }
        }
        groups
    }

    /// Mean duration over reported results
    pub fn average_duration(&self) -> std::time::Duration {
        let (total, count) = self
            .reported()
            .fold((std::time::Duration::ZERO, 0u32), |(total, count), r| {
                (total + r.duration(), count + 1)
            });
        if count == 0 {
            std::time::Duration::ZERO
        } else {
            total / count
        }
    }

    pub fn any(&self, kind: ResultKind) -> bool {
        self.reported().any(|r| r.kind == kind)
    }

    pub fn all(&self, kind: ResultKind) -> bool {
        self.reported().all(|r| r.kind == kind)
    }
}

/// Outcome counts by kind and platform
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryCounts {
    pub by_kind: BTreeMap<ResultKind, BTreeMap<Platform, usize>>,
    pub totals: BTreeMap<ResultKind, usize>,
}

impl SummaryCounts {
    pub fn count(&self, kind: ResultKind, platform: &Platform) -> usize {
        self.by_kind
            .get(&kind)
            .and_then(|platforms| platforms.get(platform))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, kind: ResultKind) -> usize {
        self.totals.get(&kind).copied().unwrap_or(0)
    }

    pub fn grand_total(&self) -> usize {
        self.totals.values().sum()
    }
}

struct Entry {
    identity: Arc<TestIdentity>,
    platforms: Vec<Platform>,
    results: HashMap<Platform, TestResult>,
}

impl Entry {
    fn state(&self) -> CaseState {
        if self.results.is_empty() {
            CaseState::Pending
        } else if self.platforms.iter().all(|p| self.results.contains_key(p)) {
            CaseState::Complete
        } else {
            CaseState::Partial
        }
    }

    fn snapshot(&self) -> CaseSnapshot {
        CaseSnapshot {
            identity: Arc::clone(&self.identity),
            state: self.state(),
            results: self
                .platforms
                .iter()
                .map(|p| (p.clone(), self.results.get(p).cloned()))
                .collect(),
        }
    }
}

#[derive(Default)]
struct Index {
    order: Vec<String>,
    entries: HashMap<String, Entry>,
}

impl Index {
    fn register(&mut self, identity: Arc<TestIdentity>, platforms: Vec<Platform>) -> &mut Entry {
        let name = identity.unique_name.clone();
        if !self.entries.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.entries.entry(name).or_insert_with(|| Entry {
            identity,
            platforms,
            results: HashMap::new(),
        })
    }
}

/// Thread-safe index of results across platforms
pub struct PlatformAggregator {
    platforms: Vec<Platform>,
    index: Mutex<Index>,
}

impl PlatformAggregator {
    pub fn new(platforms: impl IntoIterator<Item = Platform>) -> Self {
        Self {
            platforms: platforms.into_iter().collect(),
            index: Mutex::new(Index::default()),
        }
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    /// Expect a result from every aggregator platform
    pub fn expect(&self, identity: Arc<TestIdentity>) {
        self.expect_on(identity, self.platforms.clone());
    }

    /// Expect results from the given platforms only
    pub fn expect_on(&self, identity: Arc<TestIdentity>, platforms: Vec<Platform>) {
        self.index.lock().register(identity, platforms);
    }

    /// Record one result. The first result per (case, platform) wins.
    pub fn record(&self, result: TestResult) -> Result<CaseState, AggregatorError> {
        let mut index = self.index.lock();
        let entry = index.register(Arc::clone(&result.test), self.platforms.clone());

        if !entry.platforms.contains(&result.platform) {
            return Err(AggregatorError::UnexpectedPlatform {
                name: result.test.unique_name.clone(),
                platform: result.platform,
            });
        }
        if entry.results.contains_key(&result.platform) {
            warn!(
                "Duplicate result for {} on {}",
                result.test, result.platform
            );
            return Err(AggregatorError::DuplicateResult {
                name: result.test.unique_name.clone(),
                platform: result.platform,
            });
        }

        entry.results.insert(result.platform.clone(), result);
        Ok(entry.state())
    }

    pub fn state(&self, unique_name: &str) -> CaseState {
        self.index
            .lock()
            .entries
            .get(unique_name)
            .map(Entry::state)
            .unwrap_or(CaseState::Pending)
    }

    pub fn is_complete(&self, unique_name: &str) -> bool {
        self.state(unique_name) == CaseState::Complete
    }

    pub fn case(&self, unique_name: &str) -> Option<CaseSnapshot> {
        self.index.lock().entries.get(unique_name).map(Entry::snapshot)
    }

    /// Every case in registration order
    pub fn cases(&self) -> Vec<CaseSnapshot> {
        let index = self.index.lock();
        index
            .order
            .iter()
            .filter_map(|name| index.entries.get(name))
            .map(Entry::snapshot)
            .collect()
    }

    /// All recorded results, in case registration then platform order
    pub fn results(&self) -> Vec<TestResult> {
        let index = self.index.lock();
        index
            .order
            .iter()
            .filter_map(|name| index.entries.get(name))
            .flat_map(|entry| {
                entry
                    .platforms
                    .iter()
                    .filter_map(|p| entry.results.get(p).cloned())
            })
            .collect()
    }

    /// Number of results expected from a platform
    pub fn expected_count(&self, platform: &Platform) -> usize {
        self.index
            .lock()
            .entries
            .values()
            .filter(|e| e.platforms.contains(platform))
            .count()
    }

    /// Number of results recorded for a platform
    pub fn recorded_count(&self, platform: &Platform) -> usize {
        self.index
            .lock()
            .entries
            .values()
            .filter(|e| e.results.contains_key(platform))
            .count()
    }

    pub fn summary_counts(&self) -> SummaryCounts {
        let index = self.index.lock();
        let mut counts = SummaryCounts::default();
        for result in index.entries.values().flat_map(|e| e.results.values()) {
            *counts
                .by_kind
                .entry(result.kind)
                .or_default()
                .entry(result.platform.clone())
                .or_default() += 1;
            *counts.totals.entry(result.kind).or_default() += 1;
        }
        counts
    }
}

//! Folding contributing pull requests into one release aggregate.
//!
//! Fetches are issued concurrently and joined with an all-settle join: a
//! failed fetch is logged and recorded as skipped, it never fails the others.
//! Entries keep the order in which numbers were supplied, whatever order the
//! responses arrive in.

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::{ChangeMarkers, ChangeType};
use crate::config::BotConfig;
use crate::contract::{PullRequest, PullRequestProvider};
use crate::error::ReleaseError;
use crate::normalize::normalize;
use crate::section::extract_summary;

/// One contributing pull request, distilled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PullRequestSummary {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub url: String,
    pub raw_body: String,
    pub normalized_bullets: Vec<String>,
    pub change_type: ChangeType,
    pub markers: ChangeMarkers,
}

impl PullRequestSummary {
    /// Builds the summary of `pr`.
    ///
    /// Fails with [`ReleaseError::MissingBody`] when the description is empty.
    /// A description without the summary section falls back to the title.
    pub fn from_pull_request(pr: &PullRequest, config: &BotConfig) -> Result<Self, ReleaseError> {
        let raw_body = pr
            .body
            .as_deref()
            .filter(|body| !body.trim().is_empty())
            .ok_or(ReleaseError::MissingBody(pr.number))?;

        let section = match extract_summary(raw_body, &config.sections) {
            Some(section) => section,
            None => {
                let heading = config.sections.summary_heading.clone();
                let condition = ReleaseError::UnparsableSection(pr.number, heading);
                warn!(pr = pr.number, error = %condition, "[AGGREGATE] Falling back to title");
                ""
            }
        };

        let markers = ChangeMarkers::scan(raw_body, &config.classifier);

        Ok(Self {
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
            url: pr.url.clone(),
            raw_body: raw_body.to_string(),
            normalized_bullets: normalize(section, &pr.title, &config.normalizer),
            change_type: markers.change_type(),
            markers,
        })
    }
}

/// Why a contributing pull request is absent from the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    MissingBody,
    ProviderUnavailable(String),
    DeployPullRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPullRequest {
    pub number: u64,
    pub reason: SkipReason,
}

/// All contributing pull requests of one release, deduplicated by number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseAggregate {
    entries: Vec<PullRequestSummary>,
    skipped: Vec<SkippedPullRequest>,
}

impl ReleaseAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `summary`. An entry with the same number is replaced in place, so
    /// the first discovery position and the last value are kept.
    pub fn insert(&mut self, summary: PullRequestSummary) {
        match self.entries.iter_mut().find(|e| e.number == summary.number) {
            Some(existing) => *existing = summary,
            None => self.entries.push(summary),
        }
    }

    pub fn skip(&mut self, number: u64, reason: SkipReason) {
        self.skipped.push(SkippedPullRequest { number, reason });
    }

    pub fn entries(&self) -> &[PullRequestSummary] {
        &self.entries
    }

    pub fn skipped(&self) -> &[SkippedPullRequest] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum change type over all entries; `Patch` for an empty aggregate.
    pub fn dominant_change_type(&self) -> ChangeType {
        self.entries
            .iter()
            .map(|e| e.change_type)
            .max()
            .unwrap_or_default()
    }

    /// Union of the checklist markers ticked across all entries.
    pub fn markers(&self) -> ChangeMarkers {
        self.entries
            .iter()
            .fold(ChangeMarkers::default(), |acc, e| acc.union(e.markers))
    }
}

impl FromIterator<PullRequestSummary> for ReleaseAggregate {
    fn from_iter<I: IntoIterator<Item = PullRequestSummary>>(iter: I) -> Self {
        let mut aggregate = Self::new();
        for summary in iter {
            aggregate.insert(summary);
        }
        aggregate
    }
}

/// Fetches every pull request in `numbers` once and folds them into an aggregate.
pub async fn aggregate<P>(provider: &P, numbers: &[u64], config: &BotConfig) -> ReleaseAggregate
where
    P: PullRequestProvider + ?Sized,
{
    let mut unique: Vec<u64> = Vec::with_capacity(numbers.len());
    for number in numbers {
        if !unique.contains(number) {
            unique.push(*number);
        }
    }
    info!(
        requested = numbers.len(),
        unique = unique.len(),
        "[AGGREGATE] Fetching contributing pull requests"
    );

    let fetches = unique.iter().map(|&number| async move {
        (number, provider.get_pull_request(number).await)
    });
    let results = join_all(fetches).await;

    let mut aggregate = ReleaseAggregate::new();
    for (number, result) in results {
        let pr = match result {
            Ok(pr) => pr,
            Err(e) => {
                let condition = ReleaseError::ProviderUnavailable(e);
                warn!(pr = number, error = %condition, "[AGGREGATE] Skipping pull request");
                aggregate.skip(number, SkipReason::ProviderUnavailable(condition.to_string()));
                continue;
            }
        };

        if pr.title == config.release.deploy_title {
            debug!(pr = number, "[AGGREGATE] Skipping the deploy pull request itself");
            aggregate.skip(number, SkipReason::DeployPullRequest);
            continue;
        }

        match PullRequestSummary::from_pull_request(&pr, config) {
            Ok(summary) => {
                debug!(
                    pr = number,
                    bullets = summary.normalized_bullets.len(),
                    change_type = %summary.change_type,
                    "[AGGREGATE] Summarised pull request"
                );
                aggregate.insert(summary);
            }
            Err(e) => {
                warn!(pr = number, error = %e, "[AGGREGATE] Skipping pull request");
                aggregate.skip(number, SkipReason::MissingBody);
            }
        }
    }

    info!(
        entries = aggregate.entries().len(),
        skipped = aggregate.skipped().len(),
        dominant = %aggregate.dominant_change_type(),
        "[AGGREGATE] Aggregation complete"
    );
    aggregate
}

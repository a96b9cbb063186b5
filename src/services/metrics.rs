// src/services/metrics.rs
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    CacheHit,
    CacheMiss,
    CorruptedCache,
    SuccessfulRequests,
    FailedRequests,
    EmptyResponses,
    ProcessedCompanies,
    FailedToProcessCompany,
    AddedExpiryToEntry,
    ConvertedTTLToExpiryInEntry,
    CopiedEntry,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::CacheHit => "CacheHit",
            Metric::CacheMiss => "CacheMiss",
            Metric::CorruptedCache => "CorruptedCache",
            Metric::SuccessfulRequests => "SuccessfulRequests",
            Metric::FailedRequests => "FailedRequests",
            Metric::EmptyResponses => "EmptyResponses",
            Metric::ProcessedCompanies => "ProcessedCompanies",
            Metric::FailedToProcessCompany => "FailedToProcessCompany",
            Metric::AddedExpiryToEntry => "AddedExpiryToEntry",
            Metric::ConvertedTTLToExpiryInEntry => "ConvertedTTLToExpiryInEntry",
            Metric::CopiedEntry => "CopiedEntry",
        }
    }
}

/// Run-scoped counters. Starts at zero and is never persisted.
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    counts: BTreeMap<Metric, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&mut self, metric: Metric) {
        *self.counts.entry(metric).or_insert(0) += 1;
    }

    pub fn get(&self, metric: Metric) -> u64 {
        self.counts.get(&metric).copied().unwrap_or(0)
    }

    /// Requests that actually went out over the network, whatever their outcome.
    pub fn network_requests(&self) -> u64 {
        self.get(Metric::SuccessfulRequests)
            + self.get(Metric::FailedRequests)
            + self.get(Metric::EmptyResponses)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let body = self
            .counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(metric, count)| format!("{}: {}", metric.name(), count))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "Metrics: {{{}}}", body)
    }
}

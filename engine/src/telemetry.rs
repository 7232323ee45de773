use metrics::{counter, gauge};

use crate::runtime::EngineReport;

pub fn record_cache_hit() {
    counter!("engine.stencil.cache_hits", 1);
}

pub fn record_cache_miss() {
    counter!("engine.stencil.cache_misses", 1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("engine.stencil.cache_entries", entries as f64);
}

pub fn record_apply(points: usize) {
    counter!("engine.apply.points", points as u64);
}

pub fn record_report(report: &EngineReport) {
    counter!("engine.runtime.results", report.results.len() as u64);
    counter!("engine.runtime.failures", report.failures.len() as u64);
}

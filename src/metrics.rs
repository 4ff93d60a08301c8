//! Prometheus text exposition for the aggregate counters, hand-rolled in the
//! same `# HELP` / `# TYPE` style used elsewhere in this lineage rather than
//! pulling in a metrics client crate.

use crate::store::AggregateCounters;
use std::fmt::Write as _;

/// Worker-pool-level gauges layered on top of the store's counters.
#[derive(Debug, Clone, Default)]
pub struct PoolGauges {
    pub queue_size: usize,
    pub worker_count: usize,
    pub workers_alive: usize,
}

pub fn export_prometheus(counters: &AggregateCounters, pool: &PoolGauges) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# HELP sandkit_total_processed Total jobs that reached a terminal state.");
    let _ = writeln!(out, "# TYPE sandkit_total_processed counter");
    let _ = writeln!(out, "sandkit_total_processed {}", counters.total_processed);

    let _ = writeln!(out, "# HELP sandkit_total_failed Total jobs that terminated as failed.");
    let _ = writeln!(out, "# TYPE sandkit_total_failed counter");
    let _ = writeln!(out, "sandkit_total_failed {}", counters.total_failed);

    let _ = writeln!(out, "# HELP sandkit_total_duration_ms Summed execution duration across all terminal jobs.");
    let _ = writeln!(out, "# TYPE sandkit_total_duration_ms counter");
    let _ = writeln!(out, "sandkit_total_duration_ms {}", counters.total_duration_ms);

    let _ = writeln!(out, "# HELP sandkit_queue_size Jobs currently pending.");
    let _ = writeln!(out, "# TYPE sandkit_queue_size gauge");
    let _ = writeln!(out, "sandkit_queue_size {}", pool.queue_size);

    let _ = writeln!(out, "# HELP sandkit_worker_count Workers the pool was asked to maintain.");
    let _ = writeln!(out, "# TYPE sandkit_worker_count gauge");
    let _ = writeln!(out, "sandkit_worker_count {}", pool.worker_count);

    let _ = writeln!(out, "# HELP sandkit_workers_alive Workers currently alive.");
    let _ = writeln!(out, "# TYPE sandkit_workers_alive gauge");
    let _ = writeln!(out, "sandkit_workers_alive {}", pool.workers_alive);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_contains_all_counters() {
        let counters = AggregateCounters {
            total_processed: 3,
            total_failed: 1,
            total_duration_ms: 900,
        };
        let text = export_prometheus(&counters, &PoolGauges::default());
        assert!(text.contains("sandkit_total_processed 3"));
        assert!(text.contains("sandkit_total_failed 1"));
        assert!(text.contains("sandkit_total_duration_ms 900"));
    }
}

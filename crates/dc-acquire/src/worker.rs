// worker.rs — bounded worker pool (spec §4.2.5): `max(1, --workers)`
// OS threads pull from one shared work queue; each worker owns its own
// `TargetLimitEnforcer`, only the run-level byte budget is shared; a
// worker checks `run_budget.exhausted()` before taking its next item so
// a budget breach drains the queue instead of tearing threads down.
// Results are collected out of completion order and re-sorted by the
// original queue index before the caller sees them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use dc_classifier::QueueRow;
use tracing::warn;

use crate::model::{AcquireContext, TargetAcquireResult};
use crate::registry::StrategyRegistry;

struct WorkItem {
    index: usize,
    row: QueueRow,
}

/// Run every row in `rows` through `registry`, using up to `workers`
/// concurrent OS threads. Returns one result per row, ordered to match
/// `rows` regardless of completion order.
pub fn run_pool(
    rows: Vec<QueueRow>,
    workers: usize,
    ctx: Arc<AcquireContext>,
    registry: Arc<StrategyRegistry>,
    run_one: impl Fn(&QueueRow, &AcquireContext, &StrategyRegistry) -> TargetAcquireResult + Send + Sync + 'static,
) -> Vec<TargetAcquireResult> {
    let workers = workers.max(1);
    let total = rows.len();
    let queue: Arc<Mutex<VecDeque<WorkItem>>> = Arc::new(Mutex::new(
        rows.into_iter().enumerate().map(|(index, row)| WorkItem { index, row }).collect(),
    ));
    let results: Arc<Mutex<Vec<Option<TargetAcquireResult>>>> = Arc::new(Mutex::new((0..total).map(|_| None).collect()));
    let run_one = Arc::new(run_one);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let results = Arc::clone(&results);
        let ctx = Arc::clone(&ctx);
        let registry = Arc::clone(&registry);
        let run_one = Arc::clone(&run_one);

        handles.push(std::thread::spawn(move || loop {
            if ctx.run_budget.exhausted() {
                break;
            }
            let item = {
                let mut q = queue.lock().expect("work queue mutex poisoned");
                q.pop_front()
            };
            let Some(item) = item else { break };

            let result = (*run_one)(&item.row, &ctx, &registry);
            results.lock().expect("results mutex poisoned")[item.index] = Some(result);
        }));
    }

    for handle in handles {
        if let Err(e) = handle.join() {
            warn!(error = ?e, "acquire worker thread panicked");
        }
    }

    Arc::try_unwrap(results)
        .expect("all worker threads have joined")
        .into_inner()
        .expect("results mutex poisoned")
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.unwrap_or_else(|| TargetAcquireResult {
                target_id: format!("<unprocessed index {index}>"),
                status: crate::model::HandlerStatus::Noop,
                strategy: String::new(),
                output_dir: String::new(),
                files: Vec::new(),
                reason: Some("run byte budget exhausted before this target was scheduled".to_string()),
                started_at_utc: chrono::Utc::now(),
                finished_at_utc: chrono::Utc::now(),
                bytes_total: 0,
            })
        })
        .collect()
}

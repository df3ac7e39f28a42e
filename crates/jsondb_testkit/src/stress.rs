//! Stress tests for JsonDB.
//!
//! These helpers hammer a store from many threads and report how many
//! operations went through.

use crate::fixtures::item;
use jsondb_core::JsonStore;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of concurrent threads.
    pub threads: usize,
    /// Operations per thread.
    pub ops_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            threads: 8,
            ops_per_thread: 10,
        }
    }
}

/// The item thread `thread` saves as its `op`-th operation.
#[must_use]
pub fn stress_item(thread: usize, op: usize) -> Value {
    json!({ "id": format!("t{thread}_op{op}"), "thread": thread, "op": op })
}

/// Runs concurrent `save_item` calls with distinct ids against one
/// collection. Every thread saves [`stress_item`]`(thread, op)` for each op.
pub fn stress_concurrent_saves(
    store: Arc<JsonStore>,
    filename: &str,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let filename = filename.to_string();
            let ops = config.ops_per_thread;

            thread::spawn(move || {
                let collection = store.collection(filename);
                for op in 0..ops {
                    match collection.save_item(item(stress_item(t, op))) {
                        Ok(_) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Runs concurrent readers while one writer keeps rewriting the collection.
///
/// A read counts as failed if it errors or sees anything other than a
/// whole, well-formed list. Writes are counted the same way.
pub fn stress_read_during_writes(
    store: Arc<JsonStore>,
    filename: &str,
    config: &StressConfig,
) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let writer = {
        let store = Arc::clone(&store);
        let successful = Arc::clone(&successful);
        let failed = Arc::clone(&failed);
        let filename = filename.to_string();
        let ops = config.ops_per_thread;
        thread::spawn(move || {
            let collection = store.collection(filename);
            for op in 0..ops {
                let items: Vec<Value> = (0..=op).map(|i| stress_item(0, i)).collect();
                match collection.write_items(&items) {
                    Ok(()) => {
                        successful.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(_) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
    };

    let readers: Vec<_> = (0..config.threads)
        .map(|_| {
            let store = Arc::clone(&store);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let filename = filename.to_string();
            let ops = config.ops_per_thread;

            thread::spawn(move || {
                for _ in 0..ops {
                    match store.read_json_file(&filename) {
                        Ok(None) | Ok(Some(Value::Array(_))) => {
                            successful.fetch_add(1, Ordering::Relaxed);
                        }
                        _ => {
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
        })
        .collect();

    writer.join().expect("Thread panicked");
    for handle in readers {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

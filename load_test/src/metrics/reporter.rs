//! Console reporter for metrics with real-time updates

use super::collector::MetricsCollector;
use super::summary::RunSummary;
use std::io::{self, Write};
use tokio::time::{interval, Duration};

/// Start periodic metrics reporting (every N seconds)
pub async fn start_periodic_reporter(collector: MetricsCollector, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    // The first tick completes immediately; skip the empty report
    ticker.tick().await;

    loop {
        ticker.tick().await;

        // Update system metrics before printing
        collector.update_system_metrics();

        print_live_metrics(&collector);
    }
}

/// Print live metrics (clears screen and updates in place)
pub fn print_live_metrics(collector: &MetricsCollector) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");

    let metrics = collector.get_snapshot();
    let elapsed = collector.elapsed_seconds();
    let latency = collector.get_latency_percentiles();

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║               Rate Probe - Live Metrics                        ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    println!("\n⏱️  Elapsed Time: {:02}:{:02}:{:02}",
        elapsed / 3600, (elapsed % 3600) / 60, elapsed % 60);

    println!("\n┌─ ITERATIONS ────────────────────────────────────────────────┐");
    println!("│  Started:      {:>8}    In-Flight:  {:>8}              │",
        metrics.iterations.started, metrics.iterations.in_flight);
    println!("│  Completed:    {:>8}    Dropped:    {:>8}              │",
        metrics.iterations.completed, metrics.iterations.dropped);
    if elapsed > 0 {
        let throughput = metrics.iterations.completed as f64 / elapsed as f64;
        println!("│  Throughput: {:>9.2}/sec                                  │", throughput);
    }
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n┌─ CHECKS (status is 200 or 429) ─────────────────────────────┐");
    println!("│  Passed:       {:>8}    Failed:     {:>8}              │",
        metrics.checks.passed, metrics.checks.failed);
    if let Some(rate) = metrics.checks.pass_rate() {
        println!("│  Pass Rate:    {:>7.2}%                                     │", rate * 100.0);
    }
    println!("└─────────────────────────────────────────────────────────────┘");

    if latency.count > 0 {
        println!("\n┌─ REQUEST LATENCY (ms) ──────────────────────────────────────┐");
        println!("│  Min: {:>7.1}  P50: {:>7.1}  P95: {:>7.1}  P99: {:>7.1}      │",
            latency.min, latency.p50, latency.p95, latency.p99);
        println!("│  Max: {:>7.1}  Mean: {:>7.2}  Count: {:>10}            │",
            latency.max, latency.mean, latency.count);
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    println!("\n┌─ SYSTEM ────────────────────────────────────────────────────┐");
    println!("│  CPU Usage:    {:>6.1}%    Memory: {:>6} / {:>6} MB       │",
        metrics.system.cpu_usage, metrics.system.memory_used_mb, metrics.system.memory_total_mb);
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n  [Press Ctrl+C to stop test]");

    let _ = io::stdout().flush();
}

/// Print final summary report
pub fn print_final_report(summary: &RunSummary) {
    let metrics = &summary.metrics;
    let latency = &summary.latency_ms;

    println!("\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                    FINAL TEST REPORT                           ║");
    println!("╚════════════════════════════════════════════════════════════════╝");

    println!("\n🎯 SCENARIO {}", summary.plan.name);
    println!("   Target:               {}", summary.target_url);
    println!("   Executor:             {}", summary.plan.executor);
    println!("   Rate:                 {:>10} / {}", summary.plan.rate,
        humantime::format_duration(summary.plan.time_unit));
    println!("   VUs:                  {:>10} initialized (max {})",
        summary.vus_initialized, summary.plan.max_vus);
    if summary.stopped_early {
        println!("   Stopped early after {} of {} scheduled iterations",
            summary.scheduled_iterations, summary.plan.planned_iterations());
    }

    println!("\n📊 ITERATIONS");
    println!("   Total Started:        {:>10}", metrics.iterations.started);
    println!("   Total Completed:      {:>10}", metrics.iterations.completed);
    println!("   Dropped:              {:>10}", metrics.iterations.dropped);
    println!("   Interrupted:          {:>10}", metrics.iterations.interrupted);
    println!("   Throughput:           {:>10.2} iterations/sec", summary.throughput);

    println!("\n🌐 RESPONSES");
    for (status, count) in &metrics.requests.by_status {
        println!("   HTTP {}:             {:>10}", status, count);
    }
    if metrics.requests.transport_errors > 0 {
        println!("   Transport errors:     {:>10}", metrics.requests.transport_errors);
    }

    println!("\n✅ CHECKS");
    println!("   status is expected:   {:>10} passed, {} failed",
        metrics.checks.passed, metrics.checks.failed);
    if let Some(rate) = summary.check_pass_rate {
        println!("   Pass Rate:            {:>10.2}%", rate * 100.0);
    }

    if latency.count > 0 {
        println!("\n📈 REQUEST LATENCY");
        println!("   Min:                  {:>10.2} ms", latency.min);
        println!("   P50 (Median):         {:>10.2} ms", latency.p50);
        println!("   P90:                  {:>10.2} ms", latency.p90);
        println!("   P95:                  {:>10.2} ms", latency.p95);
        println!("   P99:                  {:>10.2} ms", latency.p99);
        println!("   Max:                  {:>10.2} ms", latency.max);
        println!("   Mean:                 {:>10.2} ms", latency.mean);
    }

    println!("\n🚦 THRESHOLDS");
    for result in &summary.thresholds {
        let mark = if result.passed { "✓" } else { "✗" };
        match result.observed {
            Some(observed) => println!("   {} {} {}   (observed {:.2} ms)",
                mark, result.metric, result.expression, observed),
            None => println!("   {} {} {}   (no samples)", mark, result.metric, result.expression),
        }
    }

    println!("\n⏱️  Test Duration: {:.2} seconds", summary.elapsed_secs);
    println!("════════════════════════════════════════════════════════════════\n");
}

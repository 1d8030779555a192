use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

// ---------------------------------------------------------------------------
// Metrics catalog
// ---------------------------------------------------------------------------

/// Register all metric descriptors at startup.
///
/// This must be called once before any metrics are recorded.
/// Descriptors provide human-readable descriptions for Prometheus.
pub fn describe_all_metrics() {
    // -- Delivery --
    describe_counter!(
        "vodstream_delivery_requests_total",
        "Stream requests by status class and response kind"
    );
    describe_histogram!(
        "vodstream_delivery_request_duration_seconds",
        "Time to decide and start a stream response"
    );
    describe_counter!(
        "vodstream_delivery_bytes_planned_total",
        "Body bytes committed to stream responses"
    );
    describe_counter!(
        "vodstream_range_unsatisfiable_total",
        "Range requests rejected with 416"
    );

    // -- Access --
    describe_counter!(
        "vodstream_entitlement_decisions_total",
        "Entitlement decisions by outcome"
    );
    describe_counter!(
        "vodstream_ppv_purchases_total",
        "Pay-per-view purchase attempts by result"
    );
    describe_counter!(
        "vodstream_ads_served_total",
        "Ad selections by placement and result"
    );

    // -- Views --
    describe_counter!(
        "vodstream_views_recorded_total",
        "View increments applied to the catalog"
    );
    describe_counter!(
        "vodstream_views_dropped_total",
        "View increments dropped because the channel was full or closed"
    );

    // -- Storage --
    describe_counter!(
        "vodstream_storage_errors_total",
        "Content store errors by operation"
    );
    describe_counter!(
        "vodstream_storage_orphans_total",
        "Backing files left behind after a failed delete"
    );

    // -- Catalog --
    describe_gauge!("vodstream_catalog_videos", "Videos in the catalog");

    // -- System --
    describe_gauge!("vodstream_uptime_seconds", "Process uptime");
    describe_counter!(
        "vodstream_panic_total",
        "Total panics caught (should always be 0)"
    );
    describe_counter!("vodstream_config_reload_total", "Config reload attempts");
    describe_gauge!(
        "vodstream_shutdown_in_progress",
        "1 if graceful shutdown is in progress, 0 otherwise"
    );
}

// ---------------------------------------------------------------------------
// Metric recording helpers
// ---------------------------------------------------------------------------

// -- Delivery --

pub fn inc_delivery_request(status: &str, kind: &str) {
    counter!("vodstream_delivery_requests_total", "status" => status.to_string(), "kind" => kind.to_string()).increment(1);
}

pub fn record_delivery_request_duration(kind: &str, seconds: f64) {
    histogram!("vodstream_delivery_request_duration_seconds", "kind" => kind.to_string())
        .record(seconds);
}

pub fn add_delivery_bytes_planned(bytes: u64) {
    counter!("vodstream_delivery_bytes_planned_total").increment(bytes);
}

pub fn inc_range_unsatisfiable() {
    counter!("vodstream_range_unsatisfiable_total").increment(1);
}

// -- Access --

pub fn inc_entitlement_decision(outcome: &str) {
    counter!("vodstream_entitlement_decisions_total", "outcome" => outcome.to_string())
        .increment(1);
}

pub fn inc_ppv_purchase(result: &str) {
    counter!("vodstream_ppv_purchases_total", "result" => result.to_string()).increment(1);
}

pub fn inc_ad_served(placement: &str, result: &str) {
    counter!("vodstream_ads_served_total", "placement" => placement.to_string(), "result" => result.to_string()).increment(1);
}

// -- Views --

pub fn inc_views_recorded() {
    counter!("vodstream_views_recorded_total").increment(1);
}

pub fn inc_views_dropped(reason: &str) {
    counter!("vodstream_views_dropped_total", "reason" => reason.to_string()).increment(1);
}

// -- Storage --

pub fn inc_storage_error(operation: &str) {
    counter!("vodstream_storage_errors_total", "operation" => operation.to_string()).increment(1);
}

pub fn inc_storage_orphan() {
    counter!("vodstream_storage_orphans_total").increment(1);
}

// -- Catalog --

pub fn set_catalog_videos(count: f64) {
    gauge!("vodstream_catalog_videos").set(count);
}

// -- System --

pub fn set_uptime_seconds(seconds: f64) {
    gauge!("vodstream_uptime_seconds").set(seconds);
}

pub fn inc_panic_total() {
    counter!("vodstream_panic_total").increment(1);
}

pub fn inc_config_reload(result: &str) {
    counter!("vodstream_config_reload_total", "result" => result.to_string()).increment(1);
}

pub fn set_shutdown_in_progress(in_progress: bool) {
    gauge!("vodstream_shutdown_in_progress").set(if in_progress { 1.0 } else { 0.0 });
}

// ---------------------------------------------------------------------------
// Uptime tracking task
// ---------------------------------------------------------------------------

/// Update the uptime gauge every second until cancelled.
pub async fn run_uptime_task(start_time: Instant, cancel: tokio_util::sync::CancellationToken) {
    let interval = std::time::Duration::from_secs(1);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {
                set_uptime_seconds(start_time.elapsed().as_secs_f64());
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Prometheus recorder installation
// ---------------------------------------------------------------------------

/// Install the global Prometheus recorder.
///
/// Returns a handle that renders the text exposition format for `/metrics`.
pub fn install_prometheus_recorder(
) -> Result<metrics_exporter_prometheus::PrometheusHandle, metrics_exporter_prometheus::BuildError>
{
    metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()
}

/// A handle that is not installed globally; recorded metrics go nowhere.
///
/// Router tests use this so they don't fight over the global recorder.
pub fn detached_prometheus_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_recorder_are_noops() {
        describe_all_metrics();
        inc_delivery_request("2xx", "partial");
        inc_views_dropped("full");
        set_shutdown_in_progress(false);
    }

    #[test]
    fn test_detached_handle_renders() {
        let handle = detached_prometheus_handle();
        let _ = handle.render();
    }
}

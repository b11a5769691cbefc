// Metrics module - Prometheus-compatible metrics tracking
// Counters for the HTTP surface and the two delivery paths, exported as text

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Request durations kept for percentile estimates
const MAX_DURATION_SAMPLES: usize = 10_000;

/// Histogram represents percentile statistics for latency measurements
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Histogram {
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

/// How an image request was served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryPath {
    Stream,
    Transform,
}

impl DeliveryPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryPath::Stream => "stream",
            DeliveryPath::Transform => "transform",
        }
    }
}

/// Metrics struct tracks counters for Prometheus export
/// Thread-safe via atomic operations and mutexes
pub struct Metrics {
    request_count: AtomicU64,

    // Status code counters (e.g., 200, 404, 500)
    status_counts: Mutex<HashMap<u16, u64>>,

    // Route counters (ping, missions, mission, image, metrics, unmatched)
    route_counts: Mutex<HashMap<&'static str, u64>>,

    // Request durations in microseconds (bounded window)
    durations: Mutex<VecDeque<u64>>,

    // Image delivery
    stream_deliveries: AtomicU64,
    partial_deliveries: AtomicU64,
    transform_deliveries: AtomicU64,
    transform_failures: AtomicU64,
    bytes_streamed: AtomicU64,
    bytes_transformed: AtomicU64,
    streams_interrupted: AtomicU64,

    // Collaborator failures by store ("blob", "kv")
    store_errors: Mutex<HashMap<&'static str, u64>>,

    // Cursor decode failures
    invalid_tokens: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Metrics {
            request_count: AtomicU64::new(0),
            status_counts: Mutex::new(HashMap::new()),
            route_counts: Mutex::new(HashMap::new()),
            durations: Mutex::new(VecDeque::new()),
            stream_deliveries: AtomicU64::new(0),
            partial_deliveries: AtomicU64::new(0),
            transform_deliveries: AtomicU64::new(0),
            transform_failures: AtomicU64::new(0),
            bytes_streamed: AtomicU64::new(0),
            bytes_transformed: AtomicU64::new(0),
            streams_interrupted: AtomicU64::new(0),
            store_errors: Mutex::new(HashMap::new()),
            invalid_tokens: AtomicU64::new(0),
        }
    }

    pub fn increment_request_count(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_status_count(&self, status_code: u16) {
        if let Ok(mut counts) = self.status_counts.lock() {
            *counts.entry(status_code).or_insert(0) += 1;
        }
    }

    pub fn increment_route_count(&self, route: &'static str) {
        if let Ok(mut counts) = self.route_counts.lock() {
            *counts.entry(route).or_insert(0) += 1;
        }
    }

    /// Record a request duration in milliseconds
    pub fn record_duration(&self, duration_ms: f64) {
        let duration_us = (duration_ms * 1000.0) as u64;
        if let Ok(mut durations) = self.durations.lock() {
            if durations.len() == MAX_DURATION_SAMPLES {
                durations.pop_front();
            }
            durations.push_back(duration_us);
        }
    }

    /// Record a successful image delivery
    pub fn record_delivery(&self, path: DeliveryPath, partial: bool) {
        match path {
            DeliveryPath::Stream => {
                self.stream_deliveries.fetch_add(1, Ordering::Relaxed);
                if partial {
                    self.partial_deliveries.fetch_add(1, Ordering::Relaxed);
                }
            }
            DeliveryPath::Transform => {
                self.transform_deliveries.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn increment_transform_failures(&self) {
        self.transform_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_streamed(&self, bytes: u64) {
        self.bytes_streamed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_transformed(&self, bytes: u64) {
        self.bytes_transformed.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_streams_interrupted(&self) {
        self.streams_interrupted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_store_error(&self, store: &'static str) {
        if let Ok(mut counts) = self.store_errors.lock() {
            *counts.entry(store).or_insert(0) += 1;
        }
    }

    pub fn increment_invalid_tokens(&self) {
        self.invalid_tokens.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn get_status_count(&self, status_code: u16) -> u64 {
        self.status_counts
            .lock()
            .ok()
            .and_then(|counts| counts.get(&status_code).copied())
            .unwrap_or(0)
    }

    pub fn get_delivery_count(&self, path: DeliveryPath) -> u64 {
        match path {
            DeliveryPath::Stream => self.stream_deliveries.load(Ordering::Relaxed),
            DeliveryPath::Transform => self.transform_deliveries.load(Ordering::Relaxed),
        }
    }

    pub fn get_streams_interrupted(&self) -> u64 {
        self.streams_interrupted.load(Ordering::Relaxed)
    }

    /// Request duration percentiles in milliseconds
    pub fn get_duration_percentiles(&self) -> Histogram {
        let mut samples: Vec<u64> = self
            .durations
            .lock()
            .map(|d| d.iter().copied().collect())
            .unwrap_or_default();
        calculate_histogram(&mut samples)
    }

    /// Export all metrics in Prometheus text exposition format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP http_requests_total Total number of HTTP requests received\n");
        output.push_str("# TYPE http_requests_total counter\n");
        output.push_str(&format!(
            "http_requests_total {}\n",
            self.request_count.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP http_requests_by_status_total HTTP requests by status code\n");
        output.push_str("# TYPE http_requests_by_status_total counter\n");
        if let Ok(counts) = self.status_counts.lock() {
            let mut entries: Vec<_> = counts.iter().collect();
            entries.sort();
            for (status, count) in entries {
                output.push_str(&format!(
                    "http_requests_by_status_total{{status=\"{}\"}} {}\n",
                    status, count
                ));
            }
        }

        output.push_str("\n# HELP http_requests_by_route_total HTTP requests by route\n");
        output.push_str("# TYPE http_requests_by_route_total counter\n");
        if let Ok(counts) = self.route_counts.lock() {
            let mut entries: Vec<_> = counts.iter().collect();
            entries.sort();
            for (route, count) in entries {
                output.push_str(&format!(
                    "http_requests_by_route_total{{route=\"{}\"}} {}\n",
                    route, count
                ));
            }
        }

        let histogram = self.get_duration_percentiles();
        output.push_str("\n# HELP http_request_duration_ms Request duration percentiles\n");
        output.push_str("# TYPE http_request_duration_ms summary\n");
        for (quantile, value) in [
            ("0.5", histogram.p50),
            ("0.9", histogram.p90),
            ("0.95", histogram.p95),
            ("0.99", histogram.p99),
        ] {
            output.push_str(&format!(
                "http_request_duration_ms{{quantile=\"{}\"}} {:.3}\n",
                quantile, value
            ));
        }

        output.push_str("\n# HELP image_deliveries_total Image responses by delivery path\n");
        output.push_str("# TYPE image_deliveries_total counter\n");
        for path in [DeliveryPath::Stream, DeliveryPath::Transform] {
            output.push_str(&format!(
                "image_deliveries_total{{path=\"{}\"}} {}\n",
                path.as_str(),
                self.get_delivery_count(path)
            ));
        }

        output.push_str("\n# HELP image_partial_deliveries_total Byte-range (206) image responses\n");
        output.push_str("# TYPE image_partial_deliveries_total counter\n");
        output.push_str(&format!(
            "image_partial_deliveries_total {}\n",
            self.partial_deliveries.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP image_transform_failures_total Images that failed to decode or encode\n");
        output.push_str("# TYPE image_transform_failures_total counter\n");
        output.push_str(&format!(
            "image_transform_failures_total {}\n",
            self.transform_failures.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP image_bytes_sent_total Image body bytes sent by delivery path\n");
        output.push_str("# TYPE image_bytes_sent_total counter\n");
        output.push_str(&format!(
            "image_bytes_sent_total{{path=\"stream\"}} {}\n",
            self.bytes_streamed.load(Ordering::Relaxed)
        ));
        output.push_str(&format!(
            "image_bytes_sent_total{{path=\"transform\"}} {}\n",
            self.bytes_transformed.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP image_streams_interrupted_total Streamed bodies cut short after headers\n");
        output.push_str("# TYPE image_streams_interrupted_total counter\n");
        output.push_str(&format!(
            "image_streams_interrupted_total {}\n",
            self.streams_interrupted.load(Ordering::Relaxed)
        ));

        output.push_str("\n# HELP store_errors_total Collaborator call failures by store\n");
        output.push_str("# TYPE store_errors_total counter\n");
        if let Ok(counts) = self.store_errors.lock() {
            let mut entries: Vec<_> = counts.iter().collect();
            entries.sort();
            for (store, count) in entries {
                output.push_str(&format!(
                    "store_errors_total{{store=\"{}\"}} {}\n",
                    store, count
                ));
            }
        }

        output.push_str("\n# HELP pagination_invalid_tokens_total Rejected pagination tokens\n");
        output.push_str("# TYPE pagination_invalid_tokens_total counter\n");
        output.push_str(&format!(
            "pagination_invalid_tokens_total {}\n",
            self.invalid_tokens.load(Ordering::Relaxed)
        ));

        output
    }
}

fn calculate_histogram(samples: &mut [u64]) -> Histogram {
    if samples.is_empty() {
        return Histogram {
            p50: 0.0,
            p90: 0.0,
            p95: 0.0,
            p99: 0.0,
        };
    }
    samples.sort_unstable();
    let percentile = |p: f64| -> f64 {
        let idx = ((samples.len() as f64 - 1.0) * p).round() as usize;
        samples[idx.min(samples.len() - 1)] as f64 / 1000.0
    };
    Histogram {
        p50: percentile(0.50),
        p90: percentile(0.90),
        p95: percentile(0.95),
        p99: percentile(0.99),
    }
}

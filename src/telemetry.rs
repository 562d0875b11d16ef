use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use prometheus::Registry;

pub struct Metrics {
    uploads_total: Counter<u64>,
    detection_duration: Histogram<u64>,
    vehicles_detected: Counter<u64>,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        // TODO: deprecated crate to be replaced with an OLTP exporter
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
            .unwrap();

        let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
            .with_reader(exporter)
            .build();

        let meter = provider.meter("vehicle_detection");
        global::set_meter_provider(provider);

        let uploads_total = meter
            .u64_counter("uploads_total")
            .with_description("Total number of upload attempts by outcome")
            .build();

        let detection_duration = meter
            .u64_histogram("detection_duration_ms")
            .with_boundaries(vec![50., 100., 250., 500., 1000., 2500., 5000.])
            .with_description("Duration of detector calls in milliseconds")
            .build();

        let vehicles_detected = meter
            .u64_counter("vehicles_detected_total")
            .with_description("Total number of vehicles detected across uploads")
            .build();

        Metrics {
            uploads_total,
            detection_duration,
            vehicles_detected,
            registry,
        }
    }

    pub fn record_upload(&self, outcome: &str) {
        let attributes = vec![KeyValue::new("outcome", outcome.to_string())];
        self.uploads_total.add(1, &attributes);
    }

    pub fn record_detection_duration(&self, duration_ms: u64) {
        self.detection_duration.record(duration_ms, &[]);
    }

    pub fn record_vehicles_detected(&self, count: u64) {
        self.vehicles_detected.add(count, &[]);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

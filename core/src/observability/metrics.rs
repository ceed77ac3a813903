use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use metrics::{Unit, counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::types::RiskLevel;

pub const TURNS_METRIC: &str = "sentinel_turns_total";
pub const CRITICAL_SHORT_CIRCUITS_METRIC: &str = "sentinel_critical_short_circuits_total";
pub const FABRICATIONS_BLOCKED_METRIC: &str = "sentinel_fabrications_blocked_total";
pub const MODEL_FALLBACKS_METRIC: &str = "sentinel_model_fallbacks_total";
pub const REGISTRY_GENERATION_METRIC: &str = "sentinel_registry_generation";

const DEFAULT_METRICS_PORT: u16 = 9464;

#[derive(Debug, Clone, Copy)]
pub struct MetricsRuntime {
    pub listen_addr: SocketAddr,
}

impl MetricsRuntime {
    pub fn default_listen_addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_METRICS_PORT)
    }
}

pub fn start_prometheus_exporter(listen_addr: SocketAddr) -> Result<MetricsRuntime, BuildError> {
    describe_counter!(TURNS_METRIC, Unit::Count, "Turns processed, by risk level.");
    describe_counter!(
        CRITICAL_SHORT_CIRCUITS_METRIC,
        Unit::Count,
        "Turns answered from the rule tier without a model call."
    );
    describe_counter!(
        FABRICATIONS_BLOCKED_METRIC,
        Unit::Count,
        "Model-output literals suppressed by the post-scan."
    );
    describe_counter!(
        MODEL_FALLBACKS_METRIC,
        Unit::Count,
        "Model failures recovered by the rule-tier fallback."
    );
    describe_gauge!(
        REGISTRY_GENERATION_METRIC,
        Unit::Count,
        "Current registry snapshot generation."
    );

    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()?;

    Ok(MetricsRuntime { listen_addr })
}

pub fn record_turn(risk: RiskLevel) {
    counter!(TURNS_METRIC, "risk" => risk.as_str()).increment(1);
}

pub fn record_critical_short_circuit() {
    counter!(CRITICAL_SHORT_CIRCUITS_METRIC).increment(1);
}

pub fn record_fabrications_blocked(count: usize) {
    counter!(FABRICATIONS_BLOCKED_METRIC).increment(count as u64);
}

pub fn record_model_fallback() {
    counter!(MODEL_FALLBACKS_METRIC).increment(1);
}

pub fn record_registry_generation(generation: u64) {
    gauge!(REGISTRY_GENERATION_METRIC).set(generation as f64);
}

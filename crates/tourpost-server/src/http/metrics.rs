use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

// ── Label types ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReasonLabel {
    pub reason: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct GenerationLabel {
    pub kind: String,
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ServiceLabel {
    pub service: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ReloadLabel {
    pub outcome: String,
}

// ── Metrics registry ───────────────────────────────────────────────────────────

pub struct TourpostMetrics {
    pub registry: Registry,

    pub resolutions: Family<ReasonLabel, Counter>,
    pub generations: Family<GenerationLabel, Counter>,
    pub upstream_failures: Family<ServiceLabel, Counter>,
    pub agenda_reloads: Family<ReloadLabel, Counter>,

    // Set on each scrape
    pub agenda_sessions: Gauge,
    pub uptime_seconds: Gauge,
}

impl TourpostMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let resolutions: Family<ReasonLabel, Counter> = Family::default();
        registry.register(
            "tourpost_resolutions",
            "Session resolutions by match reason",
            resolutions.clone(),
        );

        let generations: Family<GenerationLabel, Counter> = Family::default();
        registry.register(
            "tourpost_generations",
            "Generation requests by kind and outcome",
            generations.clone(),
        );

        let upstream_failures: Family<ServiceLabel, Counter> = Family::default();
        registry.register(
            "tourpost_upstream_failures",
            "Failed calls to hosted services",
            upstream_failures.clone(),
        );

        let agenda_reloads: Family<ReloadLabel, Counter> = Family::default();
        registry.register(
            "tourpost_agenda_reloads",
            "Agenda hot reloads by outcome",
            agenda_reloads.clone(),
        );

        let agenda_sessions: Gauge = Gauge::default();
        registry.register(
            "tourpost_agenda_sessions",
            "Sessions in the agenda in service",
            agenda_sessions.clone(),
        );

        let uptime_seconds: Gauge = Gauge::default();
        registry.register("tourpost_uptime_seconds", "Server uptime in seconds", uptime_seconds.clone());

        Self {
            registry,
            resolutions,
            generations,
            upstream_failures,
            agenda_reloads,
            agenda_sessions,
            uptime_seconds,
        }
    }

    pub fn record_resolution(&self, reason: &str) {
        self.resolutions
            .get_or_create(&ReasonLabel { reason: reason.to_string() })
            .inc();
    }

    pub fn record_generation(&self, kind: &str, ok: bool) {
        let outcome = if ok { "success" } else { "error" };
        self.generations
            .get_or_create(&GenerationLabel {
                kind: kind.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    pub fn record_upstream_failure(&self, service: &str) {
        self.upstream_failures
            .get_or_create(&ServiceLabel { service: service.to_string() })
            .inc();
    }

    pub fn record_reload(&self, ok: bool) {
        let outcome = if ok { "success" } else { "rejected" };
        self.agenda_reloads
            .get_or_create(&ReloadLabel { outcome: outcome.to_string() })
            .inc();
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        encode(&mut out, &self.registry)?;
        Ok(out)
    }
}

impl Default for TourpostMetrics {
    fn default() -> Self {
        Self::new()
    }
}

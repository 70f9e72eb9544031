use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::error::OidcError;

pub const OUTCOME_ACCEPTED: &str = "accepted";

#[derive(Clone)]
pub struct VerifierMetrics {
    registry: Registry,
    validations: IntCounterVec,
}

impl VerifierMetrics {
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new())
    }

    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let validations = IntCounterVec::new(
            Opts::new(
                "oidc_id_token_validations_total",
                "Count of ID token validations grouped by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(validations.clone()))?;

        Ok(Self {
            registry,
            validations,
        })
    }

    pub fn accepted(&self) {
        self.validations.with_label_values(&[OUTCOME_ACCEPTED]).inc();
    }

    pub fn rejected(&self, err: &OidcError) {
        self.validations
            .with_label_values(&[err.kind().as_str()])
            .inc();
    }

    pub fn count(&self, outcome: &str) -> u64 {
        self.validations.with_label_values(&[outcome]).get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn render(&self) -> prometheus::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

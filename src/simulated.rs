use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{GenerationKind, GenerationRequest, ItemPayload};
use crate::ItemGenerator;

/// Stand-in backend producing placeholder items.
///
/// Domains are named `generated-domain-N.com` with a random availability
/// flag; logos and images point at sized placeholder SVGs labelled with
/// their index (and style, if one was requested).
pub struct SimulatedGenerator {
    rng: Mutex<StdRng>,
    availability: f64,
    latency: Duration,
}

impl Default for SimulatedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGenerator {
    /// Generator seeded from the operating system.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic generator for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            availability: 0.5,
            latency: Duration::ZERO,
        }
    }

    /// Probability (0.0..=1.0) that a generated domain is available.
    ///
    /// Out-of-range values are clamped; NaN falls back to 0.5.
    pub fn with_availability(mut self, probability: f64) -> Self {
        self.availability = if probability.is_nan() {
            0.5
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    /// Simulated backend latency, awaited after the payloads are built.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn payloads(&self, request: &GenerationRequest) -> Vec<ItemPayload> {
        let style = request
            .style
            .as_deref()
            .map(|s| format!(" ({})", s))
            .unwrap_or_default();

        match request.kind {
            GenerationKind::Domain => {
                let mut rng = self
                    .rng
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                (1..=request.count)
                    .map(|i| ItemPayload::Domain {
                        name: format!("generated-domain-{}.com", i),
                        available: rng.random_bool(self.availability),
                    })
                    .collect()
            }
            GenerationKind::Logo => (1..=request.count)
                .map(|i| ItemPayload::Logo {
                    reference: format!(
                        "/placeholder.svg?height=200&width=200&text=Generated Logo {}{}",
                        i, style
                    ),
                })
                .collect(),
            GenerationKind::Image => (1..=request.count)
                .map(|i| ItemPayload::Image {
                    reference: format!(
                        "/placeholder.svg?height=300&width=300&text=Generated Image {}{}",
                        i, style
                    ),
                })
                .collect(),
        }
    }
}

impl ItemGenerator for SimulatedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Vec<ItemPayload>> {
        let payloads = self.payloads(request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(payloads)
    }
}

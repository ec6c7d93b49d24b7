use serde::{Deserialize, Serialize};

/// Heritable trait vector of an agent.
///
/// Every trait lives in `[0, 1]` except `base_lifespan`, which is measured in
/// ticks and bounded by [`Genome::LIFESPAN_MIN`]..=[`Genome::LIFESPAN_MAX`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Locomotion speed factor.
    pub speed: f32,
    /// Body size factor.
    pub size: f32,
    /// Tendency to compete instead of share.
    pub aggressiveness: f32,
    /// Tendency to bond with peers.
    pub sociability: f32,
    /// Exploration drive; also widens the perception radius.
    pub curiosity: f32,
    /// Conception probability contribution.
    pub fertility: f32,
    /// Resistance to infection and disease mortality.
    pub immunity: f32,
    /// Metabolic rate; high values burn energy faster.
    pub metabolism: f32,
    /// Cosmetic hue, carried for renderers.
    pub color: f32,
    /// Per-trait mutation probability driver.
    pub mutation_rate: f32,
    /// Tissue repair; speeds disease recovery.
    pub regeneration: f32,
    /// Nominal lifespan in ticks.
    pub base_lifespan: u64,
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            speed: 0.5,
            size: 0.5,
            aggressiveness: 0.5,
            sociability: 0.5,
            curiosity: 0.5,
            fertility: 0.5,
            immunity: 0.5,
            metabolism: 0.5,
            color: 0.5,
            mutation_rate: 0.1,
            regeneration: 0.5,
            base_lifespan: 2000,
        }
    }
}

impl Genome {
    pub const LIFESPAN_MIN: u64 = 500;
    pub const LIFESPAN_MAX: u64 = 5000;
    pub const TRAIT_COUNT: usize = 11;

    /// Mutable views over the unit-interval traits, in declaration order.
    pub fn unit_traits_mut(&mut self) -> [&mut f32; Self::TRAIT_COUNT] {
        [
            &mut self.speed,
            &mut self.size,
            &mut self.aggressiveness,
            &mut self.sociability,
            &mut self.curiosity,
            &mut self.fertility,
            &mut self.immunity,
            &mut self.metabolism,
            &mut self.color,
            &mut self.mutation_rate,
            &mut self.regeneration,
        ]
    }

    pub fn unit_traits(&self) -> [f32; Self::TRAIT_COUNT] {
        [
            self.speed,
            self.size,
            self.aggressiveness,
            self.sociability,
            self.curiosity,
            self.fertility,
            self.immunity,
            self.metabolism,
            self.color,
            self.mutation_rate,
            self.regeneration,
        ]
    }

    /// Forces every trait back into its declared domain. Non-finite traits
    /// reset to the midpoint.
    pub fn clamp_traits(&mut self) {
        for t in self.unit_traits_mut() {
            *t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 };
        }
        self.base_lifespan = self
            .base_lifespan
            .clamp(Self::LIFESPAN_MIN, Self::LIFESPAN_MAX);
    }

    pub fn is_within_bounds(&self) -> bool {
        self.unit_traits()
            .iter()
            .all(|t| t.is_finite() && (0.0..=1.0).contains(t))
            && (Self::LIFESPAN_MIN..=Self::LIFESPAN_MAX).contains(&self.base_lifespan)
    }

    /// Serialize genome to hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(bytes)
    }

    /// Deserialize genome from hex string. The decoded genome is clamped.
    pub fn from_hex(hex_str: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(hex_str)?;
        let mut genome: Self = serde_json::from_slice(&bytes)?;
        genome.clamp_traits();
        Ok(genome)
    }
}

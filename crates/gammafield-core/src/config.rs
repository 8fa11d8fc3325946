//! Run configuration.
//!
//! A `RunConfig` fully determines a run: topology, coupling, spread variant,
//! entities, tick count and seed. Two runs with equal configs produce
//! bit-identical trajectories. Loaded from JSON by the driver; `Default`
//! is the two-body attraction scenario.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::NodeId;
use crate::error::SimError;

/// Graph the field lives on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyConfig {
    /// `side`³ periodic cubic lattice, k = 6
    Lattice { side: u32 },
    /// Lattice with `fraction` of its edges rewired by degree-preserving swaps
    Rewired { side: u32, fraction: f64 },
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig::Lattice { side: 20 }
    }
}

/// Which transport rule the field uses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpreadRuleKind {
    /// `alpha / (1 + G * total)` outflow, uniform routing
    #[default]
    SelfGravitation,
    /// Linear diffusion, outflow `alpha` everywhere
    UniformDiffusion,
    /// Self-gravitating outflow, routing weighted toward denser neighbors
    GradientWeighted { bias: f64 },
}

/// What an entity steers by
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Raw external occupancy at the anchor and its neighbors
    Local,
    /// External occupancy of the whole graph, each node weighted by
    /// `(1 + hops)^-falloff`, read at the anchor and its neighbors
    Potential { falloff: f64 },
}

impl Default for SignalKind {
    fn default() -> Self {
        SignalKind::Potential { falloff: 2.0 }
    }
}

/// What happens when two entities meet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Entities pass through each other; meetings are only counted
    Coexist,
    /// Entities within `radius` hops after a tick take their
    /// mass-weighted mean heading
    Inelastic { radius: u32 },
}

impl Default for CollisionPolicy {
    fn default() -> Self {
        CollisionPolicy::Inelastic { radius: 1 }
    }
}

/// One entity: a delta spike of `quanta` plus its movement parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    /// Quanta in the initial spike; fixed for the whole run.
    pub quanta: u32,
    /// Ticks per committed move.
    pub mass: i64,
    /// Start node by id. Takes precedence over `coords`.
    #[serde(default)]
    pub node: Option<NodeId>,
    /// Start node by lattice coordinates.
    #[serde(default)]
    pub coords: Option<[u32; 3]>,
    /// Initial heading; zero means no momentum.
    #[serde(default)]
    pub direction: [f64; 3],
}

impl EntitySpec {
    pub fn at_coords(quanta: u32, mass: i64, coords: [u32; 3]) -> Self {
        Self {
            quanta,
            mass,
            node: None,
            coords: Some(coords),
            direction: [0.0; 3],
        }
    }

    pub fn at_node(quanta: u32, mass: i64, node: NodeId) -> Self {
        Self {
            quanta,
            mass,
            node: Some(node),
            coords: None,
            direction: [0.0; 3],
        }
    }

    pub fn with_direction(mut self, direction: [f64; 3]) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub name: String,
    pub topology: TopologyConfig,
    /// Baseline per-neighbor hop probability. `None` means `1 / k`.
    pub alpha: Option<f64>,
    /// Self-gravitation coupling.
    #[serde(alias = "G")]
    pub g: f64,
    pub spread_rule: SpreadRuleKind,
    pub signal: SignalKind,
    pub collision: CollisionPolicy,
    pub entities: Vec<EntitySpec>,
    pub ticks: u64,
    pub seed: u64,
    /// Verify conservation after every tick (always verified at run end).
    pub check_every_tick: bool,
    /// Control mode: the field spreads but entities never tick.
    pub freeze_entities: bool,
    /// Emit a diagnostics row every N ticks (0 disables periodic rows).
    pub diagnostics_every: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name: "two-body".to_string(),
            topology: TopologyConfig::default(),
            alpha: None,
            g: 10.0,
            spread_rule: SpreadRuleKind::SelfGravitation,
            signal: SignalKind::default(),
            collision: CollisionPolicy::default(),
            entities: vec![
                EntitySpec::at_coords(1000, 5, [5, 10, 10]),
                EntitySpec::at_coords(1000, 5, [15, 10, 10]),
            ],
            ticks: 50_000,
            seed: 42,
            check_every_tick: cfg!(debug_assertions),
            freeze_entities: false,
            diagnostics_every: 100,
        }
    }
}

impl RunConfig {
    /// Empty lattice run with no entities.
    pub fn lattice(side: u32, g: f64, seed: u64) -> Self {
        Self {
            name: format!("lattice-{}", side),
            topology: TopologyConfig::Lattice { side },
            g,
            seed,
            entities: Vec::new(),
            ..Default::default()
        }
    }

    pub fn with_entity(mut self, spec: EntitySpec) -> Self {
        self.entities.push(spec);
        self
    }

    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_spread_rule(mut self, rule: SpreadRuleKind) -> Self {
        self.spread_rule = rule;
        self
    }

    pub fn with_signal(mut self, signal: SignalKind) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_collision(mut self, collision: CollisionPolicy) -> Self {
        self.collision = collision;
        self
    }

    pub fn frozen(mut self) -> Self {
        self.freeze_entities = true;
        self
    }

    /// Check everything that does not need the built graph.
    pub fn validate(&self) -> Result<(), SimError> {
        if let Some(alpha) = self.alpha {
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(SimError::InvalidConfig(format!(
                    "alpha must be in (0, 1], got {}",
                    alpha
                )));
            }
        }
        if !(self.g >= 0.0 && self.g.is_finite()) {
            return Err(SimError::InvalidConfig(format!(
                "G must be finite and non-negative, got {}",
                self.g
            )));
        }
        if let SpreadRuleKind::GradientWeighted { bias } = self.spread_rule {
            if !(bias >= 0.0 && bias.is_finite()) {
                return Err(SimError::InvalidConfig(format!(
                    "routing bias must be finite and non-negative, got {}",
                    bias
                )));
            }
        }
        if let SignalKind::Potential { falloff } = self.signal {
            if !(falloff >= 0.0 && falloff.is_finite()) {
                return Err(SimError::InvalidConfig(format!(
                    "potential falloff must be finite and non-negative, got {}",
                    falloff
                )));
            }
        }
        if self.entities.len() >= u16::MAX as usize {
            return Err(SimError::InvalidConfig("too many entities".into()));
        }
        for (i, spec) in self.entities.iter().enumerate() {
            if spec.mass <= 0 {
                return Err(SimError::InvalidMass { mass: spec.mass });
            }
            if spec.quanta == 0 {
                return Err(SimError::InvalidConfig(format!("entity {} has no quanta", i)));
            }
            if spec.node.is_none() && spec.coords.is_none() {
                return Err(SimError::InvalidConfig(format!(
                    "entity {} needs a node or coords",
                    i
                )));
            }
            if spec.direction.iter().any(|c| !c.is_finite()) {
                return Err(SimError::InvalidConfig(format!(
                    "entity {} direction is not finite",
                    i
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, SimError> {
        let config: RunConfig = serde_json::from_str(json)
            .map_err(|e| SimError::InvalidConfig(format!("JSON parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SimError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> String {
        // A RunConfig has no non-string map keys, so serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_two_body_scenario() {
        let config = RunConfig::default();
        assert_eq!(config.entities.len(), 2);
        assert_eq!(config.seed, 42);
        assert_eq!(config.g, 10.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_round_trip_keeps_config() {
        let config = RunConfig::lattice(8, 2.5, 7)
            .with_entity(EntitySpec::at_node(50, 3, 10).with_direction([1.0, 0.0, 0.0]))
            .with_spread_rule(SpreadRuleKind::GradientWeighted { bias: 0.5 });
        let parsed = RunConfig::from_json_str(&config.to_json_pretty()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config = RunConfig::from_json_str(
            r#"{
                "topology": { "lattice": { "side": 6 } },
                "G": 100.0,
                "entities": [ { "quanta": 10, "mass": 2, "node": 0 } ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.g, 100.0);
        assert_eq!(config.seed, 42);
        assert_eq!(config.spread_rule, SpreadRuleKind::SelfGravitation);
        assert_eq!(config.entities[0].direction, [0.0; 3]);
    }

    #[test]
    fn rule_variants_parse() {
        let config = RunConfig::from_json_str(
            r#"{ "spread_rule": { "gradient_weighted": { "bias": 0.25 } } }"#,
        )
        .unwrap();
        assert_eq!(
            config.spread_rule,
            SpreadRuleKind::GradientWeighted { bias: 0.25 }
        );
        let config = RunConfig::from_json_str(r#"{ "spread_rule": "uniform_diffusion" }"#).unwrap();
        assert_eq!(config.spread_rule, SpreadRuleKind::UniformDiffusion);
    }

    #[test]
    fn signal_and_collision_parse() {
        let config = RunConfig::from_json_str(
            r#"{ "signal": "local", "collision": { "inelastic": { "radius": 0 } } }"#,
        )
        .unwrap();
        assert_eq!(config.signal, SignalKind::Local);
        assert_eq!(config.collision, CollisionPolicy::Inelastic { radius: 0 });

        let config = RunConfig::from_json_str(
            r#"{ "signal": { "potential": { "falloff": 1.5 } }, "collision": "coexist" }"#,
        )
        .unwrap();
        assert_eq!(config.signal, SignalKind::Potential { falloff: 1.5 });
        assert_eq!(config.collision, CollisionPolicy::Coexist);

        let defaults = RunConfig::from_json_str("{}").unwrap();
        assert_eq!(defaults.signal, SignalKind::Potential { falloff: 2.0 });
        assert_eq!(defaults.collision, CollisionPolicy::Inelastic { radius: 1 });
    }

    #[test]
    fn negative_falloff_rejected() {
        let config =
            RunConfig::lattice(4, 0.0, 1).with_signal(SignalKind::Potential { falloff: -1.0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_mass_is_invalid_mass() {
        let config = RunConfig::lattice(4, 0.0, 1).with_entity(EntitySpec::at_node(5, 0, 0));
        assert_eq!(config.validate(), Err(SimError::InvalidMass { mass: 0 }));
    }

    #[test]
    fn bad_alpha_and_g_rejected() {
        let mut config = RunConfig::lattice(4, 0.0, 1);
        config.alpha = Some(1.5);
        assert!(config.validate().is_err());
        config.alpha = Some(0.1);
        config.g = -1.0;
        assert!(config.validate().is_err());
        config.g = f64::NAN;
        assert!(config.validate().is_err());
    }
}

//! Simulation engine - main entry point for running the simulation
//!
//! A tick runs in three phases that never overlap:
//! 1. Spread: the whole field advances against the pre-tick snapshot
//! 2. Decide: every entity reads the post-spread field
//! 3. Apply: hops move each entity's quanta, then contacts are resolved
//!
//! Hops only touch their own tag's layer, so the order entities are
//! processed in does not change the result. Conservation is audited once
//! the whole tick is done.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::config::RunConfig;
use crate::error::SimError;
use crate::generation::{spawn_entities, GraphSubstrate, Topology};
use crate::systems::*;

/// What one tick did
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub hops: Vec<Hop>,
    /// Pairs that collided under the configured policy
    pub contacts: usize,
    pub coincident_pairs: usize,
}

/// End-of-run result, serialized by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub seed: u64,
    pub final_tick: u64,
    pub spread_rule: String,
    pub frozen: bool,
    pub initial_separations: Vec<PairSeparation>,
    pub final_separations: Vec<PairSeparation>,
    pub hops_per_entity: Vec<u64>,
    pub final_positions: Vec<NodeId>,
    pub conservation: ConservationReport,
}

impl RunSummary {
    /// Change in hop distance for the first pair (negative = attraction).
    pub fn separation_change(&self) -> Option<i64> {
        let before = self.initial_separations.first()?.hops?;
        let after = self.final_separations.first()?.hops?;
        Some(after as i64 - before as i64)
    }
}

/// Run counters that are not part of the field or entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProgress {
    pub tick: u64,
    pub hops_per_entity: Vec<u64>,
    pub initial_separations: Vec<PairSeparation>,
}

/// Main simulation engine
pub struct SimulationEngine {
    config: RunConfig,
    topology: Topology,
    rule: Box<dyn SpreadRule>,
    /// The single shared occupancy store; replaced wholesale each spread.
    field: TaggedQuantumField,
    entities: Vec<Entity>,
    rng: ChaCha8Rng,
    tick: u64,
    hops_per_entity: Vec<u64>,
    initial_separations: Vec<PairSeparation>,
}

impl SimulationEngine {
    /// Build the graph, place the entities and seed the random stream.
    pub fn new(config: RunConfig) -> Result<Self, SimError> {
        config.validate()?;
        let topology = Topology::build(&config.topology, config.seed)?;
        let mut field = TaggedQuantumField::new(topology.node_count());
        let entities = spawn_entities(&mut field, &topology, &config.entities)?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let progress = RunProgress {
            tick: 0,
            hops_per_entity: vec![0; entities.len()],
            initial_separations: pairwise_separations(&entities, &topology),
        };

        let engine = Self::assemble(config, topology, field, entities, rng, progress)?;
        log::info!(
            "run '{}': {} nodes, {} entities, rule {}, G={}, seed {}",
            engine.config.name,
            engine.topology.node_count(),
            engine.entities.len(),
            engine.rule.name(),
            engine.config.g,
            engine.config.seed
        );
        Ok(engine)
    }

    /// Rebuild an engine around existing dynamic state.
    pub(crate) fn assemble(
        config: RunConfig,
        topology: Topology,
        field: TaggedQuantumField,
        entities: Vec<Entity>,
        rng: ChaCha8Rng,
        progress: RunProgress,
    ) -> Result<Self, SimError> {
        if progress.hops_per_entity.len() != entities.len() {
            return Err(SimError::InvalidConfig(
                "hop counters do not match entity count".into(),
            ));
        }
        if field.node_count() != topology.node_count() {
            return Err(SimError::InvalidConfig(format!(
                "field has {} nodes, graph has {}",
                field.node_count(),
                topology.node_count()
            )));
        }
        let degree = topology.degree(0).max(1);
        let alpha = config.alpha.unwrap_or(1.0 / degree as f64);
        let rule = build_rule(config.spread_rule, alpha, config.g);
        Ok(Self {
            config,
            topology,
            rule,
            field,
            entities,
            rng,
            tick: progress.tick,
            hops_per_entity: progress.hops_per_entity,
            initial_separations: progress.initial_separations,
        })
    }

    /// Counters a resumed run needs to continue its summary.
    pub(crate) fn progress(&self) -> RunProgress {
        RunProgress {
            tick: self.tick,
            hops_per_entity: self.hops_per_entity.clone(),
            initial_separations: self.initial_separations.clone(),
        }
    }

    /// Advance one tick.
    pub fn step(&mut self) -> Result<TickReport, SimError> {
        // Phase 1: spread against the pre-tick snapshot
        let next = spread_field(&self.field, &self.topology, self.rule.as_ref(), &mut self.rng);
        self.field = next;
        self.tick += 1;

        let mut hops = Vec::new();
        let mut contacts = 0;
        if !self.config.freeze_entities {
            // Phase 2: every decision reads the same post-spread field
            let decisions: Vec<(Entity, Option<Hop>)> = self
                .entities
                .iter()
                .map(|e| entity_tick(e, &self.field, &self.topology, self.config.signal))
                .collect();

            for (i, (entity, hop)) in decisions.into_iter().enumerate() {
                self.entities[i] = entity;
                if let Some(hop) = hop {
                    self.hops_per_entity[i] += 1;
                    hops.push(hop);
                }
            }

            // Phase 3: apply
            for hop in &hops {
                self.field.transfer_all(hop.tag, hop.from, hop.to)?;
            }
            contacts =
                resolve_contacts(&mut self.entities, &self.topology, self.config.collision);
        }

        // The audit sees the finished tick, hops included
        if self.config.check_every_tick {
            check_conservation(&self.field, self.tick)?;
        }

        let coincident = coincident_pairs(&self.entities);
        if contacts > 0 || coincident > 0 {
            log::debug!(
                "tick {}: {} contact(s), {} pair(s) sharing an anchor",
                self.tick,
                contacts,
                coincident
            );
        }

        Ok(TickReport {
            tick: self.tick,
            hops,
            contacts,
            coincident_pairs: coincident,
        })
    }

    /// Run to `config.ticks`, calling `observer` on every diagnostics row.
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<RunSummary, SimError>
    where
        F: FnMut(&TickDiagnostics),
    {
        let every = self.config.diagnostics_every;
        if every > 0 && self.tick == 0 {
            observer(&self.diagnostics(0));
        }
        while self.tick < self.config.ticks {
            let report = self.step()?;
            if every > 0 && report.tick % every == 0 {
                observer(&self.diagnostics(report.hops.len()));
            }
        }
        self.finish()
    }

    /// Run to `config.ticks` without collecting diagnostics.
    pub fn run(&mut self) -> Result<RunSummary, SimError> {
        while self.tick < self.config.ticks {
            self.step()?;
        }
        self.finish()
    }

    /// Final conservation check (always performed) and summary.
    pub fn finish(&self) -> Result<RunSummary, SimError> {
        let conservation = check_conservation(&self.field, self.tick)?;
        let summary = RunSummary {
            name: self.config.name.clone(),
            seed: self.config.seed,
            final_tick: self.tick,
            spread_rule: self.rule.name().to_string(),
            frozen: self.config.freeze_entities,
            initial_separations: self.initial_separations.clone(),
            final_separations: pairwise_separations(&self.entities, &self.topology),
            hops_per_entity: self.hops_per_entity.clone(),
            final_positions: self.entities.iter().map(|e| e.position).collect(),
            conservation,
        };
        log::info!(
            "run '{}' finished at tick {}: separation change {:?}",
            summary.name,
            summary.final_tick,
            summary.separation_change()
        );
        Ok(summary)
    }

    pub fn diagnostics(&self, hops_applied: usize) -> TickDiagnostics {
        collect_diagnostics(
            self.tick,
            &self.field,
            &self.entities,
            &self.topology,
            hops_applied,
        )
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn field(&self) -> &TaggedQuantumField {
        &self.field
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn hops_per_entity(&self) -> &[u64] {
        &self.hops_per_entity
    }

    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    /// Extend the run so `run` continues for `extra` more ticks.
    pub fn extend_ticks(&mut self, extra: u64) {
        self.config.ticks = self.config.ticks.max(self.tick).saturating_add(extra);
    }

    pub(crate) fn rng(&self) -> &ChaCha8Rng {
        &self.rng
    }

    /// Save simulation state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), crate::persistence::SaveError> {
        crate::persistence::save_simulation(writer, self)
    }

    /// Load simulation state from a reader
    pub fn load<R: std::io::Read>(reader: R) -> Result<Self, crate::persistence::SaveError> {
        crate::persistence::load_simulation(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EntitySpec, TopologyConfig};

    fn small(g: f64) -> RunConfig {
        RunConfig::lattice(8, g, 11)
            .with_entity(EntitySpec::at_coords(200, 2, [2, 4, 4]).with_direction([1.0, 0.0, 0.0]))
            .with_entity(EntitySpec::at_coords(200, 3, [6, 4, 4]))
            .with_ticks(60)
    }

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::new(small(5.0)).unwrap();
        assert_eq!(engine.tick(), 0);
        assert_eq!(engine.entities().len(), 2);
        assert_eq!(engine.field().tag_count(), 2);
        assert_eq!(engine.rule_name(), "self_gravitation");
        assert_eq!(engine.initial_separations[0].hops, Some(4));
    }

    #[test]
    fn test_engine_run_conserves() {
        let mut config = small(5.0);
        config.check_every_tick = true;
        let mut engine = SimulationEngine::new(config).unwrap();
        let summary = engine.run().unwrap();
        assert_eq!(summary.final_tick, 60);
        assert!(summary.conservation.is_conserved());
        // Mass 2 with a heading: one hop every other tick
        assert_eq!(summary.hops_per_entity[0], 30);
    }

    #[test]
    fn test_frozen_entities_never_move() {
        let mut engine = SimulationEngine::new(small(5.0).frozen()).unwrap();
        let start: Vec<NodeId> = engine.entities().iter().map(|e| e.position).collect();
        let summary = engine.run().unwrap();
        assert_eq!(summary.final_positions, start);
        assert_eq!(summary.separation_change(), Some(0));
        assert!(summary.hops_per_entity.iter().all(|&h| h == 0));
    }

    #[test]
    fn test_observer_sees_periodic_rows() {
        let mut config = small(1.0);
        config.diagnostics_every = 20;
        let mut engine = SimulationEngine::new(config).unwrap();
        let mut ticks = Vec::new();
        engine.run_with(|d| ticks.push(d.tick)).unwrap();
        assert_eq!(ticks, vec![0, 20, 40, 60]);
    }

    #[test]
    fn test_hop_moves_anchor_quanta() {
        let config = RunConfig::lattice(6, 1000.0, 3)
            .with_entity(EntitySpec::at_node(100, 1, 0).with_direction([0.0, 0.0, 1.0]))
            .with_ticks(1);
        let mut engine = SimulationEngine::new(config).unwrap();
        let report = engine.step().unwrap();
        assert_eq!(report.hops.len(), 1);
        let hop = report.hops[0];
        assert_eq!(engine.entities()[0].position, hop.to);
        assert_eq!(engine.field().occupancy(hop.from, Tag(0)), 0);
        assert!(engine.field().occupancy(hop.to, Tag(0)) >= 99);
    }

    #[test]
    fn test_audit_runs_after_hops() {
        let mut config = small(5.0);
        config.check_every_tick = true;
        let mut engine = SimulationEngine::new(config).unwrap();
        let first = engine.step().unwrap();
        let second = engine.step().unwrap();
        assert!(first.hops.is_empty());
        assert_eq!(second.hops.len(), 1);
        assert!(audit(engine.field(), engine.tick()).is_conserved());

        // A stray quantum added mid-run is reported against the tick it
        // survives to, once that tick's hops are applied
        engine.field.deposit(0, Tag(1), 1);
        let err = engine.step().unwrap_err();
        assert!(matches!(
            err,
            SimError::ConservationViolation { tick: 3, found: 201, .. }
        ));
    }

    #[test]
    fn test_invalid_topology_rejected() {
        let mut config = small(1.0);
        config.topology = TopologyConfig::Lattice { side: 2 };
        assert!(SimulationEngine::new(config).is_err());
    }
}

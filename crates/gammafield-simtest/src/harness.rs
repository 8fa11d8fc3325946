//! Validation harness: short, deterministic checks of the field and
//! movement invariants, reported as a pass/fail list.

use gammafield_core::prelude::*;
use gammafield_core::systems::{
    entity_tick, external_gradient, external_gradient_direct, retained_fraction,
};

// ── Sample configs (same JSON the `run` command accepts) ────────────────
const TWO_BODY_JSON: &str = include_str!("../../../data/two_body.json");
const REWIRED_JSON: &str = include_str!("../../../data/rewired_three_body.json");

pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl TestResult {
    fn new(name: &str, passed: bool, detail: String) -> Self {
        Self {
            name: name.into(),
            passed,
            detail,
        }
    }

    fn failed(name: &str, err: impl std::fmt::Display) -> Self {
        Self::new(name, false, format!("error: {}", err))
    }
}

/// Run every section, print the report, and return whether all passed.
pub fn run_all(verbose: bool) -> bool {
    println!("=== GammaField Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Bundled configs parse and build
    results.extend(validate_configs(verbose));

    // 2. Exact conservation under every rule and topology
    results.extend(validate_conservation(verbose));

    // 3. Same seed, same trajectory
    results.extend(validate_reproducibility(verbose));

    // 4. Movement: speed scaling and flat-field heading
    results.extend(validate_movement(verbose));

    // 5. Two bodies close the gap; the frozen control does not
    results.extend(validate_attraction(verbose));

    // 6. Self-gravitation binding
    results.extend(validate_binding(verbose));

    // 7. Self-subtraction agrees with direct summation
    results.extend(validate_signal(verbose));

    // 8. Save / resume
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    failed == 0
}

fn small_two_body(side: u32, g: f64, seed: u64) -> RunConfig {
    let mid = side / 2;
    RunConfig::lattice(side, g, seed)
        .with_entity(EntitySpec::at_coords(500, 3, [1, mid, mid]).with_direction([0.0, 1.0, 0.0]))
        .with_entity(EntitySpec::at_coords(500, 4, [side - 2, mid, mid]))
}

// ── 1. Configs ──────────────────────────────────────────────────────────

fn validate_configs(verbose: bool) -> Vec<TestResult> {
    println!("--- Configs ---");
    let mut results = Vec::new();

    for (name, json) in [("two_body", TWO_BODY_JSON), ("rewired", REWIRED_JSON)] {
        let label = format!("config_{}_builds", name);
        match RunConfig::from_json_str(json).and_then(SimulationEngine::new) {
            Ok(engine) => {
                if verbose {
                    println!(
                        "  {}: {} nodes, {} entities, rule {}",
                        name,
                        engine.topology().node_count(),
                        engine.entities().len(),
                        engine.rule_name()
                    );
                }
                results.push(TestResult::new(
                    &label,
                    true,
                    format!("{} entities", engine.entities().len()),
                ));
            }
            Err(e) => results.push(TestResult::failed(&label, e)),
        }
    }

    let default_matches = RunConfig::from_json_str(TWO_BODY_JSON)
        .map(|c| {
            let d = RunConfig::default();
            c.entities == d.entities
                && c.g == d.g
                && c.signal == d.signal
                && c.collision == d.collision
        })
        .unwrap_or(false);
    results.push(TestResult::new(
        "config_two_body_matches_default",
        default_matches,
        "bundled two_body.json equals RunConfig::default()".into(),
    ));

    let bad = RunConfig::lattice(5, 1.0, 1).with_entity(EntitySpec::at_node(10, -3, 0));
    results.push(TestResult::new(
        "config_rejects_negative_mass",
        matches!(bad.validate(), Err(SimError::InvalidMass { mass: -3 })),
        "mass -3 rejected".into(),
    ));

    results
}

// ── 2. Conservation ─────────────────────────────────────────────────────

fn validate_conservation(_verbose: bool) -> Vec<TestResult> {
    println!("--- Conservation ---");
    let mut results = Vec::new();

    let rules = [
        SpreadRuleKind::SelfGravitation,
        SpreadRuleKind::UniformDiffusion,
        SpreadRuleKind::GradientWeighted { bias: 0.2 },
    ];
    for rule in rules {
        for (topology, label) in [
            (TopologyConfig::Lattice { side: 8 }, "lattice"),
            (TopologyConfig::Rewired { side: 8, fraction: 0.1 }, "rewired"),
        ] {
            let mut config = small_two_body(8, 2.0, 9)
                .with_spread_rule(rule)
                .with_ticks(300);
            config.topology = topology;
            config.check_every_tick = true;
            let name = format!("conservation_{:?}_{}", rule, label)
                .to_lowercase()
                .replace([' ', '{', '}', ':'], "");
            let outcome = SimulationEngine::new(config).and_then(|mut e| e.run());
            results.push(match outcome {
                Ok(summary) => TestResult::new(
                    &name,
                    summary.conservation.is_conserved(),
                    format!("{} tags balanced over 300 ticks", summary.conservation.balances.len()),
                ),
                Err(e) => TestResult::failed(&name, e),
            });
        }
    }

    results
}

// ── 3. Reproducibility ──────────────────────────────────────────────────

fn validate_reproducibility(_verbose: bool) -> Vec<TestResult> {
    println!("--- Reproducibility ---");
    let run = |seed| -> Result<(TaggedQuantumField, Vec<Entity>), SimError> {
        let mut engine = SimulationEngine::new(small_two_body(8, 1.0, seed).with_ticks(250))?;
        engine.run()?;
        Ok((engine.field().clone(), engine.entities().to_vec()))
    };

    let outcome = (|| -> Result<(bool, bool), SimError> {
        let a = run(21)?;
        let b = run(21)?;
        let c = run(22)?;
        Ok((a == b, a.0 != c.0))
    })();

    match outcome {
        Ok((same, differs)) => vec![
            TestResult::new(
                "same_seed_identical",
                same,
                "field and entities equal after 250 ticks".into(),
            ),
            TestResult::new(
                "different_seed_diverges",
                differs,
                "seeds 21 and 22 give different fields".into(),
            ),
        ],
        Err(e) => vec![TestResult::failed("reproducibility", e)],
    }
}

// ── 4. Movement ─────────────────────────────────────────────────────────

fn validate_movement(_verbose: bool) -> Vec<TestResult> {
    println!("--- Movement ---");
    let mut results = Vec::new();

    let config = RunConfig::lattice(20, 10.0, 42)
        .with_entity(EntitySpec::at_coords(1000, 5, [10, 10, 10]).with_direction([1.0, 0.0, 0.0]))
        .with_ticks(200);
    results.push(match SimulationEngine::new(config).and_then(|mut e| e.run()) {
        Ok(summary) => TestResult::new(
            "speed_scaling_mass_5",
            summary.hops_per_entity == [40],
            format!("{:?} hops in 200 ticks (expected 40)", summary.hops_per_entity),
        ),
        Err(e) => TestResult::failed("speed_scaling_mass_5", e),
    });

    results.push(match flat_field_heading_drift() {
        Ok(changes) => TestResult::new(
            "flat_field_keeps_heading",
            changes == 0,
            format!("{} heading changes over 100 ticks", changes),
        ),
        Err(e) => TestResult::failed("flat_field_keeps_heading", e),
    });

    results
}

fn flat_field_heading_drift() -> Result<usize, SimError> {
    let lattice = PeriodicLattice::new(10)?;
    let mut field = TaggedQuantumField::new(lattice.node_count());
    let start = lattice.node_at(5, 5, 5);
    let own = field.add_spike(start, 300)?;
    field.add_layer(vec![11; lattice.node_count()])?;
    let mut entity = Entity::new(own, 3, start, Vec3::new(0.6, 0.7, -0.2))?;
    let heading = entity.direction;
    let mut changes = 0;
    for _ in 0..100 {
        let (next, hop) = entity_tick(&entity, &field, &lattice, SignalKind::default());
        if let Some(hop) = hop {
            field.transfer_all(hop.tag, hop.from, hop.to)?;
        }
        if next.direction != heading {
            changes += 1;
        }
        entity = next;
    }
    Ok(changes)
}

// ── 5. Attraction ───────────────────────────────────────────────────────

/// 12³ lattice, cores 6 hops apart: the two-body scenario at a size the
/// harness can afford.
fn short_two_body(seed: u64) -> RunConfig {
    let mut config = RunConfig::lattice(12, 10.0, seed)
        .with_entity(EntitySpec::at_coords(1000, 5, [3, 6, 6]))
        .with_entity(EntitySpec::at_coords(1000, 5, [9, 6, 6]))
        .with_ticks(4000);
    config.check_every_tick = false;
    config.diagnostics_every = 0;
    config
}

fn validate_attraction(verbose: bool) -> Vec<TestResult> {
    println!("--- Attraction ---");
    let mut results = Vec::new();

    for (name, config) in [
        ("short_two_body_attracts", short_two_body(42)),
        ("short_control_stays_apart", short_two_body(42).frozen()),
    ] {
        let frozen = config.freeze_entities;
        let outcome = SimulationEngine::new(config).and_then(|mut e| e.run());
        results.push(match outcome {
            Ok(summary) => {
                let change = summary.separation_change();
                if verbose {
                    println!(
                        "  {}: {:?} -> {:?}",
                        name,
                        summary.initial_separations.first().and_then(|s| s.hops),
                        summary.final_separations.first().and_then(|s| s.hops)
                    );
                }
                let passed = match change {
                    Some(d) if frozen => d >= 0,
                    Some(d) => d < 0,
                    None => false,
                };
                TestResult::new(
                    name,
                    passed && summary.conservation.is_conserved(),
                    format!("separation changed by {:?} over 4000 ticks", change),
                )
            }
            Err(e) => TestResult::failed(name, e),
        });
    }

    results
}

// ── 6. Binding ──────────────────────────────────────────────────────────

fn validate_binding(verbose: bool) -> Vec<TestResult> {
    println!("--- Binding ---");
    let couplings = [0.0, 1.0, 10.0, 100.0];
    let mut retained = Vec::new();
    for &g in &couplings {
        let config = RunConfig::lattice(12, g, 5)
            .with_entity(EntitySpec::at_coords(500, 1, [6, 6, 6]))
            .with_ticks(2000)
            .frozen();
        let outcome = SimulationEngine::new(config).and_then(|mut engine| {
            engine.run()?;
            Ok(engine)
        });
        match outcome {
            Ok(engine) => {
                let center = engine.entities()[0].position;
                let f = retained_fraction(engine.field(), engine.topology(), Tag(0), center, 2);
                if verbose {
                    println!("  G={:>5}: {:.3} retained within 2 hops", g, f);
                }
                retained.push(f);
            }
            Err(e) => return vec![TestResult::failed("binding", e)],
        }
    }

    let monotone = retained.windows(2).all(|w| w[0] < w[1]);
    vec![
        TestResult::new(
            "binding_monotone_in_g",
            monotone,
            format!("retained {:?} for G {:?}", retained, couplings),
        ),
        TestResult::new(
            "binding_strong_g_holds",
            retained.last().copied().unwrap_or(0.0) >= 0.9,
            format!("G=100 retained {:.3}", retained.last().copied().unwrap_or(0.0)),
        ),
        TestResult::new(
            "binding_free_diffusion_disperses",
            retained.first().copied().unwrap_or(1.0) < 0.1,
            format!("G=0 retained {:.3}", retained.first().copied().unwrap_or(1.0)),
        ),
    ]
}

// ── 7. Signal ───────────────────────────────────────────────────────────

fn validate_signal(_verbose: bool) -> Vec<TestResult> {
    println!("--- Signal ---");
    let outcome = (|| -> Result<(usize, usize), SimError> {
        let mut engine = SimulationEngine::new(small_two_body(8, 0.5, 31).with_ticks(80))?;
        engine.run()?;
        let field = engine.field();
        let graph = engine.topology();
        let mut checked = 0;
        let mut mismatches = 0;
        for entity in engine.entities() {
            for node in 0..graph.node_count() as NodeId {
                checked += 1;
                if external_gradient(field, graph, entity.tag, node)
                    != external_gradient_direct(field, graph, entity.tag, node)
                {
                    mismatches += 1;
                }
            }
        }
        Ok((checked, mismatches))
    })();

    match outcome {
        Ok((checked, mismatches)) => vec![TestResult::new(
            "self_subtraction_matches_direct",
            mismatches == 0,
            format!("{} mismatches in {} gradients", mismatches, checked),
        )],
        Err(e) => vec![TestResult::failed("self_subtraction_matches_direct", e)],
    }
}

// ── 8. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let config = small_two_body(8, 3.0, 17).with_ticks(120);

    let outcome = (|| -> Result<bool, Box<dyn std::error::Error>> {
        let mut straight = SimulationEngine::new(config.clone())?;
        let expected = straight.run()?;

        let mut first = SimulationEngine::new(config.clone())?;
        for _ in 0..60 {
            first.step()?;
        }
        let mut buffer = Vec::new();
        first.save(&mut buffer)?;
        let mut resumed = SimulationEngine::load(&buffer[..])?;
        let summary = resumed.run()?;
        Ok(summary == expected && resumed.field() == straight.field())
    })();

    match outcome {
        Ok(same) => vec![TestResult::new(
            "resume_matches_uninterrupted",
            same,
            "save at tick 60, resume to 120".into(),
        )],
        Err(e) => vec![TestResult::failed("resume_matches_uninterrupted", e)],
    }
}

//! Diagnostics output: one CSV row per sampled tick, JSON run summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use gammafield_core::engine::RunSummary;
use gammafield_core::systems::TickDiagnostics;

/// Streams `TickDiagnostics` rows to a CSV file.
pub struct CsvDiagnostics {
    writer: BufWriter<File>,
    path: PathBuf,
    entity_count: usize,
    rows: usize,
}

impl CsvDiagnostics {
    pub fn create(path: &Path, entity_count: usize) -> Result<Self> {
        ensure_parent(path)?;
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut out = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            entity_count,
            rows: 0,
        };
        out.write_header()?;
        Ok(out)
    }

    fn write_header(&mut self) -> Result<()> {
        let mut columns = vec![
            "tick".to_string(),
            "separation".to_string(),
            "conserved".to_string(),
            "hops_applied".to_string(),
            "coincident_pairs".to_string(),
            "angular_momentum".to_string(),
        ];
        for i in 0..self.entity_count {
            for field in ["node", "peak", "quanta_at_node", "dir_x", "dir_y", "dir_z"] {
                columns.push(format!("e{}_{}", i, field));
            }
        }
        writeln!(self.writer, "{}", columns.join(","))?;
        Ok(())
    }

    pub fn write_row(&mut self, d: &TickDiagnostics) -> Result<()> {
        let separation = d
            .separations
            .first()
            .and_then(|s| s.hops)
            .map(|h| h.to_string())
            .unwrap_or_default();
        let mut cells = vec![
            d.tick.to_string(),
            separation,
            d.conserved.to_string(),
            d.hops_applied.to_string(),
            d.coincident_pairs.to_string(),
            format!("{:.6}", d.angular_momentum_magnitude()),
        ];
        for e in &d.entities {
            cells.push(e.position.to_string());
            cells.push(e.peak.map(|p| p.to_string()).unwrap_or_default());
            cells.push(e.quanta_at_position.to_string());
            cells.extend(e.direction.iter().map(|c| format!("{:.6}", c)));
        }
        writeln!(self.writer, "{}", cells.join(","))
            .with_context(|| format!("writing {}", self.path.display()))?;
        self.rows += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| format!("flushing {}", self.path.display()))?;
        Ok(self.rows)
    }
}

pub fn write_summary(path: &Path, summaries: &[RunSummary]) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(summaries)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn print_summary(summary: &RunSummary) {
    let before = summary.initial_separations.first().and_then(|s| s.hops);
    let after = summary.final_separations.first().and_then(|s| s.hops);
    println!("\n=== {} ===", summary.name);
    println!("Rule: {}", summary.spread_rule);
    println!("Seed: {}", summary.seed);
    println!("Ticks: {}", summary.final_tick);
    println!("Frozen: {}", summary.frozen);
    println!("Separation: {:?} -> {:?}", before, after);
    println!("Hops per entity: {:?}", summary.hops_per_entity);
    println!("Conserved: {}", summary.conservation.is_conserved());
}

/// Scenario outcome: the moving run must close the gap and the frozen
/// control (second summary, when present) must not.
pub fn attraction_verdict(summaries: &[RunSummary]) -> Result<()> {
    let Some(moving) = summaries.first() else {
        bail!("no scenario runs to judge");
    };
    match moving.separation_change() {
        Some(d) if d < 0 => {}
        Some(d) => bail!("'{}' shows no attraction: separation changed by {}", moving.name, d),
        None => bail!("'{}' has no measurable separation", moving.name),
    }
    if let Some(control) = summaries.get(1) {
        match control.separation_change() {
            Some(d) if d >= 0 => {}
            Some(d) => bail!(
                "control '{}' shows spurious attraction: separation changed by {}",
                control.name,
                d
            ),
            None => bail!("control '{}' has no measurable separation", control.name),
        }
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gammafield_core::components::Tag;
    use gammafield_core::systems::{ConservationReport, PairSeparation};

    fn summary(name: &str, before: u32, after: Option<u32>) -> RunSummary {
        let pair = |hops| PairSeparation {
            a: Tag(0),
            b: Tag(1),
            hops,
        };
        RunSummary {
            name: name.into(),
            seed: 42,
            final_tick: 100,
            spread_rule: "self_gravitation".into(),
            frozen: false,
            initial_separations: vec![pair(Some(before))],
            final_separations: vec![pair(after)],
            hops_per_entity: vec![0, 0],
            final_positions: vec![0, 1],
            conservation: ConservationReport {
                tick: 100,
                balances: Vec::new(),
            },
        }
    }

    #[test]
    fn closing_gap_with_clean_control_passes() {
        let runs = [summary("moving", 10, Some(1)), summary("control", 10, Some(10))];
        assert!(attraction_verdict(&runs).is_ok());
        assert!(attraction_verdict(&runs[..1]).is_ok());
    }

    #[test]
    fn missing_attraction_fails() {
        let runs = [summary("moving", 10, Some(12)), summary("control", 10, Some(10))];
        let err = attraction_verdict(&runs).unwrap_err();
        assert!(err.to_string().contains("no attraction"));
        assert!(attraction_verdict(&[summary("moving", 10, Some(10))]).is_err());
    }

    #[test]
    fn spurious_control_attraction_fails() {
        let runs = [summary("moving", 10, Some(2)), summary("control", 10, Some(9))];
        let err = attraction_verdict(&runs).unwrap_err();
        assert!(err.to_string().contains("spurious"));
    }

    #[test]
    fn unmeasurable_or_empty_runs_fail() {
        assert!(attraction_verdict(&[]).is_err());
        assert!(attraction_verdict(&[summary("moving", 10, None)]).is_err());
    }
}

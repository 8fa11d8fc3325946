//! Conservation audit.
//!
//! For every tag, the sum over all nodes must equal the tag's initial mass
//! after every tick. Occupancy is `u32`, so negativity can only surface as a
//! failed checked subtraction in a transfer; the audit covers the rest.

use serde::{Deserialize, Serialize};

use crate::components::{Tag, TaggedQuantumField};
use crate::error::SimError;

/// Expected vs. found quanta for one tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagBalance {
    pub tag: Tag,
    pub expected: u64,
    pub found: u64,
}

impl TagBalance {
    pub fn is_balanced(&self) -> bool {
        self.expected == self.found
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConservationReport {
    pub tick: u64,
    pub balances: Vec<TagBalance>,
}

impl ConservationReport {
    pub fn is_conserved(&self) -> bool {
        self.balances.iter().all(TagBalance::is_balanced)
    }

    pub fn first_violation(&self) -> Option<&TagBalance> {
        self.balances.iter().find(|b| !b.is_balanced())
    }
}

/// Tally every tag without failing.
pub fn audit(field: &TaggedQuantumField, tick: u64) -> ConservationReport {
    let balances = field
        .tags()
        .map(|tag| TagBalance {
            tag,
            expected: field.initial_mass(tag).unwrap_or(0),
            found: field.tag_total(tag),
        })
        .collect();
    ConservationReport { tick, balances }
}

/// Audit and turn the first imbalance into a fatal error.
pub fn check_conservation(
    field: &TaggedQuantumField,
    tick: u64,
) -> Result<ConservationReport, SimError> {
    let report = audit(field, tick);
    if let Some(b) = report.first_violation() {
        log::error!(
            "conservation violated: tag {} expected {} found {} at tick {}",
            b.tag.0,
            b.expected,
            b.found,
            tick
        );
        return Err(SimError::ConservationViolation {
            tag: b.tag,
            expected: b.expected,
            found: b.found,
            tick,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_field_is_conserved() {
        let mut field = TaggedQuantumField::new(8);
        field.add_spike(0, 10).unwrap();
        field.add_spike(5, 3).unwrap();
        let report = check_conservation(&field, 0).unwrap();
        assert!(report.is_conserved());
        assert_eq!(report.balances.len(), 2);
    }

    #[test]
    fn leaked_quantum_is_a_violation() {
        let mut field = TaggedQuantumField::new(8);
        let tag = field.add_spike(0, 10).unwrap();
        // Simulate a kernel bug that creates a quantum out of nothing
        field.deposit(3, tag, 1);
        let err = check_conservation(&field, 17).unwrap_err();
        assert_eq!(
            err,
            SimError::ConservationViolation {
                tag,
                expected: 10,
                found: 11,
                tick: 17
            }
        );
        assert!(!audit(&field, 17).is_conserved());
    }

    #[test]
    fn transfers_keep_balance() {
        let mut field = TaggedQuantumField::new(8);
        let tag = field.add_spike(0, 10).unwrap();
        field.transfer(tag, 0, 7, 4).unwrap();
        field.transfer_all(tag, 0, 2).unwrap();
        assert!(audit(&field, 1).is_conserved());
    }
}

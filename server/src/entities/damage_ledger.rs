//! Per-mob record of who dealt how much damage, used to pick the claimant.

use warband_shared::CombatantId;

#[derive(Debug, Clone)]
struct LedgerEntry {
    attacker: CombatantId,
    total: u64,
    /// Hit sequence number at which `total` was last raised
    reached_at: u64,
}

/// Cumulative damage per attacker.
///
/// Lives inside the mob's locked state, so it needs no lock of its own.
#[derive(Debug, Clone, Default)]
pub struct DamageLedger {
    entries: Vec<LedgerEntry>,
    hits: u64,
}

impl DamageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the attacker's running total and return the new total
    pub fn record(&mut self, attacker: CombatantId, amount: u32) -> u64 {
        self.hits += 1;
        let hit = self.hits;
        if let Some(entry) = self.entries.iter_mut().find(|e| e.attacker == attacker) {
            if amount > 0 {
                entry.total += u64::from(amount);
                entry.reached_at = hit;
            }
            return entry.total;
        }
        self.entries.push(LedgerEntry {
            attacker,
            total: u64::from(amount),
            reached_at: hit,
        });
        u64::from(amount)
    }

    /// Total damage recorded for `attacker`
    pub fn total_for(&self, attacker: CombatantId) -> u64 {
        self.entries
            .iter()
            .find(|e| e.attacker == attacker)
            .map(|e| e.total)
            .unwrap_or(0)
    }

    /// Highest contributor. On a tie the attacker who reached the top total
    /// first wins.
    pub fn claimant(&self) -> Option<CombatantId> {
        self.entries
            .iter()
            .filter(|e| e.total > 0)
            .min_by(|a, b| b.total.cmp(&a.total).then(a.reached_at.cmp(&b.reached_at)))
            .map(|e| e.attacker)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: CombatantId = CombatantId::Character(1);
    const BOB: CombatantId = CombatantId::Character(2);
    const PET: CombatantId = CombatantId::Pet(9);

    #[test]
    fn test_highest_total_claims() {
        let mut ledger = DamageLedger::new();
        ledger.record(ALICE, 10);
        ledger.record(BOB, 25);
        ledger.record(ALICE, 10);
        assert_eq!(ledger.total_for(ALICE), 20);
        assert_eq!(ledger.claimant(), Some(BOB));
    }

    #[test]
    fn test_tie_goes_to_first_to_reach_it() {
        let mut ledger = DamageLedger::new();
        ledger.record(ALICE, 5);
        ledger.record(BOB, 30);
        ledger.record(ALICE, 25);
        // Both at 30; Bob got there on hit 2, Alice on hit 3
        assert_eq!(ledger.claimant(), Some(BOB));

        ledger.record(PET, 30);
        assert_eq!(ledger.claimant(), Some(BOB));
    }

    #[test]
    fn test_totals_never_decrease() {
        let mut ledger = DamageLedger::new();
        let mut last = 0;
        for amount in [3, 0, 7, 12, 0, 4] {
            let total = ledger.record(ALICE, amount);
            assert!(total >= last);
            last = total;
        }
        assert_eq!(last, 26);
    }

    #[test]
    fn test_empty_ledger_has_no_claimant() {
        let mut ledger = DamageLedger::new();
        assert_eq!(ledger.claimant(), None);
        ledger.record(ALICE, 0);
        assert_eq!(ledger.claimant(), None);
        ledger.record(ALICE, 4);
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.claimant(), None);
    }
}

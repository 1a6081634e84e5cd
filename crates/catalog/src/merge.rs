//! Catalog merge engine.
//!
//! Merge rules:
//! 1. Records are identified by lower-cased name.
//! 2. A canonical id always outranks a synthetic one; an incoming record with a
//!    canonical id replaces a synthetic slot wholesale, keeping its position.
//! 3. Unseen names are prepended (newest first) in input order.
//! 4. Anything else leaves the existing record untouched.

use std::collections::{HashMap, HashSet};

use binged_core::types::CatalogRecord;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub records: Vec<CatalogRecord>,
    /// Names present in the result that were not present before.
    pub added: usize,
    /// Existing names whose synthetic id was replaced by a canonical one.
    pub upgraded: usize,
}

/// Where a name's current winner lives while merging.
#[derive(Clone, Copy)]
enum Slot {
    Existing(usize),
    New(usize),
}

pub fn merge(existing: Vec<CatalogRecord>, incoming: Vec<CatalogRecord>) -> MergeOutcome {
    let mut slots: HashMap<String, Slot> = HashMap::new();
    let mut kept: Vec<Option<CatalogRecord>> = Vec::with_capacity(existing.len());

    for record in existing {
        let key = record.name_key();
        match slots.get(&key).copied() {
            None => {
                slots.insert(key, Slot::Existing(kept.len()));
                kept.push(Some(record));
            }
            // Duplicate name already cached: keep the first position, best id.
            Some(Slot::Existing(pos)) => {
                if upgrades(kept[pos].as_ref(), &record) {
                    kept[pos] = Some(record);
                }
            }
            Some(Slot::New(_)) => {}
        }
    }

    let previous_names: HashSet<String> = slots.keys().cloned().collect();
    let mut new_items: Vec<CatalogRecord> = Vec::new();
    let mut upgraded = 0;

    for record in incoming {
        let key = record.name_key();
        match slots.get(&key).copied() {
            None => {
                slots.insert(key, Slot::New(new_items.len()));
                new_items.push(record);
            }
            Some(Slot::Existing(pos)) => {
                if upgrades(kept[pos].as_ref(), &record) {
                    debug!(name = %record.name, id = %record.id, "upgraded to canonical id");
                    kept[pos] = Some(record);
                    upgraded += 1;
                }
            }
            Some(Slot::New(pos)) => {
                if upgrades(new_items.get(pos), &record) {
                    new_items[pos] = record;
                }
            }
        }
    }

    let new_names: HashSet<String> = new_items.iter().map(CatalogRecord::name_key).collect();
    let mut records = new_items;
    records.extend(
        kept.into_iter()
            .flatten()
            .filter(|r| !new_names.contains(&r.name_key())),
    );

    let added = records
        .iter()
        .filter(|r| !previous_names.contains(&r.name_key()))
        .count();

    MergeOutcome {
        records,
        added,
        upgraded,
    }
}

/// Replace a partition with a fresh full batch. Names missing from the batch
/// drop out, but a cached canonical record is kept over a fresh synthetic one
/// of the same name, so ids never regress.
pub fn replace_preserving_canonical(
    existing: Vec<CatalogRecord>,
    incoming: Vec<CatalogRecord>,
) -> MergeOutcome {
    let mut cached: HashMap<String, CatalogRecord> = HashMap::new();
    let mut previous_names: HashSet<String> = HashSet::new();
    for record in existing {
        let key = record.name_key();
        previous_names.insert(key.clone());
        if record.has_canonical_id() {
            cached.entry(key).or_insert(record);
        }
    }

    let fresh = merge(Vec::new(), incoming);
    let mut upgraded = 0;
    let records: Vec<CatalogRecord> = fresh
        .records
        .into_iter()
        .map(|record| {
            let key = record.name_key();
            if record.has_canonical_id() {
                if previous_names.contains(&key) && !cached.contains_key(&key) {
                    upgraded += 1;
                }
                return record;
            }
            match cached.remove(&key) {
                Some(kept) => {
                    debug!(name = %kept.name, id = %kept.id, "kept cached canonical id");
                    kept
                }
                None => record,
            }
        })
        .collect();

    let added = records
        .iter()
        .filter(|r| !previous_names.contains(&r.name_key()))
        .count();

    MergeOutcome {
        records,
        added,
        upgraded,
    }
}

fn upgrades(current: Option<&CatalogRecord>, incoming: &CatalogRecord) -> bool {
    incoming.has_canonical_id() && current.is_some_and(|c| !c.has_canonical_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use binged_core::types::ContentType;

    fn rec(name: &str, id: &str) -> CatalogRecord {
        let mut r = CatalogRecord::new(id, ContentType::Movie, name);
        r.poster = format!("poster-{id}");
        r
    }

    fn ids(records: &[CatalogRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn canonical_incoming_upgrades_synthetic_in_place() {
        let existing = vec![rec("Alpha", "tt1"), rec("Bar", "binged:1"), rec("Gamma", "tt3")];
        let out = merge(existing, vec![rec("Bar", "tt000123")]);
        assert_eq!(ids(&out.records), ["tt1", "tt000123", "tt3"]);
        assert_eq!(out.records[1].poster, "poster-tt000123");
        assert_eq!(out.upgraded, 1);
        assert_eq!(out.added, 0);
    }

    #[test]
    fn synthetic_incoming_never_replaces_canonical() {
        let existing = vec![rec("Bar", "tt000123")];
        let out = merge(existing.clone(), vec![rec("bar", "binged:9"), rec("BAR", "tt999")]);
        assert_eq!(out.records, existing);
        assert_eq!(out.upgraded, 0);
    }

    #[test]
    fn new_names_are_prepended_in_input_order() {
        let existing = vec![rec("Old", "tt1")];
        let out = merge(existing, vec![rec("New A", "tt2"), rec("New B", "binged:3")]);
        assert_eq!(ids(&out.records), ["tt2", "binged:3", "tt1"]);
        assert_eq!(out.added, 2);
    }

    #[test]
    fn duplicates_within_incoming_collapse_to_best_id() {
        let out = merge(
            vec![],
            vec![rec("Dup", "binged:1"), rec("Other", "tt5"), rec("dup", "tt2"), rec("DUP", "binged:3")],
        );
        assert_eq!(ids(&out.records), ["tt2", "tt5"]);
        assert_eq!(out.added, 2);
    }

    #[test]
    fn duplicate_existing_names_keep_canonical_winner() {
        let existing = vec![rec("Same", "binged:1"), rec("Next", "tt7"), rec("same", "tt8")];
        let out = merge(existing, vec![]);
        assert_eq!(ids(&out.records), ["tt8", "tt7"]);
    }

    #[test]
    fn merge_is_idempotent() {
        let existing = vec![rec("A", "tt1"), rec("B", "binged:2"), rec("C", "tt3")];

        let out = merge(existing.clone(), vec![]);
        assert_eq!(out.records, existing);
        assert_eq!((out.added, out.upgraded), (0, 0));

        let subset = vec![existing[2].clone(), existing[1].clone()];
        let out = merge(existing.clone(), subset);
        assert_eq!(out.records, existing);
        assert_eq!((out.added, out.upgraded), (0, 0));
    }

    #[test]
    fn full_replace_keeps_cached_canonical_ids() {
        let existing = vec![rec("Bar", "tt000123"), rec("Gone", "tt9"), rec("Up", "binged:4")];
        let incoming = vec![rec("New", "binged:7"), rec("bar", "binged:1"), rec("Up", "tt44")];
        let out = replace_preserving_canonical(existing, incoming);
        assert_eq!(ids(&out.records), ["binged:7", "tt000123", "tt44"]);
        assert_eq!(out.records[1].poster, "poster-tt000123");
        assert_eq!((out.added, out.upgraded), (1, 1));
    }

    #[test]
    fn full_replace_prefers_fresh_canonical_record() {
        let existing = vec![rec("Bar", "tt1")];
        let mut fresh = rec("Bar", "tt2");
        fresh.poster = "fresh".into();
        let out = replace_preserving_canonical(existing, vec![fresh.clone()]);
        assert_eq!(out.records, [fresh]);
        assert_eq!((out.added, out.upgraded), (0, 0));
    }

    #[test]
    fn canonical_ids_survive_any_interleaving() {
        let existing = vec![rec("X", "tt1"), rec("Y", "binged:2")];
        let incoming = vec![rec("y", "binged:5"), rec("x", "binged:6"), rec("Y", "tt7"), rec("Y", "binged:8")];
        let out = merge(existing, incoming);
        for r in &out.records {
            assert!(r.has_canonical_id(), "{} lost its canonical id", r.name);
        }
        assert_eq!(ids(&out.records), ["tt1", "tt7"]);
    }
}

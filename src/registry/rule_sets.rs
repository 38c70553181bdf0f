use std::sync::mpsc;

use tracing::{
    debug,
    info,
    warn,
};

use super::{
    events::RegistryEvent,
    Facet,
};
use crate::core::{
    models::{
        MAX_ABBREVIATION_ROWS,
        MAX_RULE_ROWS,
    },
    AbbreviationTable,
    IncludedRuleSet,
    RewriteRule,
    RuleSet,
    RuleSetBundle,
    SettingFlag,
    StudioError,
};

/// Ordered collection of rule-sets. Position in the collection is the rule-set
/// index; every mutation goes through here so subscribers see each change.
#[derive(Default)]
pub struct RuleSetRegistry {
    rule_sets: Vec<RuleSet>,
    subscribers: Vec<mpsc::Sender<RegistryEvent>>,
}

impl RuleSetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> mpsc::Receiver<RegistryEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    fn emit(&mut self, event: RegistryEvent) {
        debug!("[REGISTRY] {} -> {} subscriber(s)", event.event_type(), self.subscribers.len());
        self.subscribers.retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RuleSet> {
        self.rule_sets.get(index)
    }

    pub fn rule_sets(&self) -> &[RuleSet] {
        &self.rule_sets
    }

    /// Installs the single default rule-set used before any bundle arrives.
    pub fn seed_default(&mut self) {
        self.rule_sets = vec![RuleSet::seeded()];
        info!("[REGISTRY] Seeded default rule set");
        self.emit(RegistryEvent::Seeded);
    }

    /// Swaps the whole collection for the bundle's contents. The replacement is
    /// built in full before it is published, so no reader can observe a
    /// partially populated registry.
    pub fn replace_all(&mut self, bundle: RuleSetBundle) {
        let rebuilt: Vec<RuleSet> = bundle
            .into_iter()
            .enumerate()
            .map(|(index, entry)| RuleSet::from_entry(index, entry))
            .collect();

        let len = rebuilt.len();
        self.rule_sets = rebuilt;
        info!("[REGISTRY] Replaced registry with {} rule set(s)", len);
        self.emit(RegistryEvent::Replaced { len });
    }

    fn rule_set_mut(&mut self, index: usize) -> Result<&mut RuleSet, StudioError> {
        let len = self.rule_sets.len();
        self.rule_sets.get_mut(index).ok_or(StudioError::IndexOutOfRange { index, len })
    }

    pub fn insert_row(&mut self, index: usize, facet: Facet) -> Result<(), StudioError> {
        let rule_set = self.rule_set_mut(index)?;
        match facet {
            Facet::Rules => {
                if rule_set.rules.len() >= MAX_RULE_ROWS {
                    return Err(StudioError::RowLimit { facet, max: MAX_RULE_ROWS });
                }
                rule_set.rules.push(RewriteRule::default());
            }
            Facet::Abbreviations => {
                if rule_set.abbreviations.row_count() >= MAX_ABBREVIATION_ROWS {
                    return Err(StudioError::RowLimit { facet, max: MAX_ABBREVIATION_ROWS });
                }
                rule_set.abbreviations.insert_row();
            }
        }
        self.emit(RegistryEvent::RowInserted { index, facet });
        Ok(())
    }

    /// Rule tables have a fixed four-column schema, so only abbreviation grids grow sideways.
    pub fn insert_column(&mut self, index: usize, facet: Facet) -> Result<(), StudioError> {
        let rule_set = self.rule_set_mut(index)?;
        match facet {
            Facet::Rules => return Err(StudioError::UnsupportedFacetOperation(facet)),
            Facet::Abbreviations => rule_set.abbreviations.insert_column(),
        }
        self.emit(RegistryEvent::ColumnInserted { index });
        Ok(())
    }

    pub fn set_rule_cell(
        &mut self,
        index: usize,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), StudioError> {
        let rule_set = self.rule_set_mut(index)?;
        let cell = rule_set
            .rules
            .get_mut(row)
            .and_then(|rule| rule.cell_mut(column))
            .ok_or(StudioError::CellOutOfRange { facet: Facet::Rules, row, column })?;
        *cell = value.to_string();
        self.emit(RegistryEvent::CellChanged { index, facet: Facet::Rules });
        Ok(())
    }

    pub fn set_abbreviation_cell(
        &mut self,
        index: usize,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), StudioError> {
        let rule_set = self.rule_set_mut(index)?;
        let cell = rule_set.abbreviations.cell_mut(row, column).ok_or(
            StudioError::CellOutOfRange { facet: Facet::Abbreviations, row, column },
        )?;
        *cell = value.to_string();
        self.emit(RegistryEvent::CellChanged { index, facet: Facet::Abbreviations });
        Ok(())
    }

    /// Moves `rows` as one block so that the first of them lands at `target`,
    /// keeping their relative order.
    pub fn move_rows(
        &mut self,
        index: usize,
        facet: Facet,
        rows: &[usize],
        target: usize,
    ) -> Result<(), StudioError> {
        let rule_set = self.rule_set_mut(index)?;
        let moved = match facet {
            Facet::Rules => move_block(&mut rule_set.rules, rows, target),
            Facet::Abbreviations => move_block(rule_set.abbreviations.rows_mut(), rows, target),
        };
        if !moved {
            return Err(StudioError::Custom(format!(
                "Cannot move rows {:?} to {} in the {} grid",
                rows, target, facet
            )));
        }
        self.emit(RegistryEvent::RowsMoved { index, facet });
        Ok(())
    }

    pub fn set_flag(
        &mut self,
        index: usize,
        flag: SettingFlag,
        value: bool,
    ) -> Result<(), StudioError> {
        self.rule_set_mut(index)?.settings.set(flag, value);
        self.emit(RegistryEvent::SettingToggled { index, flag, value });
        Ok(())
    }

    pub fn set_rules(&mut self, index: usize, rules: Vec<RewriteRule>) -> Result<(), StudioError> {
        if rules.len() > MAX_RULE_ROWS {
            return Err(StudioError::RowLimit { facet: Facet::Rules, max: MAX_RULE_ROWS });
        }
        self.rule_set_mut(index)?.rules = rules;
        self.emit(RegistryEvent::TableLoaded { index, facet: Facet::Rules });
        Ok(())
    }

    pub fn set_abbreviations(
        &mut self,
        index: usize,
        abbreviations: AbbreviationTable,
    ) -> Result<(), StudioError> {
        if abbreviations.row_count() > MAX_ABBREVIATION_ROWS {
            return Err(StudioError::RowLimit {
                facet: Facet::Abbreviations,
                max: MAX_ABBREVIATION_ROWS,
            });
        }
        self.rule_set_mut(index)?.abbreviations = abbreviations;
        self.emit(RegistryEvent::TableLoaded { index, facet: Facet::Abbreviations });
        Ok(())
    }

    /// Rule-sets flagged `include`, in ascending index order.
    pub fn included_snapshot(&self) -> Vec<IncludedRuleSet> {
        // Positions and indices can only disagree through a bug; send nothing
        // rather than a misaligned request.
        if self.rule_sets.iter().enumerate().any(|(pos, rule_set)| rule_set.index() != pos) {
            warn!("[REGISTRY] Rule set indices are misaligned, returning empty snapshot");
            return Vec::new();
        }

        self.rule_sets
            .iter()
            .filter(|rule_set| rule_set.settings.include)
            .map(RuleSet::to_included)
            .collect()
    }

    pub fn display_names(&self) -> Vec<String> {
        self.rule_sets.iter().map(|rule_set| rule_set.display_name().to_string()).collect()
    }
}

fn move_block<T>(items: &mut Vec<T>, rows: &[usize], target: usize) -> bool {
    let mut sorted = rows.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    if sorted.is_empty()
        || sorted.len() != rows.len()
        || sorted.iter().any(|&row| row >= items.len())
        || target > items.len() - sorted.len()
    {
        return false;
    }

    let mut block = Vec::with_capacity(sorted.len());
    for &row in sorted.iter().rev() {
        block.push(items.remove(row));
    }
    block.reverse();

    for (offset, item) in block.into_iter().enumerate() {
        items.insert(target + offset, item);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        BundleEntry,
        RuleSetSettings,
    };

    fn entry(name: &str, include: bool, rule: (&str, &str)) -> BundleEntry {
        BundleEntry {
            mappings: vec![RewriteRule::new(rule.0, rule.1, "", "")],
            abbs: AbbreviationTable::new(vec![vec![format!("{name}-var"), "x".to_string()]]),
            kwargs: RuleSetSettings {
                include,
                display_name: name.to_string(),
                ..RuleSetSettings::default()
            },
        }
    }

    fn registry_with(includes: &[bool]) -> RuleSetRegistry {
        let mut registry = RuleSetRegistry::new();
        let bundle = includes
            .iter()
            .enumerate()
            .map(|(i, include)| {
                let output = i.to_string();
                entry(&format!("set{i}"), *include, ("a", output.as_str()))
            })
            .collect();
        registry.replace_all(bundle);
        registry
    }

    #[test]
    fn test_replace_all_aligns_facets_with_bundle() {
        let bundle = vec![entry("Vowels→IPA", true, ("a", "ɑ")), entry("Consonants", false, ("h", "HH"))];
        let mut registry = RuleSetRegistry::new();
        registry.seed_default();
        registry.replace_all(bundle.clone());

        assert_eq!(registry.len(), 2);
        for (j, source) in bundle.iter().enumerate() {
            let rule_set = registry.get(j).unwrap();
            assert_eq!(rule_set.index(), j);
            assert_eq!(rule_set.rules, source.mappings);
            assert_eq!(rule_set.abbreviations, source.abbs);
            assert_eq!(rule_set.settings, source.kwargs);
        }
        assert_eq!(registry.get(0).unwrap().display_name(), "Vowels→IPA");
    }

    #[test]
    fn test_replace_all_with_empty_bundle() {
        let mut registry = registry_with(&[true, true]);
        registry.replace_all(Vec::new());
        assert!(registry.is_empty());
        assert!(registry.included_snapshot().is_empty());
    }

    #[test]
    fn test_missing_display_name_gets_positional_label() {
        let mut registry = RuleSetRegistry::new();
        registry.replace_all(vec![BundleEntry::default(), BundleEntry::default()]);
        assert_eq!(registry.display_names(), vec!["Rule set 1", "Rule set 2"]);
    }

    #[test]
    fn test_snapshot_keeps_only_included_in_index_order() {
        let registry = registry_with(&[true, false, true]);
        let snapshot = registry.included_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0], registry.get(0).unwrap().to_included());
        assert_eq!(snapshot[1], registry.get(2).unwrap().to_included());
    }

    #[test]
    fn test_excluding_one_set_removes_exactly_that_entry() {
        let mut registry = registry_with(&[true, true, true]);
        let before = registry.included_snapshot();

        registry.set_flag(1, SettingFlag::Include, false).unwrap();
        let after = registry.included_snapshot();

        assert_eq!(after, vec![before[0].clone(), before[2].clone()]);
    }

    #[test]
    fn test_guard_failures_leave_registry_untouched() {
        let mut registry = registry_with(&[true]);
        let before = registry.get(0).unwrap().clone();

        assert!(matches!(
            registry.insert_row(3, Facet::Rules),
            Err(StudioError::IndexOutOfRange { index: 3, len: 1 })
        ));
        assert!(matches!(
            registry.insert_column(0, Facet::Rules),
            Err(StudioError::UnsupportedFacetOperation(Facet::Rules))
        ));
        assert!(registry.set_rule_cell(0, 5, 0, "x").is_err());
        assert!(registry.set_rule_cell(0, 0, 4, "x").is_err());

        assert_eq!(registry.get(0).unwrap(), &before);
    }

    #[test]
    fn test_row_and_column_insertion() {
        let mut registry = registry_with(&[true]);
        registry.insert_row(0, Facet::Rules).unwrap();
        registry.insert_row(0, Facet::Abbreviations).unwrap();
        registry.insert_column(0, Facet::Abbreviations).unwrap();

        let rule_set = registry.get(0).unwrap();
        assert_eq!(rule_set.rules.len(), 2);
        assert_eq!(rule_set.rules[1], RewriteRule::default());
        assert_eq!(rule_set.abbreviations.row_count(), 2);
        assert_eq!(rule_set.abbreviations.column_count(), 3);
    }

    #[test]
    fn test_rule_rows_are_capped() {
        let mut registry = registry_with(&[true]);
        for _ in 1..MAX_RULE_ROWS {
            registry.insert_row(0, Facet::Rules).unwrap();
        }
        assert!(matches!(
            registry.insert_row(0, Facet::Rules),
            Err(StudioError::RowLimit { facet: Facet::Rules, .. })
        ));
        assert_eq!(registry.get(0).unwrap().rules.len(), MAX_RULE_ROWS);
    }

    #[test]
    fn test_move_rows_as_block() {
        let mut registry = RuleSetRegistry::new();
        let rules = (0..5).map(|i| RewriteRule::new(&i.to_string(), "", "", "")).collect();
        registry.replace_all(vec![BundleEntry { mappings: rules, ..BundleEntry::default() }]);

        registry.move_rows(0, Facet::Rules, &[3, 1], 0).unwrap();
        let order: Vec<&str> =
            registry.get(0).unwrap().rules.iter().map(|r| r.input.as_str()).collect();
        assert_eq!(order, vec!["1", "3", "0", "2", "4"]);

        assert!(registry.move_rows(0, Facet::Rules, &[0, 1], 4).is_err());
        assert!(registry.move_rows(0, Facet::Rules, &[7], 0).is_err());
    }

    #[test]
    fn test_subscribers_receive_events_in_order() {
        let mut registry = RuleSetRegistry::new();
        let events = registry.subscribe();

        registry.seed_default();
        registry.set_rule_cell(0, 0, 0, "a").unwrap();
        registry.set_flag(0, SettingFlag::Reverse, true).unwrap();
        registry.insert_row(0, Facet::Abbreviations).unwrap();

        let received: Vec<RegistryEvent> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                RegistryEvent::Seeded,
                RegistryEvent::CellChanged { index: 0, facet: Facet::Rules },
                RegistryEvent::SettingToggled { index: 0, flag: SettingFlag::Reverse, value: true },
                RegistryEvent::RowInserted { index: 0, facet: Facet::Abbreviations },
            ]
        );
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let mut registry = RuleSetRegistry::new();
        drop(registry.subscribe());
        let live = registry.subscribe();
        registry.seed_default();
        assert_eq!(registry.subscribers.len(), 1);
        assert_eq!(live.try_recv().unwrap(), RegistryEvent::Seeded);
    }
}

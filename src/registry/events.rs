use super::Facet;
use crate::core::SettingFlag;

/// Change notifications published by [`super::RuleSetRegistry`] to its subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Seeded,
    Replaced { len: usize },
    CellChanged { index: usize, facet: Facet },
    RowInserted { index: usize, facet: Facet },
    ColumnInserted { index: usize },
    RowsMoved { index: usize, facet: Facet },
    SettingToggled { index: usize, flag: SettingFlag, value: bool },
    TableLoaded { index: usize, facet: Facet },
}

impl RegistryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            RegistryEvent::Seeded => "seeded",
            RegistryEvent::Replaced { .. } => "replaced",
            RegistryEvent::CellChanged { .. } => "cell_changed",
            RegistryEvent::RowInserted { .. } => "row_inserted",
            RegistryEvent::ColumnInserted { .. } => "column_inserted",
            RegistryEvent::RowsMoved { .. } => "rows_moved",
            RegistryEvent::SettingToggled { .. } => "setting_toggled",
            RegistryEvent::TableLoaded { .. } => "table_loaded",
        }
    }
}

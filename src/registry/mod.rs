use std::fmt;

pub mod events;
pub mod rule_sets;
pub mod selector;

pub use events::RegistryEvent;
pub use rule_sets::RuleSetRegistry;
pub use selector::{
    ActivePanelSelector,
    PanelGroup,
};

/// The two editable grids of a rule-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Rules,
    Abbreviations,
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Rules => write!(f, "rules"),
            Facet::Abbreviations => write!(f, "abbreviations"),
        }
    }
}

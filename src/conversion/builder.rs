use tracing::debug;

use crate::{
    protocol::types::ConversionRequest,
    registry::{
        PanelGroup,
        RegistryEvent,
        RuleSetRegistry,
    },
};

/// UI or registry happenings that may warrant a fresh conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionTrigger {
    InputChanged,
    CellChanged,
    RowsReordered,
    SettingToggled,
    PanelFocusChanged(PanelGroup),
    BundleReplaced,
}

impl ConversionTrigger {
    /// Row/column insertion and seeding are not conversion triggers.
    pub fn from_registry_event(event: &RegistryEvent) -> Option<Self> {
        match event {
            RegistryEvent::Replaced { .. } => Some(ConversionTrigger::BundleReplaced),
            RegistryEvent::CellChanged { .. } | RegistryEvent::TableLoaded { .. } => {
                Some(ConversionTrigger::CellChanged)
            }
            RegistryEvent::RowsMoved { .. } => Some(ConversionTrigger::RowsReordered),
            RegistryEvent::SettingToggled { .. } => Some(ConversionTrigger::SettingToggled),
            RegistryEvent::Seeded
            | RegistryEvent::RowInserted { .. }
            | RegistryEvent::ColumnInserted { .. } => None,
        }
    }
}

/// Turns the current input text and registry contents into a request. Holds no
/// memory of earlier requests: every qualifying trigger rebuilds from scratch.
#[derive(Debug, Clone)]
pub struct ConversionRequestBuilder {
    recompute_on_focus: bool,
}

impl Default for ConversionRequestBuilder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConversionRequestBuilder {
    pub fn new(recompute_on_focus: bool) -> Self {
        Self { recompute_on_focus }
    }

    pub fn qualifies(&self, trigger: ConversionTrigger) -> bool {
        match trigger {
            ConversionTrigger::PanelFocusChanged(_) => self.recompute_on_focus,
            _ => true,
        }
    }

    pub fn build(
        &self,
        trigger: ConversionTrigger,
        input: &str,
        registry: &RuleSetRegistry,
    ) -> Option<ConversionRequest> {
        if !self.qualifies(trigger) {
            return None;
        }

        // Nothing to convert with before the first bundle or default load.
        if registry.is_empty() {
            debug!("[CONVERT] Skipping {:?}: registry not populated", trigger);
            return None;
        }

        if input.is_empty() {
            debug!("[CONVERT] Skipping {:?}: input is empty", trigger);
            return None;
        }

        Some(ConversionRequest {
            input_string: input.to_string(),
            mappings: registry.included_snapshot(),
        })
    }
}

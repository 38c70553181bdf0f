use std::fmt;

use crate::{
    conversion::ConversionTrigger,
    core::StudioError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelGroup {
    Rules,
    Abbreviations,
    Settings,
}

impl PanelGroup {
    pub const ALL: [PanelGroup; 3] =
        [PanelGroup::Rules, PanelGroup::Abbreviations, PanelGroup::Settings];

    fn slot(&self) -> usize {
        match self {
            PanelGroup::Rules => 0,
            PanelGroup::Abbreviations => 1,
            PanelGroup::Settings => 2,
        }
    }
}

impl fmt::Display for PanelGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelGroup::Rules => f.pad("rules"),
            PanelGroup::Abbreviations => f.pad("abbreviations"),
            PanelGroup::Settings => f.pad("settings"),
        }
    }
}

/// Which rule-set each panel group is showing. The groups move independently.
#[derive(Debug, Clone, Default)]
pub struct ActivePanelSelector {
    active: [usize; 3],
    panel_count: usize,
}

impl ActivePanelSelector {
    pub fn new(panel_count: usize) -> Self {
        Self { active: [0; 3], panel_count }
    }

    /// Back to the first panel in every group, sized for a freshly built registry.
    pub fn reset(&mut self, panel_count: usize) {
        self.active = [0; 3];
        self.panel_count = panel_count;
    }

    pub fn active(&self, group: PanelGroup) -> usize {
        self.active[group.slot()]
    }

    pub fn panel_count(&self) -> usize {
        self.panel_count
    }

    /// Activation flags for every panel of `group`; exactly one is set when the
    /// group has panels.
    pub fn panels(&self, group: PanelGroup) -> Vec<bool> {
        let active = self.active(group);
        (0..self.panel_count).map(|j| j == active).collect()
    }

    /// Focuses `index` in `group`. Focus never changes what gets converted, but
    /// it still asks for a recompute.
    pub fn set_active(
        &mut self,
        group: PanelGroup,
        index: usize,
    ) -> Result<ConversionTrigger, StudioError> {
        if index >= self.panel_count {
            return Err(StudioError::IndexOutOfRange { index, len: self.panel_count });
        }
        self.active[group.slot()] = index;
        Ok(ConversionTrigger::PanelFocusChanged(group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_are_independent() {
        let mut selector = ActivePanelSelector::new(3);
        selector.set_active(PanelGroup::Rules, 2).unwrap();
        selector.set_active(PanelGroup::Settings, 1).unwrap();

        assert_eq!(selector.active(PanelGroup::Rules), 2);
        assert_eq!(selector.active(PanelGroup::Abbreviations), 0);
        assert_eq!(selector.active(PanelGroup::Settings), 1);
        assert_eq!(selector.panels(PanelGroup::Rules), vec![false, false, true]);
    }

    #[test]
    fn test_set_active_requests_recompute() {
        let mut selector = ActivePanelSelector::new(2);
        let trigger = selector.set_active(PanelGroup::Abbreviations, 1).unwrap();
        assert_eq!(trigger, ConversionTrigger::PanelFocusChanged(PanelGroup::Abbreviations));
    }

    #[test]
    fn test_out_of_range_focus_is_rejected() {
        let mut selector = ActivePanelSelector::new(2);
        selector.set_active(PanelGroup::Rules, 1).unwrap();
        assert!(selector.set_active(PanelGroup::Rules, 2).is_err());
        assert_eq!(selector.active(PanelGroup::Rules), 1);
    }

    #[test]
    fn test_reset_returns_every_group_to_first_panel() {
        let mut selector = ActivePanelSelector::new(4);
        for group in PanelGroup::ALL {
            selector.set_active(group, 3).unwrap();
        }
        selector.reset(2);
        for group in PanelGroup::ALL {
            assert_eq!(selector.active(group), 0);
            assert_eq!(selector.panels(group), vec![true, false]);
        }
    }
}

pub mod errors;
pub mod http;
pub mod models;

pub use errors::StudioError;
pub use models::{
    AbbreviationTable,
    BundleEntry,
    IncludedRuleSet,
    RewriteRule,
    RuleSet,
    RuleSetBundle,
    RuleSetSettings,
    SettingFlag,
    SettingsFlags,
};

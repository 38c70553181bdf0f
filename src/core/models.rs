use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};

pub const RULE_COLUMNS: [&str; 4] = ["In", "Out", "Context Before", "Context After"];

pub const MAX_RULE_ROWS: usize = 250;
pub const MAX_ABBREVIATION_ROWS: usize = 150;

pub const DEFAULT_RULE_ROWS: usize = 10;
pub const DEFAULT_ABBREVIATION_ROWS: usize = 10;
pub const DEFAULT_DISPLAY_NAME: &str = "Custom";
pub const DEFAULT_VARIABLE_ROW: [&str; 6] = ["Vowels", "a", "e", "i", "o", "u"];

/// One input -> output mapping. Its position in the owning table is the order
/// in which the engine applies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRule")]
pub struct RewriteRule {
    #[serde(rename = "in")]
    pub input: String,
    #[serde(rename = "out")]
    pub output: String,
    pub context_before: String,
    pub context_after: String,
}

// The engine sends keyed rows, the grid hands back positional ones; cells may be null.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawRule {
    Keyed {
        #[serde(rename = "in", default, deserialize_with = "nullable")]
        input: String,
        #[serde(rename = "out", default, deserialize_with = "nullable")]
        output: String,
        #[serde(default, deserialize_with = "nullable")]
        context_before: String,
        #[serde(default, deserialize_with = "nullable")]
        context_after: String,
    },
    Row(Vec<Option<String>>),
}

impl From<RawRule> for RewriteRule {
    fn from(raw: RawRule) -> Self {
        match raw {
            RawRule::Keyed { input, output, context_before, context_after } => {
                RewriteRule { input, output, context_before, context_after }
            }
            RawRule::Row(cells) => {
                let cells: Vec<String> = cells.into_iter().map(Option::unwrap_or_default).collect();
                RewriteRule::from_row(&cells)
            }
        }
    }
}

// Explicit `null` reads the same as a missing key.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn true_if_null<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

impl RewriteRule {
    pub fn new(input: &str, output: &str, context_before: &str, context_after: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            context_before: context_before.to_string(),
            context_after: context_after.to_string(),
        }
    }

    /// Missing trailing cells are treated as empty, extra cells are dropped.
    pub fn from_row(cells: &[String]) -> Self {
        let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
        Self { input: cell(0), output: cell(1), context_before: cell(2), context_after: cell(3) }
    }

    pub fn to_row(&self) -> [String; 4] {
        [
            self.input.clone(),
            self.output.clone(),
            self.context_before.clone(),
            self.context_after.clone(),
        ]
    }

    pub fn cell_mut(&mut self, column: usize) -> Option<&mut String> {
        match column {
            0 => Some(&mut self.input),
            1 => Some(&mut self.output),
            2 => Some(&mut self.context_before),
            3 => Some(&mut self.context_after),
            _ => None,
        }
    }
}

/// Variable/abbreviation grid. Rows are kept rectangular: ragged input is padded
/// with empty cells up to the widest row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Vec<Vec<Option<String>>>")]
pub struct AbbreviationTable {
    rows: Vec<Vec<String>>,
}

impl From<Vec<Vec<Option<String>>>> for AbbreviationTable {
    fn from(rows: Vec<Vec<Option<String>>>) -> Self {
        AbbreviationTable::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
                .collect(),
        )
    }
}

impl Serialize for AbbreviationTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows.serialize(serializer)
    }
}

impl AbbreviationTable {
    pub fn new(mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, String::new());
        }
        Self { rows }
    }

    /// The grid a fresh session starts with: the vowel class followed by blank rows.
    pub fn seeded() -> Self {
        let width = DEFAULT_VARIABLE_ROW.len();
        let mut rows: Vec<Vec<String>> =
            vec![DEFAULT_VARIABLE_ROW.iter().map(|s| s.to_string()).collect()];
        rows.extend((0..DEFAULT_ABBREVIATION_ROWS).map(|_| vec![String::new(); width]));
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn insert_row(&mut self) {
        let width = self.column_count().max(1);
        self.rows.push(vec![String::new(); width]);
    }

    pub fn insert_column(&mut self) {
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        for row in self.rows.iter_mut() {
            row.push(String::new());
        }
    }

    pub fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut String> {
        self.rows.get_mut(row).and_then(|r| r.get_mut(column))
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<String>> {
        &mut self.rows
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingFlag {
    Include,
    AsIs,
    CaseSensitive,
    EscapeSpecial,
    Reverse,
}

impl SettingFlag {
    pub const ALL: [SettingFlag; 5] = [
        SettingFlag::Include,
        SettingFlag::AsIs,
        SettingFlag::CaseSensitive,
        SettingFlag::EscapeSpecial,
        SettingFlag::Reverse,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            SettingFlag::Include => "include",
            SettingFlag::AsIs => "as_is",
            SettingFlag::CaseSensitive => "case_sensitive",
            SettingFlag::EscapeSpecial => "escape_special",
            SettingFlag::Reverse => "reverse",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingFlag::Include => "Include rules in output",
            SettingFlag::AsIs => "Leave order as is",
            SettingFlag::CaseSensitive => "Rules are case sensitive",
            SettingFlag::EscapeSpecial => "Escape special characters",
            SettingFlag::Reverse => "Reverse the rules",
        }
    }
}

/// Per rule-set processing options. Only `include` is interpreted client side;
/// the rest travel to the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSetSettings {
    #[serde(default = "default_true", deserialize_with = "true_if_null")]
    pub include: bool,
    #[serde(default = "default_true", deserialize_with = "true_if_null")]
    pub as_is: bool,
    #[serde(default = "default_true", deserialize_with = "true_if_null")]
    pub case_sensitive: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub escape_special: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub reverse: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub display_name: String,
}

impl Default for RuleSetSettings {
    fn default() -> Self {
        Self {
            include: true,
            as_is: true,
            case_sensitive: true,
            escape_special: false,
            reverse: false,
            display_name: String::new(),
        }
    }
}

impl RuleSetSettings {
    pub fn get(&self, flag: SettingFlag) -> bool {
        match flag {
            SettingFlag::Include => self.include,
            SettingFlag::AsIs => self.as_is,
            SettingFlag::CaseSensitive => self.case_sensitive,
            SettingFlag::EscapeSpecial => self.escape_special,
            SettingFlag::Reverse => self.reverse,
        }
    }

    pub fn set(&mut self, flag: SettingFlag, value: bool) {
        match flag {
            SettingFlag::Include => self.include = value,
            SettingFlag::AsIs => self.as_is = value,
            SettingFlag::CaseSensitive => self.case_sensitive = value,
            SettingFlag::EscapeSpecial => self.escape_special = value,
            SettingFlag::Reverse => self.reverse = value,
        }
    }

    pub fn flags(&self) -> SettingsFlags {
        SettingsFlags {
            as_is: self.as_is,
            case_sensitive: self.case_sensitive,
            escape_special: self.escape_special,
            reverse: self.reverse,
            include: self.include,
        }
    }
}

/// The settings as forwarded to the engine (no display name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsFlags {
    pub as_is: bool,
    pub case_sensitive: bool,
    pub escape_special: bool,
    pub reverse: bool,
    pub include: bool,
}

/// One entry of a server-pushed bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(default, deserialize_with = "nullable")]
    pub mappings: Vec<RewriteRule>,
    #[serde(default, deserialize_with = "nullable")]
    pub abbs: AbbreviationTable,
    #[serde(default, deserialize_with = "nullable")]
    pub kwargs: RuleSetSettings,
}

pub type RuleSetBundle = Vec<BundleEntry>;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    index: usize,
    pub rules: Vec<RewriteRule>,
    pub abbreviations: AbbreviationTable,
    pub settings: RuleSetSettings,
}

impl RuleSet {
    pub(crate) fn from_entry(index: usize, entry: BundleEntry) -> Self {
        let mut settings = entry.kwargs;
        if settings.display_name.is_empty() {
            settings.display_name = format!("Rule set {}", index + 1);
        }
        Self { index, rules: entry.mappings, abbreviations: entry.abbs, settings }
    }

    pub(crate) fn seeded() -> Self {
        Self {
            index: 0,
            rules: vec![RewriteRule::default(); DEFAULT_RULE_ROWS],
            abbreviations: AbbreviationTable::seeded(),
            settings: RuleSetSettings {
                display_name: DEFAULT_DISPLAY_NAME.to_string(),
                ..RuleSetSettings::default()
            },
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn display_name(&self) -> &str {
        &self.settings.display_name
    }

    pub fn to_included(&self) -> IncludedRuleSet {
        IncludedRuleSet {
            mapping: self.rules.iter().map(RewriteRule::to_row).collect(),
            abbreviations: self.abbreviations.rows().to_vec(),
            kwargs: self.settings.flags(),
        }
    }
}

/// A rule-set as it appears in the `mappings` list of a conversion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedRuleSet {
    pub mapping: Vec<[String; 4]>,
    pub abbreviations: Vec<Vec<String>>,
    pub kwargs: SettingsFlags,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_rows_accept_keyed_and_positional_shapes() {
        let keyed: RewriteRule = serde_json::from_str(
            r#"{"in": "a", "out": "ɑ", "context_before": null, "context_after": "b"}"#,
        )
        .unwrap();
        assert_eq!(keyed, RewriteRule::new("a", "ɑ", "", "b"));

        let positional: RewriteRule = serde_json::from_str(r#"["e", "ɛ", null]"#).unwrap();
        assert_eq!(positional, RewriteRule::new("e", "ɛ", "", ""));

        let sparse: RewriteRule = serde_json::from_str(r#"{"in": "x"}"#).unwrap();
        assert_eq!(sparse, RewriteRule::new("x", "", "", ""));
    }

    #[test]
    fn test_rule_serializes_with_wire_keys() {
        let json = serde_json::to_value(RewriteRule::new("h", "HH", "^", "")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"in": "h", "out": "HH", "context_before": "^", "context_after": ""})
        );
    }

    #[test]
    fn test_abbreviation_grid_is_padded_and_nulls_cleared() {
        let table: AbbreviationTable =
            serde_json::from_str(r#"[["Vowels", "a", null], ["C"]]"#).unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.rows()[0], vec!["Vowels", "a", ""]);
        assert_eq!(table.rows()[1], vec!["C", "", ""]);
    }

    #[test]
    fn test_abbreviation_insertions() {
        let mut table = AbbreviationTable::default();
        table.insert_column();
        assert_eq!((table.row_count(), table.column_count()), (1, 1));
        table.insert_row();
        table.insert_column();
        assert_eq!((table.row_count(), table.column_count()), (2, 2));
        assert!(table.rows().iter().all(|row| row.len() == 2));
    }

    #[test]
    fn test_seeded_rule_set() {
        let seeded = RuleSet::seeded();
        assert_eq!(seeded.index(), 0);
        assert_eq!(seeded.rules.len(), DEFAULT_RULE_ROWS);
        assert_eq!(seeded.abbreviations.row_count(), DEFAULT_ABBREVIATION_ROWS + 1);
        assert_eq!(seeded.abbreviations.rows()[0], DEFAULT_VARIABLE_ROW.to_vec());
        assert_eq!(seeded.display_name(), DEFAULT_DISPLAY_NAME);
        assert!(seeded.settings.include && seeded.settings.as_is && seeded.settings.case_sensitive);
        assert!(!seeded.settings.escape_special && !seeded.settings.reverse);
    }

    #[test]
    fn test_kwargs_defaults_and_unknown_keys() {
        let settings: RuleSetSettings =
            serde_json::from_str(r#"{"reverse": true, "display_name": "Vowels→IPA", "type": "x"}"#)
                .unwrap();
        assert!(settings.include);
        assert!(settings.reverse);
        assert_eq!(settings.display_name, "Vowels→IPA");
    }

    #[test]
    fn test_bundle_with_null_fields_decodes_to_defaults() {
        let bundle: RuleSetBundle = serde_json::from_value(serde_json::json!([
            {
                "mappings": [],
                "abbs": [],
                "kwargs": {"display_name": null, "include": true, "reverse": null, "as_is": null}
            },
            {"mappings": null, "abbs": null, "kwargs": null}
        ]))
        .unwrap();

        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle[0].kwargs, RuleSetSettings::default());
        assert_eq!(bundle[1], BundleEntry::default());

        let rule_set = RuleSet::from_entry(1, bundle[1].clone());
        assert_eq!(rule_set.display_name(), "Rule set 2");
        assert!(rule_set.settings.include);
    }

    #[test]
    fn test_setting_flag_keys() {
        for flag in SettingFlag::ALL {
            assert_eq!(SettingFlag::from_key(flag.key()), Some(flag));
        }
        assert_eq!(SettingFlag::from_key("display_name"), None);
    }
}

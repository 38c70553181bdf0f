use std::path::PathBuf;

use crate::{
    core::{
        SettingFlag,
        StudioError,
    },
    languages::LanguagePair,
    registry::{
        ActivePanelSelector,
        Facet,
        PanelGroup,
    },
    session::{
        StudioView,
        UiCommand,
    },
};

pub const HELP: &str = "\
Type text to convert it. Commands:
  :lang <in-to-out|custom>        request the rule sets for a language pair
  :in <lang> / :out <lang>        pick input / output language
  :rule <row> <col> [value]       edit a cell of the active rule table
  :abb <row> <col> [value]        edit a cell of the active abbreviation grid
  :add-row rules|abbs             append a row
  :add-col                        append an abbreviation column
  :move rules|abbs <r1,r2> <to>   move rows
  :set <flag> on|off              flags: include as_is case_sensitive escape_special reverse
  :show rules|abbs|settings <n>   focus a panel
  :export rules|abbs [dir]        write CSV
  :import rules|abbs <path>       load CSV
  :quit";

fn parse_facet(word: Option<&str>) -> Result<Facet, StudioError> {
    match word {
        Some("rules") => Ok(Facet::Rules),
        Some("abbs") | Some("abbreviations") => Ok(Facet::Abbreviations),
        other => Err(StudioError::Custom(format!("Unknown table: {}", other.unwrap_or("")))),
    }
}

fn parse_group(word: Option<&str>) -> Result<PanelGroup, StudioError> {
    match word {
        Some("settings") => Ok(PanelGroup::Settings),
        other => parse_facet(other).map(|facet| match facet {
            Facet::Rules => PanelGroup::Rules,
            Facet::Abbreviations => PanelGroup::Abbreviations,
        }),
    }
}

fn parse_number(word: Option<&str>) -> Result<usize, StudioError> {
    let word = word.ok_or_else(|| StudioError::Custom("Missing number".to_string()))?;
    word.parse().map_err(|_| StudioError::Custom(format!("Not a number: {}", word)))
}

fn parse_switch(word: Option<&str>) -> Result<bool, StudioError> {
    match word {
        Some("on") | Some("true") => Ok(true),
        Some("off") | Some("false") => Ok(false),
        other => Err(StudioError::Custom(format!("Expected on/off, got {}", other.unwrap_or("")))),
    }
}

fn required<'a>(word: Option<&'a str>, what: &str) -> Result<&'a str, StudioError> {
    word.ok_or_else(|| StudioError::Custom(format!("Missing {}", what)))
}

/// Lines starting with `:` are commands; anything else replaces the input text.
pub fn parse_command(line: &str) -> Result<UiCommand, StudioError> {
    let Some(command) = line.strip_prefix(':') else {
        return Ok(UiCommand::SetInput(line.to_string()));
    };

    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    let mut words = rest.split_whitespace();

    let parsed = match name {
        "quit" | "q" => UiCommand::Quit,
        "lang" => UiCommand::SelectPair(LanguagePair::parse(required(words.next(), "language pair")?)),
        "in" => UiCommand::SelectInputLanguage(required(words.next(), "language")?.to_string()),
        "out" => UiCommand::SelectOutputLanguage(required(words.next(), "language")?.to_string()),
        "rule" | "abb" => {
            let mut parts = rest.splitn(3, ' ');
            let row = parse_number(parts.next())?;
            let column = parse_number(parts.next())?;
            let value = parts.next().unwrap_or("").to_string();
            if name == "rule" {
                UiCommand::SetRuleCell { row, column, value }
            } else {
                UiCommand::SetAbbreviationCell { row, column, value }
            }
        }
        "add-row" => UiCommand::InsertRow(parse_facet(words.next())?),
        "add-col" => UiCommand::InsertColumn,
        "move" => {
            let facet = parse_facet(words.next())?;
            let rows = required(words.next(), "rows")?
                .split(',')
                .map(|row| parse_number(Some(row.trim())))
                .collect::<Result<Vec<_>, _>>()?;
            let target = parse_number(words.next())?;
            UiCommand::MoveRows { facet, rows, target }
        }
        "set" => {
            let key = required(words.next(), "flag")?;
            let flag = SettingFlag::from_key(key)
                .ok_or_else(|| StudioError::Custom(format!("Unknown flag: {}", key)))?;
            UiCommand::ToggleSetting { flag, value: parse_switch(words.next())? }
        }
        "show" => {
            let group = parse_group(words.next())?;
            UiCommand::Focus { group, index: parse_number(words.next())? }
        }
        "export" => UiCommand::Export {
            facet: parse_facet(words.next())?,
            dir: words.next().map(PathBuf::from),
        },
        "import" => UiCommand::Import {
            facet: parse_facet(words.next())?,
            path: PathBuf::from(required(words.next(), "path")?),
        },
        other => return Err(StudioError::Custom(format!("Unknown command: :{}", other))),
    };
    Ok(parsed)
}

/// Prints session state to stdout.
#[derive(Default)]
pub struct ConsoleView;

impl StudioView for ConsoleView {
    fn show_output(&mut self, output: &str) {
        println!("=> {}", output);
    }

    fn show_status(&mut self, status: &str) {
        println!("{}", status);
    }

    fn rebuild_panels(&mut self, display_names: &[String], selector: &ActivePanelSelector) {
        for group in PanelGroup::ALL {
            let labels: Vec<String> = display_names
                .iter()
                .zip(selector.panels(group))
                .map(|(name, active)| if active { format!("[{}]", name) } else { name.clone() })
                .collect();
            println!("{:>13}: {}", group, labels.join(" | "));
        }
    }

    fn show_error(&mut self, error: &StudioError) {
        eprintln!("! {}", error);
    }
}

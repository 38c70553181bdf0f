use std::{
    borrow::Cow,
    fs::{
        self,
        File,
    },
    io::{
        BufWriter,
        Write,
    },
    mem,
    path::{
        Path,
        PathBuf,
    },
};

use crate::{
    core::{
        models::RULE_COLUMNS,
        AbbreviationTable,
        RewriteRule,
        StudioError,
    },
    registry::Facet,
};

pub fn export_file_name(facet: Facet) -> &'static str {
    match facet {
        Facet::Rules => "rules.csv",
        Facet::Abbreviations => "abbreviations.csv",
    }
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn push_record<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let line: Vec<Cow<'_, str>> = fields.into_iter().map(escape_field).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Rule table as CSV, headed by the four column titles.
pub fn rules_to_csv(rules: &[RewriteRule]) -> String {
    let mut out = String::new();
    push_record(&mut out, RULE_COLUMNS);
    for rule in rules {
        push_record(
            &mut out,
            [
                rule.input.as_str(),
                rule.output.as_str(),
                rule.context_before.as_str(),
                rule.context_after.as_str(),
            ],
        );
    }
    out
}

/// Abbreviation grid as raw CSV rows; there is no header.
pub fn abbreviations_to_csv(table: &AbbreviationTable) -> String {
    let mut out = String::new();
    for row in table.rows() {
        push_record(&mut out, row.iter().map(String::as_str));
    }
    out
}

pub fn parse_records(text: &str) -> Result<Vec<Vec<String>>, StudioError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut after_quote = false;
    let mut pending = false;
    let mut line = 1;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => {
                    in_quotes = false;
                    after_quote = true;
                }
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        // A closing quote must end the field.
        if after_quote && !matches!(c, ',' | '\n' | '\r') {
            return Err(StudioError::Csv {
                line,
                message: "unexpected text after a quoted field".to_string(),
            });
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                pending = true;
            }
            '"' => {
                return Err(StudioError::Csv {
                    line,
                    message: "quote inside an unquoted field".to_string(),
                })
            }
            ',' => {
                record.push(mem::take(&mut field));
                after_quote = false;
                pending = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\r' if after_quote => {
                return Err(StudioError::Csv {
                    line,
                    message: "unexpected text after a quoted field".to_string(),
                })
            }
            '\n' => {
                after_quote = false;
                record.push(mem::take(&mut field));
                records.push(mem::take(&mut record));
                pending = false;
                line += 1;
            }
            _ => {
                field.push(c);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err(StudioError::Csv { line, message: "unterminated quoted field".to_string() });
    }
    if pending {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

/// Reads rows back into rules. A leading header row is skipped.
pub fn rules_from_csv(text: &str) -> Result<Vec<RewriteRule>, StudioError> {
    let mut records = parse_records(text)?;
    if records.first().is_some_and(|first| first.iter().map(String::as_str).eq(RULE_COLUMNS)) {
        records.remove(0);
    }

    records
        .into_iter()
        .enumerate()
        .map(|(row, cells)| {
            if cells.len() > RULE_COLUMNS.len() {
                return Err(StudioError::Csv {
                    line: row + 1,
                    message: format!("expected at most 4 columns, found {}", cells.len()),
                });
            }
            Ok(RewriteRule::from_row(&cells))
        })
        .collect()
}

pub fn abbreviations_from_csv(text: &str) -> Result<AbbreviationTable, StudioError> {
    Ok(AbbreviationTable::new(parse_records(text)?))
}

pub fn write_export(dir: &Path, facet: Facet, contents: &str) -> Result<PathBuf, StudioError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(facet));

    let file = File::create(&path)
        .map_err(|e| StudioError::Custom(format!("Failed to create CSV file: {}", e)))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(contents.as_bytes())
        .map_err(|e| StudioError::Custom(format!("Failed to write CSV file: {}", e)))?;
    writer.flush().map_err(|e| StudioError::Custom(format!("Failed to flush CSV file: {}", e)))?;

    Ok(path)
}

//! Row builder: one assembled row to one [`FileRecord`], including date repair.

use log::warn;
use std::collections::HashSet;

use crate::FileRecord;
use crate::engine::dates::normalize_date;

use super::header::{Field, HeaderMap};

/// State of one date column while a row is being built.
#[derive(Clone, Debug, PartialEq, Eq)]
enum DateSlot {
    /// No column, or an empty value.
    Unset,
    Parsed(String),
    /// Auto-correct kept the raw value for reconciliation.
    Unparsed(String),
}

impl DateSlot {
    fn parsed(&self) -> Option<&str> {
        match self {
            DateSlot::Parsed(v) => Some(v),
            _ => None,
        }
    }
}

/// Why a row could not become a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RowError {
    /// The line is invalid; the reason is for diagnostics.
    Invalid(String),
    MissingPath,
    UnparseableDates,
}

#[derive(Debug)]
pub struct BuiltRow {
    pub record: FileRecord,
    /// Required values that were empty and not tolerated.
    pub potentially_invalid: Vec<Field>,
}

pub struct RowBuilder<'a> {
    header: &'a HeaderMap,
    ignore: &'a HashSet<Field>,
    auto_correct: bool,
}

impl<'a> RowBuilder<'a> {
    pub fn new(header: &'a HeaderMap, ignore: &'a HashSet<Field>, auto_correct: bool) -> Self {
        Self {
            header,
            ignore,
            auto_correct,
        }
    }

    pub fn build(&self, fields: &[String]) -> Result<BuiltRow, RowError> {
        let mut record = FileRecord::default();
        let mut created = DateSlot::Unset;
        let mut last_changed = DateSlot::Unset;
        let mut potentially_invalid = Vec::new();

        for &(field, col) in self.header.columns() {
            let value = fields.get(col).map(|v| v.trim()).unwrap_or("");
            if value.is_empty() {
                if field == Field::Path {
                    return Err(RowError::MissingPath);
                }
                if !self.ignore.contains(&field) {
                    potentially_invalid.push(field);
                }
                continue;
            }
            match field {
                Field::Name => record.name = Some(value.to_string()),
                Field::Path => record.path = value.to_string(),
                Field::Size => {
                    if record.set_size(value).is_none() {
                        return Err(RowError::Invalid(format!(
                            "could not set field 'size' from '{value}'"
                        )));
                    }
                }
                Field::Created => created = self.date_slot(field, value)?,
                Field::LastChanged => last_changed = self.date_slot(field, value)?,
                Field::ResourceType => record.resource_type = Some(value.to_string()),
                Field::Catalog => record.catalog = Some(value.to_string()),
                Field::Volume => record.volume = Some(value.to_string()),
            }
        }

        let (c, l) = self.reconcile(created, last_changed)?;
        record.created = c;
        record.last_changed = l;
        Ok(BuiltRow {
            record,
            potentially_invalid,
        })
    }

    fn date_slot(&self, field: Field, value: &str) -> Result<DateSlot, RowError> {
        match normalize_date(value) {
            Some(v) => Ok(DateSlot::Parsed(v)),
            None if self.auto_correct => Ok(DateSlot::Unparsed(value.to_string())),
            None => Err(RowError::Invalid(format!(
                "could not set field '{}' from '{}'",
                field.key(),
                value
            ))),
        }
    }

    /// Runs once both slots are final, so the outcome does not depend on column order.
    fn reconcile(
        &self,
        created: DateSlot,
        last_changed: DateSlot,
    ) -> Result<(Option<String>, Option<String>), RowError> {
        let any_unparsed = matches!(created, DateSlot::Unparsed(_))
            || matches!(last_changed, DateSlot::Unparsed(_));
        if !any_unparsed {
            return Ok((
                created.parsed().map(str::to_string),
                last_changed.parsed().map(str::to_string),
            ));
        }
        if let Some(v) = created.parsed().or(last_changed.parsed()) {
            let v = v.to_string();
            warn!("auto-correct: copying date '{}' into the unparseable column", v);
            return Ok((Some(v.clone()), Some(v)));
        }
        if self.ignore.contains(&Field::Created) || self.ignore.contains(&Field::LastChanged) {
            return Ok((None, None));
        }
        Err(RowError::UnparseableDates)
    }
}

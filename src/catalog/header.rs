//! Header line: column names to record fields.

use log::info;
use std::path::Path;

use crate::FieldSet;
use crate::error::IngestError;

/// Record fields a catalog column can provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Path,
    Size,
    Created,
    LastChanged,
    ResourceType,
    Catalog,
    Volume,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Path,
        Field::Size,
        Field::Created,
        Field::LastChanged,
        Field::ResourceType,
        Field::Catalog,
        Field::Volume,
    ];

    /// Document field name; also what `--ignore` accepts.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Path => "path",
            Field::Size => "size",
            Field::Created => "created",
            Field::LastChanged => "lastChanged",
            Field::ResourceType => "resourceType",
            Field::Catalog => "catalog",
            Field::Volume => "volume",
        }
    }

    /// Accepted header spellings, German export first.
    pub fn tokens(self) -> &'static [&'static str] {
        match self {
            Field::Name => &["Name"],
            Field::Path => &["Pfad", "Path"],
            Field::Size => &["Größe", "Size"],
            Field::Created => &["Erstelldatum", "Date Created"],
            Field::LastChanged => &["Änderungsdatum", "Date Modified"],
            Field::ResourceType => &["Art", "Kind", "Media-Info"],
            Field::Catalog => &["Katalog", "Catalog"],
            Field::Volume => &["Name des Volumes", "Volume"],
        }
    }

    /// Case-insensitive lookup by [`Field::key`].
    pub fn from_key(s: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.key().eq_ignore_ascii_case(s.trim()))
    }
}

impl FieldSet {
    pub fn required(self) -> &'static [Field] {
        match self {
            FieldSet::Full => &[
                Field::Name,
                Field::Path,
                Field::Size,
                Field::Created,
                Field::LastChanged,
                Field::ResourceType,
            ],
            FieldSet::Minimal => &[Field::Path, Field::Volume],
        }
    }
}

/// Which column feeds which field, plus the number of columns a data row must have.
#[derive(Clone, Debug)]
pub struct HeaderMap {
    columns: Vec<(Field, usize)>,
    width: usize,
}

impl HeaderMap {
    /// Map a header line. Fails when a field required by `field_set` has no column.
    pub fn parse(line: &str, file: &Path, field_set: FieldSet) -> Result<Self, IngestError> {
        let line = line.trim_start_matches('\u{feff}').trim_end_matches('\r');
        let names: Vec<&str> = line.split('\t').map(str::trim).collect();

        let mut columns = Vec::new();
        for field in Field::ALL {
            let found = field
                .tokens()
                .iter()
                .find_map(|t| names.iter().position(|n| n == t));
            if let Some(col) = found {
                info!("Column providing field '{}': {}", field.key(), names[col]);
                columns.push((field, col));
            }
        }

        let missing: Vec<&'static str> = field_set
            .required()
            .iter()
            .filter(|f| !columns.iter().any(|(c, _)| c == *f))
            .map(|f| f.key())
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns {
                file: file.to_path_buf(),
                fields: missing,
            });
        }
        Ok(Self {
            columns,
            width: names.len(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn columns(&self) -> &[(Field, usize)] {
        &self.columns
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.iter().any(|(f, _)| *f == field)
    }
}

//! Immutable schema registry: which entity type decodes which bundle file.
//!
//! Built once at startup and shared by reference (`Arc`) with every file task.
//! Each entry carries a monomorphised decode function, so every line decodes
//! into a freshly allocated instance; nothing is reused between records.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DecodeError, RegistryError};
use crate::model::aws::{Account, Group, Organization, Role, User};
use crate::model::entra::{Application, Device};
use crate::model::{project, Label, Node, Properties};

/// File extensions recognised as newline-delimited JSON.
pub const RECORD_EXTENSIONS: &[&str] = &["json", "jsonl", "ndjson"];

/// One decoded input line, ready to be written.
#[derive(Debug)]
pub struct DecodedRecord {
    pub label: Label,
    pub identity: String,
    pub properties: Properties,
    pub entity: Box<dyn Node>,
}

type DecodeFn = fn(Label, &str) -> Result<DecodedRecord, DecodeError>;

fn decode_as<T>(label: Label, line: &str) -> Result<DecodedRecord, DecodeError>
where
    T: Node + Serialize + DeserializeOwned + 'static,
{
    let entity: T = serde_json::from_str(line)?;
    // Kept verbatim: derived edges reference the same raw value.
    if entity.identity().trim().is_empty() {
        return Err(DecodeError::MissingIdentity { label });
    }
    let identity = entity.identity().to_string();
    let properties = project(&entity)?.ok_or(DecodeError::NotAnObject { label })?;
    Ok(DecodedRecord {
        label,
        identity,
        properties,
        entity: Box::new(entity),
    })
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    /// Bundle file stem, e.g. `accounts` for `accounts.json`.
    pub file_stem: &'static str,
    pub label: Label,
    pub general_label: Label,
    decode: DecodeFn,
}

impl RegistryEntry {
    /// Labels attached to nodes of this type, specific label first.
    pub fn labels(&self) -> [Label; 2] {
        [self.label, self.general_label]
    }

    pub fn decode(&self, line: &str) -> Result<DecodedRecord, DecodeError> {
        (self.decode)(self.label, line)
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    entries: Vec<RegistryEntry>,
}

impl SchemaRegistryBuilder {
    pub fn register<T>(
        mut self,
        file_stem: &'static str,
        label: Label,
        general_label: Label,
    ) -> Result<Self, RegistryError>
    where
        T: Node + Serialize + DeserializeOwned + 'static,
    {
        if self.entries.iter().any(|e| e.label == label) {
            return Err(RegistryError::DuplicateLabel(label));
        }
        if self
            .entries
            .iter()
            .any(|e| e.file_stem.eq_ignore_ascii_case(file_stem))
        {
            return Err(RegistryError::DuplicateFileStem(file_stem));
        }
        self.entries.push(RegistryEntry {
            file_stem,
            label,
            general_label,
            decode: decode_as::<T>,
        });
        Ok(self)
    }

    pub fn build(mut self) -> SchemaRegistry {
        self.entries.sort_by_key(|e| e.label);
        SchemaRegistry {
            entries: self.entries,
        }
    }
}

#[derive(Debug)]
pub struct SchemaRegistry {
    entries: Vec<RegistryEntry>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Every entity type the collectors produce.
    pub fn standard() -> Result<Self, RegistryError> {
        Ok(Self::builder()
            .register::<Organization>("organizations", Label::Organization, Label::Resource)?
            .register::<Account>("accounts", Label::Account, Label::Resource)?
            .register::<User>("users", Label::User, Label::Principal)?
            .register::<Role>("roles", Label::Role, Label::Principal)?
            .register::<Group>("groups", Label::Group, Label::Principal)?
            .register::<Application>("applications", Label::Application, Label::Resource)?
            .register::<Device>("devices", Label::Device, Label::Resource)?
            .build())
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn get(&self, label: Label) -> Option<&RegistryEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// Look up a label by name. Unknown names are configuration errors.
    pub fn resolve(&self, name: &str) -> Result<&RegistryEntry, RegistryError> {
        Label::parse(name)
            .and_then(|label| self.get(label))
            .ok_or_else(|| RegistryError::UnknownLabel(name.to_string()))
    }

    /// Entry for a bundle file, matched on its stem (or label name) and extension.
    pub fn match_file(&self, path: &Path) -> Option<&RegistryEntry> {
        let extension = path.extension()?.to_str()?;
        if !RECORD_EXTENSIONS
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
        {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        self.entries.iter().find(|e| {
            e.file_stem.eq_ignore_ascii_case(stem) || e.label.as_str().eq_ignore_ascii_case(stem)
        })
    }
}

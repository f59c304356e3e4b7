//! Named, reusable gates and the store that persists them.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    codec::CompositeDocument,
    geometry::Point,
    pieces::{CompositeGate, LogicGate, Piece},
    signal::Signal,
    truth_table::TruthTable,
    Circuit, PieceId, Result,
};

/// A saved module: either a truth table or a whole embedded circuit.
///
/// Records are written with a `kind` tag. Records without one are recognised by
/// their fields, so plain `{name, numInputs, numOutputs, truthTable, label}`
/// tables load as well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", from = "StoredRecord")]
pub enum ModuleRecord {
    #[serde(rename_all = "camelCase")]
    Table {
        name: String,
        label: String,
        num_inputs: usize,
        num_outputs: usize,
        truth_table: Vec<Signal>,
    },
    Composite {
        name: String,
        #[serde(flatten)]
        gate: CompositeDocument,
    },
}

/// Any record as found on disk, tagged or not. A composite is told apart by its sub-circuit.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Composite {
        name: String,
        #[serde(flatten)]
        gate: CompositeDocument,
    },
    #[serde(rename_all = "camelCase")]
    Table {
        name: String,
        #[serde(default)]
        label: String,
        num_inputs: usize,
        num_outputs: usize,
        truth_table: Vec<Signal>,
    },
}

impl From<StoredRecord> for ModuleRecord {
    fn from(record: StoredRecord) -> Self {
        match record {
            StoredRecord::Composite { name, gate } => ModuleRecord::Composite { name, gate },
            StoredRecord::Table {
                name,
                label,
                num_inputs,
                num_outputs,
                truth_table,
            } => ModuleRecord::Table {
                label: if label.is_empty() { name.clone() } else { label },
                name,
                num_inputs,
                num_outputs,
                truth_table,
            },
        }
    }
}

impl ModuleRecord {
    pub fn from_table(name: &str, table: &TruthTable) -> Self {
        ModuleRecord::Table {
            name: name.to_string(),
            label: name.to_string(),
            num_inputs: table.num_inputs(),
            num_outputs: table.num_outputs(),
            truth_table: table.rows().to_vec(),
        }
    }

    pub fn from_composite(name: &str, gate: &CompositeGate) -> Self {
        let mut gate = gate.to_document();
        gate.label = name.to_string();
        ModuleRecord::Composite {
            name: name.to_string(),
            gate,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ModuleRecord::Table { name, .. } | ModuleRecord::Composite { name, .. } => name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ModuleRecord::Table { label, .. } => label,
            ModuleRecord::Composite { gate, .. } => &gate.label,
        }
    }

    pub fn num_inputs(&self) -> usize {
        match self {
            ModuleRecord::Table { num_inputs, .. } => *num_inputs,
            ModuleRecord::Composite { gate, .. } => gate.num_inputs,
        }
    }

    pub fn num_outputs(&self) -> usize {
        match self {
            ModuleRecord::Table { num_outputs, .. } => *num_outputs,
            ModuleRecord::Composite { gate, .. } => gate.num_outputs,
        }
    }

    /// Rebuilds a table module as a lookup gate. Composite modules are not gates on their own.
    pub fn to_gate(&self) -> Result<LogicGate> {
        match self {
            ModuleRecord::Table {
                label,
                num_inputs,
                num_outputs,
                truth_table,
                ..
            } => {
                let table = TruthTable::new(*num_inputs, *num_outputs, truth_table.clone())?;
                Ok(LogicGate::from_table(table, label.as_str()))
            }
            ModuleRecord::Composite { name, .. } => Err(crate::Error::MalformedDocument(
                format!("module `{name}` is a composite, not a truth table"),
            )),
        }
    }

    /// Builds a fresh piece for this module, placed at `at`.
    pub fn instantiate(&self, at: Point, registry: &ModuleRegistry) -> Result<Piece> {
        match self {
            ModuleRecord::Table { .. } => Ok(Piece::gate(at, self.to_gate()?)),
            ModuleRecord::Composite { gate, .. } => Ok(Piece::composite(
                at,
                CompositeGate::from_document(gate, registry)?,
            )),
        }
    }
}

/// Module names match case-insensitively and ignore surrounding whitespace.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The module library, optionally backed by a JSON file.
#[derive(Clone, Debug, Default)]
pub struct ModuleRegistry {
    records: Vec<ModuleRecord>,
    path: Option<PathBuf>,
}

impl ModuleRegistry {
    /// An in-memory registry that is never written anywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the registry stored at `path`. A missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("No module file at {}, starting empty", path.display());
                Vec::new()
            }
            Err(err) => return Err(err.into()),
        };
        let registry = Self {
            records,
            path: Some(path),
        };
        info!("Loaded {} module(s)", registry.records.len());
        Ok(registry)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes every record back to the file the registry was loaded from.
    pub fn flush(&self) -> Result<()> {
        match &self.path {
            Some(path) => {
                fs::write(path, self.to_json()?)?;
                info!("Saved {} module(s) to {}", self.records.len(), path.display());
            }
            None => warn!("Module registry has no file to flush to"),
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&ModuleRecord> {
        let name = normalize(name);
        self.records
            .iter()
            .find(|record| normalize(record.name()) == name)
    }

    /// Adds a record, replacing and returning any record with the same name.
    pub fn store(&mut self, record: ModuleRecord) -> Option<ModuleRecord> {
        let name = normalize(record.name());
        info!("Storing module `{}`", record.name());
        match self
            .records
            .iter_mut()
            .find(|existing| normalize(existing.name()) == name)
        {
            Some(existing) => Some(std::mem::replace(existing, record)),
            None => {
                self.records.push(record);
                None
            }
        }
    }

    pub fn delete(&mut self, name: &str) -> Option<ModuleRecord> {
        let name = normalize(name);
        let position = self
            .records
            .iter()
            .position(|record| normalize(record.name()) == name)?;
        Some(self.records.remove(position))
    }

    pub fn list(&self) -> &[ModuleRecord] {
        &self.records
    }

    /// Adds the records whose names are not taken yet and returns how many were added.
    pub fn import(&mut self, records: impl IntoIterator<Item = ModuleRecord>) -> usize {
        let mut added = 0;
        for record in records {
            if self.lookup(record.name()).is_some() {
                continue;
            }
            self.records.push(record);
            added += 1;
        }
        info!("Imported {added} new module(s)");
        added
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.records)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            records: serde_json::from_str(json)?,
            path: None,
        })
    }
}

impl Circuit {
    /// Places a new instance of the module called `name`.
    pub fn insert_module(
        &mut self,
        name: &str,
        at: Point,
        registry: &ModuleRegistry,
    ) -> Result<PieceId> {
        let record = registry.lookup(name).ok_or_else(|| {
            warn!("No module named `{name}`");
            crate::Error::ModuleNotFound(name.to_string())
        })?;
        Ok(self.add_piece(record.instantiate(at, registry)?))
    }
}

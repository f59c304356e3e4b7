//! The persisted form of a circuit.
//!
//! Pieces are stored in order and everything else refers to them by position,
//! so a document has no object references. Pin coordinates are not stored:
//! they follow from the pieces' positions once a document is loaded.

use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    circuit::{Connection, Pin},
    config::DEFAULT_CLOCK_PERIOD,
    geometry::Point,
    modules::{ModuleRecord, ModuleRegistry},
    pieces::{Builtin, CompositeGate, LogicGate, Piece, PieceKind},
    Circuit, Error, PieceId, Result,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitDocument {
    pub pieces: Vec<PieceDocument>,
    pub connections: Vec<ConnectionDocument>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PieceDocument {
    #[serde(rename = "BUTTON")]
    Button {
        x: f64,
        y: f64,
        #[serde(flatten)]
        outline: Outline,
        #[serde(default, skip_serializing_if = "is_false")]
        state: bool,
    },
    #[serde(rename = "MOMENTARY")]
    Momentary {
        x: f64,
        y: f64,
        #[serde(flatten)]
        outline: Outline,
    },
    #[serde(rename = "CLOCK", rename_all = "camelCase")]
    Clock {
        x: f64,
        y: f64,
        #[serde(flatten)]
        outline: Outline,
        #[serde(default = "default_period_ms")]
        period_ms: f64,
    },
    #[serde(rename = "LIGHT")]
    Light {
        x: f64,
        y: f64,
        #[serde(flatten)]
        outline: Outline,
    },
    #[serde(rename = "DIGIT")]
    Digit {
        x: f64,
        y: f64,
        #[serde(flatten)]
        outline: Outline,
    },
    #[serde(rename = "GATE", rename_all = "camelCase")]
    Gate {
        x: f64,
        y: f64,
        label: String,
        num_inputs: usize,
        num_outputs: usize,
    },
    #[serde(rename = "CompositeGate")]
    Composite {
        x: f64,
        y: f64,
        #[serde(flatten)]
        gate: CompositeDocument,
    },
}

/// Label and pin counts of a primitive piece. Primitives carry an empty label.
///
/// Older documents may leave the counts out; when present they must match the piece.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outline {
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_inputs: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_outputs: Option<usize>,
}

impl Outline {
    pub fn of(piece: &Piece) -> Self {
        Self {
            label: String::new(),
            num_inputs: Some(piece.num_inputs()),
            num_outputs: Some(piece.num_outputs()),
        }
    }

    fn check(&self, piece: &Piece) -> Result<()> {
        if !self.label.is_empty() {
            return Err(malformed(format!(
                "{} pieces carry no label, document has `{}`",
                piece.label(),
                self.label
            )));
        }
        let found = (piece.num_inputs(), piece.num_outputs());
        let declared = (
            self.num_inputs.unwrap_or(found.0),
            self.num_outputs.unwrap_or(found.1),
        );
        check_arity(piece.label(), declared, found)
    }
}

/// A composite gate on its own: used both inside circuit documents and as a module record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeDocument {
    pub label: String,
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub sub_circuit: CircuitDocument,
    pub sub_inputs_mapping_indices: Vec<Option<usize>>,
    pub sub_outputs_mapping_indices: Vec<Option<usize>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDocument {
    pub start_piece_index: usize,
    #[serde(default)]
    pub start_index: usize,
    pub end_piece_index: usize,
    #[serde(default)]
    pub end_index: usize,
    #[serde(default)]
    pub intermediate_points: Vec<Point>,
}

const NANOS_PER_MS: f64 = 1_000_000.0;

fn default_period_ms() -> f64 {
    period_to_ms(DEFAULT_CLOCK_PERIOD)
}

/// Milliseconds with a fractional part, exact down to the nanosecond.
fn period_to_ms(period: Duration) -> f64 {
    period.as_nanos() as f64 / NANOS_PER_MS
}

fn period_from_ms(period_ms: f64) -> Option<Duration> {
    let nanos = (period_ms * NANOS_PER_MS).round();
    (nanos.is_finite() && nanos >= 1.0 && nanos <= u64::MAX as f64)
        .then(|| Duration::from_nanos(nanos as u64))
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn malformed(message: impl Into<String>) -> Error {
    Error::MalformedDocument(message.into())
}

fn check_arity(label: &str, expected: (usize, usize), found: (usize, usize)) -> Result<()> {
    if expected == found {
        return Ok(());
    }
    Err(malformed(format!(
        "gate `{label}` has {} input(s) and {} output(s), document declares {} and {}",
        found.0, found.1, expected.0, expected.1
    )))
}

/// Builds the gate a label stands for: a built-in, or a truth table module from `registry`.
pub(crate) fn resolve_gate(label: &str, registry: &ModuleRegistry) -> Result<LogicGate> {
    if let Some(builtin) = Builtin::from_label(label) {
        return Ok(LogicGate::builtin(builtin));
    }
    match registry.lookup(label) {
        Some(record @ ModuleRecord::Table { .. }) => record.to_gate(),
        Some(ModuleRecord::Composite { .. }) => Err(malformed(format!(
            "gate `{label}` refers to a composite module"
        ))),
        None => Err(Error::ModuleNotFound(label.to_string())),
    }
}

impl PieceDocument {
    fn position(&self) -> Point {
        match self {
            PieceDocument::Button { x, y, .. }
            | PieceDocument::Momentary { x, y, .. }
            | PieceDocument::Clock { x, y, .. }
            | PieceDocument::Light { x, y, .. }
            | PieceDocument::Digit { x, y, .. }
            | PieceDocument::Gate { x, y, .. }
            | PieceDocument::Composite { x, y, .. } => Point::new(*x, *y),
        }
    }

    fn to_piece(&self, registry: &ModuleRegistry) -> Result<Piece> {
        let at = self.position();
        let piece = match self {
            PieceDocument::Button { outline, state, .. } => {
                let mut piece = Piece::button(at);
                piece.force(*state);
                outline.check(&piece)?;
                piece
            }
            PieceDocument::Momentary { outline, .. } => {
                let piece = Piece::momentary(at);
                outline.check(&piece)?;
                piece
            }
            PieceDocument::Clock {
                outline, period_ms, ..
            } => {
                let piece = period_from_ms(*period_ms)
                    .and_then(|period| Piece::clock(at, period).ok())
                    .ok_or_else(|| malformed(format!("clock period of {period_ms} ms")))?;
                outline.check(&piece)?;
                piece
            }
            PieceDocument::Light { outline, .. } => {
                let piece = Piece::light(at);
                outline.check(&piece)?;
                piece
            }
            PieceDocument::Digit { outline, .. } => {
                let piece = Piece::digit(at);
                outline.check(&piece)?;
                piece
            }
            PieceDocument::Gate {
                label,
                num_inputs,
                num_outputs,
                ..
            } => {
                let gate = resolve_gate(label, registry)?;
                check_arity(
                    label,
                    (*num_inputs, *num_outputs),
                    (gate.num_inputs(), gate.num_outputs()),
                )?;
                Piece::gate(at, gate)
            }
            PieceDocument::Composite { gate, .. } => {
                Piece::composite(at, CompositeGate::from_document(gate, registry)?)
            }
        };
        Ok(piece)
    }

    fn from_piece(piece: &Piece) -> Self {
        let Point { x, y } = piece.node.position();
        match piece.kind() {
            PieceKind::Button(button) => PieceDocument::Button {
                x,
                y,
                outline: Outline::of(piece),
                state: button.state(),
            },
            PieceKind::Momentary(_) => PieceDocument::Momentary {
                x,
                y,
                outline: Outline::of(piece),
            },
            PieceKind::Clock(clock) => PieceDocument::Clock {
                x,
                y,
                outline: Outline::of(piece),
                period_ms: period_to_ms(clock.period()),
            },
            PieceKind::Light(_) => PieceDocument::Light {
                x,
                y,
                outline: Outline::of(piece),
            },
            PieceKind::Digit(_) => PieceDocument::Digit {
                x,
                y,
                outline: Outline::of(piece),
            },
            PieceKind::Gate(gate) => PieceDocument::Gate {
                x,
                y,
                label: gate.label().to_string(),
                num_inputs: gate.num_inputs(),
                num_outputs: gate.num_outputs(),
            },
            PieceKind::Composite(gate) => PieceDocument::Composite {
                x,
                y,
                gate: gate.to_document(),
            },
        }
    }
}

/// Position of every piece in storage order.
fn piece_indices(circuit: &Circuit) -> HashMap<PieceId, usize> {
    circuit
        .piece_ids()
        .into_iter()
        .enumerate()
        .map(|(index, piece_id)| (piece_id, index))
        .collect()
}

impl Circuit {
    pub fn to_document(&self) -> CircuitDocument {
        let indices = piece_indices(self);
        let pieces = self
            .pieces()
            .map(|(_, piece)| PieceDocument::from_piece(piece))
            .collect();
        let connections = self
            .connections()
            .iter()
            .filter_map(|conn| {
                Some(ConnectionDocument {
                    start_piece_index: *indices.get(&conn.start.piece)?,
                    start_index: conn.start.index,
                    end_piece_index: *indices.get(&conn.end.piece)?,
                    end_index: conn.end.index,
                    intermediate_points: conn.intermediate_points.clone(),
                })
            })
            .collect();
        CircuitDocument {
            pieces,
            connections,
        }
    }

    /// Rebuilds a circuit, resolving non-built-in gate labels through `registry`.
    ///
    /// Either the whole document loads or nothing does.
    pub fn from_document(doc: &CircuitDocument, registry: &ModuleRegistry) -> Result<Self> {
        let mut circuit = Circuit::new();
        let mut ids = Vec::with_capacity(doc.pieces.len());
        for piece in &doc.pieces {
            ids.push(circuit.add_piece(piece.to_piece(registry)?));
        }
        let resolve = |index: usize| {
            ids.get(index)
                .copied()
                .ok_or_else(|| malformed(format!("connection refers to missing piece {index}")))
        };
        for (number, conn) in doc.connections.iter().enumerate() {
            let start = Pin::new(resolve(conn.start_piece_index)?, conn.start_index);
            let end = Pin::new(resolve(conn.end_piece_index)?, conn.end_index);
            circuit.check_pins(start, end).map_err(|err| {
                malformed(format!("connection {number}: {err}"))
            })?;
            let mut connection = Connection::new(start, end);
            connection.intermediate_points = conn.intermediate_points.clone();
            circuit.push_connection(connection);
        }
        Ok(circuit)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn from_json(json: &str, registry: &ModuleRegistry) -> Result<Self> {
        let doc: CircuitDocument =
            serde_json::from_str(json).map_err(|err| malformed(err.to_string()))?;
        Self::from_document(&doc, registry)
    }
}

impl CompositeGate {
    /// Exports this gate with its whole sub-circuit.
    pub fn to_document(&self) -> CompositeDocument {
        let indices = piece_indices(self.sub_circuit());
        let map = |mapping: &[Option<PieceId>]| {
            mapping
                .iter()
                .map(|mapped| mapped.and_then(|piece_id| indices.get(&piece_id).copied()))
                .collect::<Vec<_>>()
        };
        CompositeDocument {
            label: self.label().to_string(),
            num_inputs: self.num_inputs(),
            num_outputs: self.num_outputs(),
            sub_circuit: self.sub_circuit().to_document(),
            sub_inputs_mapping_indices: map(self.sub_inputs_mapping()),
            sub_outputs_mapping_indices: map(self.sub_outputs_mapping()),
        }
    }

    pub fn from_document(doc: &CompositeDocument, registry: &ModuleRegistry) -> Result<Self> {
        if doc.sub_inputs_mapping_indices.len() != doc.num_inputs
            || doc.sub_outputs_mapping_indices.len() != doc.num_outputs
        {
            return Err(malformed(format!(
                "composite `{}` declares {} input(s) and {} output(s) but maps {} and {}",
                doc.label,
                doc.num_inputs,
                doc.num_outputs,
                doc.sub_inputs_mapping_indices.len(),
                doc.sub_outputs_mapping_indices.len()
            )));
        }
        let sub_circuit = Circuit::from_document(&doc.sub_circuit, registry)?;
        let ids = sub_circuit.piece_ids();
        let map = |indices: &[Option<usize>]| {
            indices
                .iter()
                .map(|index| match index {
                    Some(index) => ids.get(*index).copied().map(Some).ok_or_else(|| {
                        malformed(format!(
                            "composite `{}` maps a pin to missing piece {index}",
                            doc.label
                        ))
                    }),
                    None => Ok(None),
                })
                .collect::<Result<Vec<_>>>()
        };
        let inputs = map(&doc.sub_inputs_mapping_indices)?;
        let outputs = map(&doc.sub_outputs_mapping_indices)?;
        Ok(CompositeGate::new(&doc.label, sub_circuit, inputs, outputs))
    }
}

use crate::{bits, signal::Signal, Error, Result};

/// Largest input count a truth table may be built for.
pub const MAX_TABLE_INPUTS: usize = 24;

/// A boolean function stored as one row per input combination.
///
/// Row `i` holds the outputs for the assignment where input `k` is bit `k` of `i`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TruthTable {
    num_inputs: usize,
    num_outputs: usize,
    rows: Vec<Signal>,
}

impl TruthTable {
    pub fn new(num_inputs: usize, num_outputs: usize, rows: Vec<Signal>) -> Result<Self> {
        if num_inputs > MAX_TABLE_INPUTS {
            return Err(Error::MalformedDocument(format!(
                "truth table with {num_inputs} inputs exceeds {MAX_TABLE_INPUTS}"
            )));
        }
        let expected = 1usize << num_inputs;
        if rows.len() != expected {
            return Err(Error::MalformedDocument(format!(
                "truth table for {num_inputs} inputs needs {expected} rows, found {}",
                rows.len()
            )));
        }
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                row.conform(num_outputs).ok_or_else(|| {
                    Error::MalformedDocument(format!(
                        "truth table row {i} does not have {num_outputs} output(s)"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            num_inputs,
            num_outputs,
            rows,
        })
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn rows(&self) -> &[Signal] {
        &self.rows
    }

    /// Looks up the row for `inputs`. A wrong input count yields all-false.
    pub fn lookup(&self, inputs: &[bool]) -> Signal {
        if inputs.len() != self.num_inputs {
            return Signal::low(self.num_outputs);
        }
        self.rows[bits::pack::<usize>(inputs)].clone()
    }
}

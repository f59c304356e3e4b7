use log::warn;

use crate::{circuit_sim::CircuitSim, signal::Signal, Circuit, PieceId};

use super::Evaluate;

/// A gate whose behaviour is an embedded, live circuit.
///
/// External input pin `i` drives the sub-circuit piece `sub_inputs_mapping[i]`;
/// external output pin `j` reads the piece `sub_outputs_mapping[j]`. The
/// sub-circuit is owned exclusively and only changes through evaluation.
#[derive(Clone, Debug)]
pub struct CompositeGate {
    label: String,
    sub_circuit: Circuit,
    sub_inputs_mapping: Vec<Option<PieceId>>,
    sub_outputs_mapping: Vec<Option<PieceId>>,
    output: Signal,
}

impl CompositeGate {
    pub fn new(
        label: impl Into<String>,
        sub_circuit: Circuit,
        sub_inputs_mapping: Vec<Option<PieceId>>,
        sub_outputs_mapping: Vec<Option<PieceId>>,
    ) -> Self {
        let mut gate = Self {
            label: label.into(),
            sub_circuit,
            sub_inputs_mapping,
            sub_outputs_mapping,
            output: Signal::default(),
        };
        gate.output = gate.read_outputs();
        gate
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_inputs(&self) -> usize {
        self.sub_inputs_mapping.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.sub_outputs_mapping.len()
    }

    pub fn output(&self) -> &Signal {
        &self.output
    }

    pub fn sub_circuit(&self) -> &Circuit {
        &self.sub_circuit
    }

    pub(crate) fn sub_circuit_mut(&mut self) -> &mut Circuit {
        &mut self.sub_circuit
    }

    pub fn sub_inputs_mapping(&self) -> &[Option<PieceId>] {
        &self.sub_inputs_mapping
    }

    pub fn sub_outputs_mapping(&self) -> &[Option<PieceId>] {
        &self.sub_outputs_mapping
    }

    fn read_outputs(&self) -> Signal {
        let states = self
            .sub_outputs_mapping
            .iter()
            .enumerate()
            .map(|(pin, mapped)| {
                match mapped.and_then(|piece_id| self.sub_circuit.piece(piece_id)) {
                    Some(piece) => piece.observed_state(),
                    None => {
                        warn!("Composite `{}`: output pin {pin} is not mapped", self.label);
                        false
                    }
                }
            })
            .collect();
        Signal::from_bits(states)
    }
}

impl Evaluate for CompositeGate {
    fn evaluate(&mut self, inputs: &[bool]) {
        for (pin, active) in inputs.iter().cloned().enumerate() {
            match self.sub_inputs_mapping.get(pin).copied().flatten() {
                Some(piece_id) => {
                    if !self.sub_circuit.force_piece(piece_id, active) {
                        warn!(
                            "Composite `{}`: input pin {pin} maps to {piece_id}, which cannot be driven",
                            self.label
                        );
                    }
                }
                None => warn!("Composite `{}`: input pin {pin} is not mapped", self.label),
            }
        }
        self.sub_circuit.simulate();
        self.output = self.read_outputs();
    }
}

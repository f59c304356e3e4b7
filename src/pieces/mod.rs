//! Everything that can be placed on a board.

mod clock;
mod composite;
mod gate;
mod io;

use std::time::Duration;

pub use clock::Clock;
pub use composite::CompositeGate;
pub use gate::{Builtin, GateFn, LogicFunction, LogicGate};
pub use io::{Button, DigitDisplay, Light, MomentaryButton};

use crate::{
    config::{DIGIT_HEIGHT, MOMENTARY_WIDTH, NODE_HEIGHT, NODE_WIDTH, PIN_SPACING},
    geometry::{Node, Point},
    signal::Signal,
    Result,
};

/// Pieces that recompute their state from their input pins during propagation.
///
/// Clocks deliberately do not implement this: they change only when the host advances them.
pub trait Evaluate {
    fn evaluate(&mut self, inputs: &[bool]);
}

#[derive(Clone, Debug)]
pub enum PieceKind {
    Button(Button),
    Momentary(MomentaryButton),
    Clock(Clock),
    Light(Light),
    Digit(DigitDisplay),
    Gate(LogicGate),
    Composite(CompositeGate),
}

impl PieceKind {
    pub fn num_inputs(&self) -> usize {
        match self {
            PieceKind::Button(_) | PieceKind::Momentary(_) | PieceKind::Clock(_) => 0,
            PieceKind::Light(_) => 1,
            PieceKind::Digit(_) => DigitDisplay::NUM_INPUTS,
            PieceKind::Gate(gate) => gate.num_inputs(),
            PieceKind::Composite(gate) => gate.num_inputs(),
        }
    }

    pub fn num_outputs(&self) -> usize {
        match self {
            PieceKind::Button(_) | PieceKind::Momentary(_) | PieceKind::Clock(_) => 1,
            PieceKind::Light(_) | PieceKind::Digit(_) => 0,
            PieceKind::Gate(gate) => gate.num_outputs(),
            PieceKind::Composite(gate) => gate.num_outputs(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            PieceKind::Button(_) => "BUTTON",
            PieceKind::Momentary(_) => "MOMENTARY",
            PieceKind::Clock(_) => "CLOCK",
            PieceKind::Light(_) => "LIGHT",
            PieceKind::Digit(_) => "DIGIT",
            PieceKind::Gate(gate) => gate.label(),
            PieceKind::Composite(gate) => gate.label(),
        }
    }
}

/// A placed piece together with its input pin states.
#[derive(Clone, Debug)]
pub struct Piece {
    pub node: Node,
    kind: PieceKind,
    input_states: Vec<bool>,
}

impl Piece {
    pub fn new(kind: PieceKind, node: Node) -> Self {
        let input_states = vec![false; kind.num_inputs()];
        Self {
            node,
            kind,
            input_states,
        }
    }

    pub fn button(at: Point) -> Self {
        Self::new(PieceKind::Button(Button::default()), Node::new(at))
    }

    pub fn momentary(at: Point) -> Self {
        Self::new(
            PieceKind::Momentary(MomentaryButton::default()),
            Node::with_size(at, MOMENTARY_WIDTH, NODE_HEIGHT),
        )
    }

    pub fn clock(at: Point, period: Duration) -> Result<Self> {
        Ok(Self::new(PieceKind::Clock(Clock::new(period)?), Node::new(at)))
    }

    pub fn light(at: Point) -> Self {
        Self::new(PieceKind::Light(Light::default()), Node::new(at))
    }

    pub fn digit(at: Point) -> Self {
        Self::new(
            PieceKind::Digit(DigitDisplay::default()),
            Node::with_size(at, NODE_WIDTH, DIGIT_HEIGHT),
        )
    }

    pub fn gate(at: Point, gate: LogicGate) -> Self {
        let node = gate_node(at, gate.num_inputs(), gate.num_outputs());
        Self::new(PieceKind::Gate(gate), node)
    }

    pub fn composite(at: Point, gate: CompositeGate) -> Self {
        let node = gate_node(at, gate.num_inputs(), gate.num_outputs());
        Self::new(PieceKind::Composite(gate), node)
    }

    pub fn kind(&self) -> &PieceKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut PieceKind {
        &mut self.kind
    }

    pub fn label(&self) -> &str {
        self.kind.label()
    }

    pub fn num_inputs(&self) -> usize {
        self.input_states.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.kind.num_outputs()
    }

    pub fn input_states(&self) -> &[bool] {
        &self.input_states
    }

    /// What the output pins currently drive, or `None` for pure sinks.
    pub fn output(&self) -> Option<Signal> {
        match &self.kind {
            PieceKind::Button(button) => Some(Signal::Single(button.state())),
            PieceKind::Momentary(button) => Some(Signal::Single(button.is_held())),
            PieceKind::Clock(clock) => Some(Signal::Single(clock.output())),
            PieceKind::Light(_) | PieceKind::Digit(_) => None,
            PieceKind::Gate(gate) => Some(gate.output().clone()),
            PieceKind::Composite(gate) => Some(gate.output().clone()),
        }
    }

    pub fn output_at(&self, index: usize) -> bool {
        match &self.kind {
            PieceKind::Button(button) => button.state(),
            PieceKind::Momentary(button) => button.is_held(),
            PieceKind::Clock(clock) => clock.output(),
            PieceKind::Light(_) | PieceKind::Digit(_) => false,
            PieceKind::Gate(gate) => gate.output().get(index),
            PieceKind::Composite(gate) => gate.output().get(index),
        }
    }

    /// The state an observer reads off this piece: a light's lamp, otherwise output 0.
    pub fn observed_state(&self) -> bool {
        match &self.kind {
            PieceKind::Light(light) => light.state(),
            _ => self.output_at(0),
        }
    }

    /// Pieces whose state feeds a circuit from outside when it is combined.
    pub fn is_input_kind(&self) -> bool {
        matches!(self.kind, PieceKind::Button(_) | PieceKind::Momentary(_))
    }

    /// Pieces that expose a circuit's result when it is combined.
    pub fn is_output_kind(&self) -> bool {
        matches!(self.kind, PieceKind::Light(_))
    }

    /// Overrides the state of a signal source. Returns false for pieces that are not sources.
    pub(crate) fn force(&mut self, active: bool) -> bool {
        match &mut self.kind {
            PieceKind::Button(button) => button.set_state(active),
            PieceKind::Momentary(button) => button.force(active),
            PieceKind::Clock(clock) => clock.force(active),
            _ => return false,
        }
        true
    }

    pub(crate) fn clear_inputs(&mut self) {
        self.input_states.fill(false);
    }

    pub(crate) fn drive_input(&mut self, index: usize, active: bool) {
        if let Some(state) = self.input_states.get_mut(index) {
            *state |= active;
        }
    }

    /// Runs one evaluation. Returns true if the observable output changed.
    pub fn evaluate(&mut self) -> bool {
        let before = self.output();
        let inputs = &self.input_states;
        let evaluator: &mut dyn Evaluate = match &mut self.kind {
            PieceKind::Clock(_) => return false,
            PieceKind::Button(button) => button,
            PieceKind::Momentary(button) => button,
            PieceKind::Light(light) => light,
            PieceKind::Digit(display) => display,
            PieceKind::Gate(gate) => gate,
            PieceKind::Composite(gate) => gate,
        };
        evaluator.evaluate(inputs);
        self.output() != before
    }

    pub fn input_pin(&self, index: usize) -> Point {
        self.node.input_pin(index, self.num_inputs())
    }

    pub fn output_pin(&self, index: usize) -> Point {
        self.node.output_pin(index, self.num_outputs())
    }
}

/// Footprint for a gate: the default node, grown to fit its pins.
pub(crate) fn gate_node(at: Point, num_inputs: usize, num_outputs: usize) -> Node {
    let pins = num_inputs.max(num_outputs) as f64 * PIN_SPACING;
    Node::with_size(at, NODE_WIDTH.max(pins), NODE_HEIGHT.max(pins))
}

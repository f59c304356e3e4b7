//! Collapsing a whole circuit into a single gate.
//!
//! `combine` samples the circuit into a truth table and forgets its structure;
//! `encapsulate` keeps the circuit alive inside a [`CompositeGate`].

use log::{debug, info, warn};

use crate::{
    bits,
    circuit::{Connection, Pin},
    circuit_sim::CircuitSim,
    config::{SYNTHESIZED_X, SYNTHESIZED_Y},
    geometry::Point,
    modules::{ModuleRecord, ModuleRegistry},
    pieces::{CompositeGate, LogicGate, Piece},
    signal::Signal,
    truth_table::{TruthTable, MAX_TABLE_INPUTS},
    Circuit, Error, PieceId, Result,
};

pub const DEFAULT_MODULE_LABEL: &str = "Module";
pub const DEFAULT_COMPOSITE_LABEL: &str = "Composite";

fn usable_name(name: Option<&str>) -> Option<&str> {
    name.map(str::trim).filter(|name| !name.is_empty())
}

impl Circuit {
    /// Distinct pieces on one side of the wires, topmost first.
    ///
    /// Pieces at the same height keep the order in which the wires first mention them.
    fn designated<S, K>(&self, side: S, is_kind: K) -> Vec<PieceId>
    where
        S: Fn(&Connection) -> Pin,
        K: Fn(&Piece) -> bool,
    {
        let mut found: Vec<(PieceId, f64)> = Vec::new();
        for conn in self.connections() {
            let piece_id = side(conn).piece;
            if found.iter().any(|(seen, _)| *seen == piece_id) {
                continue;
            }
            match self.piece(piece_id) {
                Some(piece) if is_kind(piece) => found.push((piece_id, piece.node.y)),
                _ => (),
            }
        }
        found.sort_by(|(_, a), (_, b)| a.total_cmp(b));
        found.into_iter().map(|(piece_id, _)| piece_id).collect()
    }

    /// Buttons and momentary buttons that drive at least one wire, in bit order.
    pub fn designated_inputs(&self) -> Vec<PieceId> {
        self.designated(|conn| conn.start, Piece::is_input_kind)
    }

    /// Lights fed by at least one wire, in bit order.
    pub fn designated_outputs(&self) -> Vec<PieceId> {
        self.designated(|conn| conn.end, Piece::is_output_kind)
    }

    /// Samples every input combination and records the lights' settled states.
    ///
    /// Row `i` drives designated input `k` with bit `k` of `i`. Sequential behaviour is
    /// not captured: each row is just whatever state the circuit settles into.
    pub fn tabulate(&mut self) -> Result<TruthTable> {
        let inputs = self.designated_inputs();
        let outputs = self.designated_outputs();
        if inputs.is_empty() || outputs.is_empty() {
            warn!(
                "Cannot combine a circuit with {} input(s) and {} output(s)",
                inputs.len(),
                outputs.len()
            );
            return Err(Error::NothingToCombine {
                inputs: inputs.len(),
                outputs: outputs.len(),
            });
        }
        if inputs.len() > MAX_TABLE_INPUTS {
            return Err(Error::TooManyInputs(inputs.len()));
        }

        let width = inputs.len();
        let mut rows = Vec::with_capacity(1 << width);
        for combination in 0usize..(1 << width) {
            for (piece_id, active) in inputs.iter().zip(bits::unpack(combination, width)) {
                self.force_piece(*piece_id, active);
            }
            self.simulate();
            let states = outputs
                .iter()
                .map(|piece_id| {
                    self.piece(*piece_id)
                        .map(Piece::observed_state)
                        .unwrap_or(false)
                })
                .collect::<Vec<_>>();
            let row = Signal::from_bits(states);
            debug!("Combination {combination:0width$b}: {row:?}");
            rows.push(row);
        }
        TruthTable::new(width, outputs.len(), rows)
    }

    /// Replaces the whole circuit with one gate that looks up its truth table.
    ///
    /// If `name` is given the table is also stored in `registry` under that name.
    /// Fails without touching the circuit when there is no wired input or output.
    pub fn combine(
        &mut self,
        name: Option<&str>,
        registry: &mut ModuleRegistry,
    ) -> Result<PieceId> {
        let table = self.tabulate()?;
        let name = usable_name(name);
        let label = name.unwrap_or(DEFAULT_MODULE_LABEL);
        if let Some(name) = name {
            registry.store(ModuleRecord::from_table(name, &table));
        }
        info!(
            "Combined circuit into `{label}` ({} in, {} out): {:?}",
            table.num_inputs(),
            table.num_outputs(),
            table.rows()
        );
        let gate = LogicGate::from_table(table, label);
        let at = Point::new(SYNTHESIZED_X, SYNTHESIZED_Y);
        Ok(self.replace_with(Piece::gate(at, gate)))
    }

    /// Replaces the whole circuit with a composite gate that embeds a copy of it.
    ///
    /// The composite always has at least one input and one output pin; pins with
    /// nothing to map to stay unmapped.
    pub fn encapsulate(&mut self, name: Option<&str>, registry: &mut ModuleRegistry) -> PieceId {
        let mut inputs = self
            .designated_inputs()
            .into_iter()
            .map(Some)
            .collect::<Vec<_>>();
        let mut outputs = self
            .designated_outputs()
            .into_iter()
            .map(Some)
            .collect::<Vec<_>>();
        if inputs.is_empty() {
            inputs.push(None);
        }
        if outputs.is_empty() {
            outputs.push(None);
        }

        let name = usable_name(name);
        let label = name.unwrap_or(DEFAULT_COMPOSITE_LABEL);
        let gate = CompositeGate::new(label, self.clone(), inputs, outputs);
        if let Some(name) = name {
            registry.store(ModuleRecord::from_composite(name, &gate));
        }
        info!(
            "Encapsulated {} piece(s) into `{label}` ({} in, {} out)",
            self.num_pieces(),
            gate.num_inputs(),
            gate.num_outputs()
        );
        let at = Point::new(SYNTHESIZED_X, SYNTHESIZED_Y);
        self.replace_with(Piece::composite(at, gate))
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::{
        circuit_sim::CircuitSim,
        geometry::Point,
        modules::{ModuleRecord, ModuleRegistry},
        pieces::{Builtin, LogicGate, Piece, PieceKind},
        signal::Signal,
        Circuit, Error, Pin, PieceId,
    };

    fn and_circuit() -> (Circuit, PieceId, PieceId) {
        let mut circuit = Circuit::new();
        let lower = circuit.add_button(Point::new(0.0, 200.0));
        let upper = circuit.add_button(Point::new(0.0, 0.0));
        let and = circuit.add_and(Point::new(100.0, 100.0));
        let light = circuit.add_light(Point::new(200.0, 100.0));
        circuit.connect(Pin::of(lower), Pin::new(and, 1)).unwrap();
        circuit.connect(Pin::of(upper), Pin::new(and, 0)).unwrap();
        circuit.connect(Pin::of(and), Pin::of(light)).unwrap();
        (circuit, upper, lower)
    }

    fn evaluate_with(piece: &mut Piece, inputs: &[bool]) -> Signal {
        piece.clear_inputs();
        for (pin, active) in inputs.iter().cloned().enumerate() {
            piece.drive_input(pin, active);
        }
        piece.evaluate();
        piece.output().unwrap()
    }

    #[test]
    fn inputs_ordered_top_down() {
        let (circuit, upper, lower) = and_circuit();
        assert_eq!(circuit.designated_inputs(), vec![upper, lower]);
        assert_eq!(circuit.designated_outputs().len(), 1);
    }

    #[test]
    fn combine_and_gate() {
        let (mut circuit, _, _) = and_circuit();
        let mut registry = ModuleRegistry::new();
        let gate_id = circuit.combine(Some("  And2 "), &mut registry).unwrap();
        assert_eq!(circuit.num_pieces(), 1);
        assert!(circuit.connections().is_empty());

        let gate = circuit.piece_mut(gate_id).unwrap();
        assert_eq!(gate.label(), "And2");
        let expected = [false, false, false, true];
        for (combination, expected) in expected.into_iter().enumerate() {
            let inputs = [combination & 1 == 1, combination & 2 == 2];
            assert_eq!(evaluate_with(gate, &inputs), Signal::Single(expected));
        }

        match registry.lookup("and2") {
            Some(ModuleRecord::Table {
                truth_table,
                num_inputs,
                num_outputs,
                ..
            }) => {
                assert_eq!((*num_inputs, *num_outputs), (2, 1));
                assert_eq!(truth_table, &expected.map(Signal::Single).to_vec());
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn combine_without_name_is_not_stored() {
        let (mut circuit, _, _) = and_circuit();
        let mut registry = ModuleRegistry::new();
        let gate_id = circuit.combine(Some("   "), &mut registry).unwrap();
        assert_eq!(circuit.piece(gate_id).unwrap().label(), "Module");
        assert!(registry.list().is_empty());
    }

    #[test]
    fn combine_needs_inputs_and_outputs() {
        let mut circuit = Circuit::new();
        let button = circuit.add_button(Point::default());
        let not = circuit.add_not(Point::default());
        circuit.connect(Pin::of(button), Pin::of(not)).unwrap();
        let mut registry = ModuleRegistry::new();
        assert!(matches!(
            circuit.combine(Some("x"), &mut registry),
            Err(Error::NothingToCombine {
                inputs: 1,
                outputs: 0
            })
        ));
        assert_eq!(circuit.num_pieces(), 2);
        assert_eq!(circuit.connections().len(), 1);
        assert!(registry.list().is_empty());

        let mut empty = Circuit::new();
        assert!(empty.combine(None, &mut registry).is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn combine_multiple_outputs() {
        let mut circuit = Circuit::new();
        let button = circuit.add_button(Point::default());
        let not = circuit.add_not(Point::default());
        let same = circuit.add_light(Point::new(0.0, 0.0));
        let inverted = circuit.add_light(Point::new(0.0, 100.0));
        circuit.connect(Pin::of(button), Pin::of(not)).unwrap();
        circuit.connect(Pin::of(not), Pin::of(inverted)).unwrap();
        circuit.connect(Pin::of(button), Pin::of(same)).unwrap();
        let table = circuit.tabulate().unwrap();
        assert_eq!(
            table.rows(),
            &[
                Signal::Multi(vec![false, true]),
                Signal::Multi(vec![true, false])
            ]
        );
    }

    #[test]
    fn composite_not_matches_bare_not() {
        let mut circuit = Circuit::new();
        let button = circuit.add_button(Point::default());
        let not = circuit.add_not(Point::default());
        let light = circuit.add_light(Point::default());
        circuit.connect(Pin::of(button), Pin::of(not)).unwrap();
        circuit.connect(Pin::of(not), Pin::of(light)).unwrap();
        let mut registry = ModuleRegistry::new();
        let composite_id = circuit.encapsulate(None, &mut registry);
        assert!(registry.list().is_empty());

        let mut composite = circuit.remove_piece(composite_id).unwrap();
        let mut bare = Piece::gate(Point::default(), LogicGate::builtin(Builtin::Not));
        for input in [false, true, false] {
            assert_eq!(
                evaluate_with(&mut composite, &[input]),
                evaluate_with(&mut bare, &[input])
            );
        }
    }

    #[test]
    fn encapsulate_without_pins_leaves_them_unmapped() {
        let mut circuit = Circuit::new();
        circuit.add_not(Point::default());
        let mut registry = ModuleRegistry::new();
        let composite_id = circuit.encapsulate(Some("Lonely"), &mut registry);
        let piece = circuit.piece_mut(composite_id).unwrap();
        match piece.kind() {
            PieceKind::Composite(gate) => {
                assert_eq!(gate.sub_inputs_mapping(), &[None]);
                assert_eq!(gate.sub_outputs_mapping(), &[None]);
            }
            other => panic!("unexpected piece {other:?}"),
        }
        assert_eq!(evaluate_with(piece, &[true]), Signal::Single(false));
        assert!(registry.lookup("lonely").is_some());
    }

    #[test]
    fn composite_keeps_its_clock() {
        let mut inner = Circuit::new();
        let enable = inner.add_button(Point::new(0.0, 0.0));
        let clock = inner
            .add_clock(Point::new(0.0, 100.0), Duration::from_millis(10))
            .unwrap();
        let and = inner.add_and(Point::default());
        let light = inner.add_light(Point::default());
        inner.connect(Pin::of(enable), Pin::new(and, 0)).unwrap();
        inner.connect(Pin::of(clock), Pin::new(and, 1)).unwrap();
        inner.connect(Pin::of(and), Pin::of(light)).unwrap();
        let mut registry = ModuleRegistry::new();
        let composite = inner.encapsulate(Some("Blinker"), &mut registry);

        let mut outer = inner;
        let switch = outer.add_button(Point::default());
        let lamp = outer.add_light(Point::default());
        outer.connect(Pin::of(switch), Pin::of(composite)).unwrap();
        outer.connect(Pin::of(composite), Pin::of(lamp)).unwrap();
        outer.toggle_button(switch).unwrap();

        let lamp_at = |outer: &mut Circuit, millis: u64| {
            outer.advance_clocks(Duration::from_millis(millis));
            outer.simulate();
            outer.piece(lamp).unwrap().observed_state()
        };
        assert!(!lamp_at(&mut outer, 0));
        assert!(lamp_at(&mut outer, 10));
        assert!(!lamp_at(&mut outer, 20));
        assert!(lamp_at(&mut outer, 30));
    }

    #[test]
    fn nested_composites_terminate() {
        let mut circuit = Circuit::new();
        let button = circuit.add_button(Point::default());
        let not = circuit.add_not(Point::default());
        let light = circuit.add_light(Point::default());
        circuit.connect(Pin::of(button), Pin::of(not)).unwrap();
        circuit.connect(Pin::of(not), Pin::of(light)).unwrap();
        let mut registry = ModuleRegistry::new();
        let inner = circuit.encapsulate(None, &mut registry);

        let button = circuit.add_button(Point::default());
        let light = circuit.add_light(Point::default());
        circuit.connect(Pin::of(button), Pin::of(inner)).unwrap();
        circuit.connect(Pin::of(inner), Pin::of(light)).unwrap();
        let outer = circuit.encapsulate(None, &mut registry);

        let button = circuit.add_button(Point::default());
        let light = circuit.add_light(Point::default());
        circuit.connect(Pin::of(button), Pin::of(outer)).unwrap();
        circuit.connect(Pin::of(outer), Pin::of(light)).unwrap();

        circuit.simulate();
        assert!(circuit.piece(light).unwrap().observed_state());
        circuit.toggle_button(button).unwrap();
        circuit.simulate();
        assert!(!circuit.piece(light).unwrap().observed_state());
    }
}

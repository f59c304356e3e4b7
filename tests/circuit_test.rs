#[cfg(test)]
mod test {
    use std::time::Duration;

    use rand::{rngs::StdRng, Rng, SeedableRng};

    use digiboard::{
        circuit_sim::*,
        geometry::Point,
        modules::ModuleRegistry,
        pieces::{LogicFunction, PieceKind},
        signal::Signal,
        Circuit, PieceId, Pin,
    };

    fn set_button(circuit: &mut Circuit, button: PieceId, active: bool) {
        let current = matches!(
            circuit.piece(button).unwrap().kind(),
            PieceKind::Button(b) if b.state()
        );
        if current != active {
            circuit.toggle_button(button).unwrap();
        }
    }

    fn light(circuit: &Circuit, light: PieceId) -> bool {
        circuit.piece(light).unwrap().observed_state()
    }

    fn gate_test_gen(name: &str, add: fn(&mut Circuit, Point) -> PieceId, expecteds: [bool; 4]) {
        let mut circuit = Circuit::new();
        let a = circuit.add_button(Point::new(0.0, 0.0));
        let b = circuit.add_button(Point::new(0.0, 100.0));
        let gate = add(&mut circuit, Point::new(100.0, 50.0));
        let out = circuit.add_light(Point::new(200.0, 50.0));
        circuit.connect(Pin::of(a), Pin::new(gate, 0)).unwrap();
        circuit.connect(Pin::of(b), Pin::new(gate, 1)).unwrap();
        circuit.connect(Pin::of(gate), Pin::of(out)).unwrap();
        let expecteds = [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .zip(expecteds);
        for ((in_a, in_b), expected) in expecteds {
            set_button(&mut circuit, a, in_a);
            set_button(&mut circuit, b, in_b);
            assert!(circuit.simulate().converged());
            assert_eq!(light(&circuit, out), expected, "{in_a} {name} {in_b} = {expected}");
        }
    }

    #[test]
    fn gate_tests() {
        gate_test_gen("and", Circuit::add_and, [false, false, false, true]);
        gate_test_gen("or", Circuit::add_or, [false, true, true, true]);
        gate_test_gen(
            "xor",
            |circuit, at| {
                let xor = LogicFunction::custom(|inputs| Signal::Single(inputs[0] ^ inputs[1]));
                circuit.add_gate(at, xor, "XOR", 2, 1)
            },
            [false, true, true, false],
        );
    }

    struct HalfAdder {
        circuit: Circuit,
        a: PieceId,
        b: PieceId,
        sum: PieceId,
        carry: PieceId,
    }

    /// sum = (a | b) & !(a & b), carry = a & b
    fn half_adder() -> HalfAdder {
        let mut circuit = Circuit::new();
        let a = circuit.add_button(Point::new(0.0, 0.0));
        let b = circuit.add_button(Point::new(0.0, 100.0));
        let or = circuit.add_or(Point::new(100.0, 0.0));
        let and = circuit.add_and(Point::new(100.0, 100.0));
        let not = circuit.add_not(Point::new(200.0, 100.0));
        let sum_and = circuit.add_and(Point::new(300.0, 0.0));
        let sum = circuit.add_light(Point::new(400.0, 0.0));
        let carry = circuit.add_light(Point::new(400.0, 100.0));
        for (start, end) in [
            (Pin::of(a), Pin::new(or, 0)),
            (Pin::of(b), Pin::new(or, 1)),
            (Pin::of(a), Pin::new(and, 0)),
            (Pin::of(b), Pin::new(and, 1)),
            (Pin::of(and), Pin::of(not)),
            (Pin::of(or), Pin::new(sum_and, 0)),
            (Pin::of(not), Pin::new(sum_and, 1)),
            (Pin::of(sum_and), Pin::of(sum)),
            (Pin::of(and), Pin::of(carry)),
        ] {
            circuit.connect(start, end).unwrap();
        }
        HalfAdder {
            circuit,
            a,
            b,
            sum,
            carry,
        }
    }

    #[test]
    fn half_adder_test() {
        let HalfAdder {
            mut circuit,
            a,
            b,
            sum,
            carry,
        } = half_adder();
        for (in_a, in_b) in [(false, false), (false, true), (true, false), (true, true)] {
            set_button(&mut circuit, a, in_a);
            set_button(&mut circuit, b, in_b);
            assert!(circuit.simulate().converged());
            assert_eq!(light(&circuit, sum), in_a ^ in_b);
            assert_eq!(light(&circuit, carry), in_a & in_b);
        }
    }

    #[test]
    fn combined_half_adder_table() {
        let mut adder = half_adder();
        let mut registry = ModuleRegistry::new();
        let gate = adder
            .circuit
            .combine(Some("Half Adder"), &mut registry)
            .unwrap();
        let piece = adder.circuit.piece(gate).unwrap();
        assert_eq!((piece.num_inputs(), piece.num_outputs()), (2, 2));
        match piece.kind() {
            PieceKind::Gate(gate) => assert_eq!(gate.output(), &Signal::Multi(vec![false, false])),
            other => panic!("unexpected piece {other:?}"),
        }
        assert!(registry.lookup("half adder").is_some());
    }

    /// Wires fresh buttons and lights around the single gate left by `combine`.
    fn harness(circuit: &mut Circuit, gate: PieceId) -> (Vec<PieceId>, Vec<PieceId>) {
        let piece = circuit.piece(gate).unwrap();
        let (num_inputs, num_outputs) = (piece.num_inputs(), piece.num_outputs());
        let buttons = (0..num_inputs)
            .map(|i| {
                let button = circuit.add_button(Point::new(0.0, i as f64 * 100.0));
                circuit.connect(Pin::of(button), Pin::new(gate, i)).unwrap();
                button
            })
            .collect();
        let lights = (0..num_outputs)
            .map(|i| {
                let light = circuit.add_light(Point::new(400.0, i as f64 * 100.0));
                circuit.connect(Pin::new(gate, i), Pin::of(light)).unwrap();
                light
            })
            .collect();
        (buttons, lights)
    }

    #[test]
    fn combine_matches_random_circuits() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20 {
            let mut circuit = Circuit::new();
            let buttons = (0..3)
                .map(|i| circuit.add_button(Point::new(0.0, i as f64 * 100.0)))
                .collect::<Vec<_>>();
            let mut pool = buttons.clone();
            for i in 0..6 {
                let at = Point::new(100.0 + i as f64 * 50.0, 0.0);
                let gate = match rng.gen_range(0..3) {
                    0 => circuit.add_and(at),
                    1 => circuit.add_or(at),
                    _ => circuit.add_not(at),
                };
                let first = if i < buttons.len() {
                    buttons[i]
                } else {
                    pool[rng.gen_range(0..pool.len())]
                };
                circuit.connect(Pin::of(first), Pin::new(gate, 0)).unwrap();
                if circuit.piece(gate).unwrap().num_inputs() == 2 {
                    let second = pool[rng.gen_range(0..pool.len())];
                    circuit.connect(Pin::of(second), Pin::new(gate, 1)).unwrap();
                }
                pool.push(gate);
            }
            let lights = (0..2)
                .map(|i| {
                    let light = circuit.add_light(Point::new(500.0, i as f64 * 100.0));
                    let source = pool[pool.len() - 1 - i];
                    circuit.connect(Pin::of(source), Pin::of(light)).unwrap();
                    light
                })
                .collect::<Vec<_>>();

            let mut original = circuit.clone();
            let gate = circuit.combine(None, &mut ModuleRegistry::new()).unwrap();
            let (new_buttons, new_lights) = harness(&mut circuit, gate);
            assert_eq!(new_buttons.len(), 3);

            for combination in 0..8 {
                for bit in 0..3 {
                    let active = combination & (1 << bit) != 0;
                    set_button(&mut original, buttons[bit], active);
                    set_button(&mut circuit, new_buttons[bit], active);
                }
                assert!(original.simulate().converged());
                assert!(circuit.simulate().converged());
                for (old, new) in lights.iter().zip(&new_lights) {
                    assert_eq!(light(&original, *old), light(&circuit, *new));
                }
            }
        }
    }

    #[test]
    fn encapsulated_flip_flop_keeps_state() {
        let mut circuit = Circuit::new();
        let set = circuit.add_momentary(Point::new(0.0, 0.0));
        let reset = circuit.add_momentary(Point::new(0.0, 100.0));
        let or_q = circuit.add_or(Point::new(100.0, 100.0));
        let q = circuit.add_not(Point::new(200.0, 100.0));
        let or_q_not = circuit.add_or(Point::new(100.0, 0.0));
        let q_not = circuit.add_not(Point::new(200.0, 0.0));
        let out = circuit.add_light(Point::new(300.0, 0.0));
        for (start, end) in [
            (Pin::of(reset), Pin::new(or_q, 0)),
            (Pin::of(q_not), Pin::new(or_q, 1)),
            (Pin::of(or_q), Pin::of(q)),
            (Pin::of(set), Pin::new(or_q_not, 0)),
            (Pin::of(q), Pin::new(or_q_not, 1)),
            (Pin::of(or_q_not), Pin::of(q_not)),
            (Pin::of(q), Pin::of(out)),
        ] {
            circuit.connect(start, end).unwrap();
        }
        let latch = circuit.encapsulate(Some("Latch"), &mut ModuleRegistry::new());
        let set = circuit.add_button(Point::new(0.0, 0.0));
        let reset = circuit.add_button(Point::new(0.0, 100.0));
        let out = circuit.add_light(Point::new(300.0, 0.0));
        circuit.connect(Pin::of(set), Pin::new(latch, 0)).unwrap();
        circuit.connect(Pin::of(reset), Pin::new(latch, 1)).unwrap();
        circuit.connect(Pin::of(latch), Pin::of(out)).unwrap();

        let pulse = |circuit: &mut Circuit, button: PieceId| {
            set_button(circuit, button, true);
            circuit.simulate();
            set_button(circuit, button, false);
            circuit.simulate();
        };
        pulse(&mut circuit, set);
        assert!(light(&circuit, out));
        circuit.simulate();
        assert!(light(&circuit, out));
        pulse(&mut circuit, reset);
        assert!(!light(&circuit, out));
    }

    #[test]
    fn clock_drives_digit_display() {
        let mut circuit = Circuit::new();
        let digit = circuit.add_digit(Point::new(200.0, 0.0));
        let clocks = (0..4)
            .map(|bit| {
                let period = Duration::from_millis(10 << bit);
                let clock = circuit.add_clock(Point::new(0.0, bit as f64 * 60.0), period);
                let clock = clock.unwrap();
                circuit.connect(Pin::of(clock), Pin::new(digit, bit)).unwrap();
                clock
            })
            .collect::<Vec<_>>();
        assert_eq!(clocks.len(), 4);
        circuit.advance_clocks(Duration::ZERO);
        for tick in 0..16u64 {
            circuit.advance_clocks(Duration::from_millis(tick * 10));
            circuit.simulate();
            match circuit.piece(digit).unwrap().kind() {
                PieceKind::Digit(display) => assert_eq!(display.value() as u64, tick),
                other => panic!("unexpected piece {other:?}"),
            }
        }
    }

    #[test]
    fn sources_change_through_circuit() {
        let mut circuit = Circuit::new();
        let button = circuit.add_button(Point::new(0.0, 0.0));
        let momentary = circuit.add_momentary(Point::new(0.0, 60.0));
        let or = circuit.add_or(Point::new(100.0, 30.0));
        let out = circuit.add_light(Point::new(200.0, 30.0));
        circuit.connect(Pin::of(button), Pin::new(or, 0)).unwrap();
        circuit.connect(Pin::of(momentary), Pin::new(or, 1)).unwrap();
        circuit.connect(Pin::of(or), Pin::of(out)).unwrap();

        circuit.press(momentary).unwrap();
        circuit.simulate();
        assert!(light(&circuit, out));
        circuit.release(momentary).unwrap();
        circuit.simulate();
        assert!(!light(&circuit, out));

        assert!(circuit.toggle_button(button).unwrap());
        circuit.simulate();
        assert!(light(&circuit, out));
        assert!(circuit.toggle_button(out).is_err());

        circuit.piece_mut(or).unwrap().node.set_position(Point::new(120.0, 30.0));
        circuit.simulate();
        assert!(light(&circuit, out));
        assert_eq!(circuit.piece(or).unwrap().num_inputs(), 2);
    }
}

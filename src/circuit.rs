use std::{fmt, time::Duration};

use generational_arena::{Arena, Index};
use log::debug;

use crate::{
    circuit_sim::CircuitSim,
    error::PinDirection,
    geometry::Point,
    pieces::{Builtin, Clock, LogicFunction, LogicGate, Piece, PieceKind},
    Error, Result,
};

/// Handle to a piece inside one [`Circuit`]. Stays valid until that piece is removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PieceId(Index);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (slot, generation) = self.0.into_raw_parts();
        write!(f, "#{slot}.{generation}")
    }
}

/// An input or output slot: a piece plus a pin index (0 for single-pin pieces).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pin {
    pub piece: PieceId,
    pub index: usize,
}

impl Pin {
    pub fn new(piece: PieceId, index: usize) -> Self {
        Self { piece, index }
    }

    pub fn of(piece: PieceId) -> Self {
        Self::new(piece, 0)
    }
}

/// A wire from an output pin to an input pin.
///
/// Waypoints only shape how the wire is drawn; they play no part in simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub start: Pin,
    pub end: Pin,
    pub intermediate_points: Vec<Point>,
    pub highlight: bool,
}

impl Connection {
    pub fn new(start: Pin, end: Pin) -> Self {
        Self {
            start,
            end,
            intermediate_points: Vec::new(),
            highlight: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Circuit {
    pieces: Arena<Piece>,
    connections: Vec<Connection>,
}

macro_rules! builtin_fn_gen {
    ( $name:ident, $builtin:ident ) => {
        pub fn $name(&mut self, at: Point) -> PieceId {
            self.add_piece(Piece::gate(at, LogicGate::builtin(Builtin::$builtin)))
        }
    };
}

impl Circuit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn num_pieces(&self) -> usize {
        self.pieces.len()
    }

    /// Pieces in storage order, which is also their index order in a saved document.
    pub fn pieces(&self) -> impl Iterator<Item = (PieceId, &Piece)> + '_ {
        self.pieces.iter().map(|(index, piece)| (PieceId(index), piece))
    }

    pub fn piece_ids(&self) -> Vec<PieceId> {
        self.pieces.iter().map(|(index, _)| PieceId(index)).collect()
    }

    pub fn piece(&self, piece_id: PieceId) -> Option<&Piece> {
        self.pieces.get(piece_id.0)
    }

    /// Gives access to a piece's node. Its kind only changes through the circuit's
    /// own mutators, so pin counts stay in step with the wiring:
    ///
    /// ```compile_fail
    /// use digiboard::{geometry::Point, pieces::{Light, PieceKind}, Circuit};
    ///
    /// let mut circuit = Circuit::new();
    /// let button = circuit.add_button(Point::default());
    /// *circuit.piece_mut(button).unwrap().kind_mut() = PieceKind::Light(Light::default());
    /// ```
    pub fn piece_mut(&mut self, piece_id: PieceId) -> Option<&mut Piece> {
        self.pieces.get_mut(piece_id.0)
    }

    fn existing(&self, piece_id: PieceId) -> Result<&Piece> {
        self.piece(piece_id).ok_or(Error::UnknownPiece(piece_id))
    }

    fn existing_mut(&mut self, piece_id: PieceId) -> Result<&mut Piece> {
        self.piece_mut(piece_id).ok_or(Error::UnknownPiece(piece_id))
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Places a piece. It reuses the slot of the most recently removed piece if there is one,
    /// so storage order is not always insertion order.
    pub fn add_piece(&mut self, piece: Piece) -> PieceId {
        PieceId(self.pieces.insert(piece))
    }

    pub fn add_button(&mut self, at: Point) -> PieceId {
        self.add_piece(Piece::button(at))
    }

    pub fn add_momentary(&mut self, at: Point) -> PieceId {
        self.add_piece(Piece::momentary(at))
    }

    pub fn add_clock(&mut self, at: Point, period: Duration) -> Result<PieceId> {
        Ok(self.add_piece(Piece::clock(at, period)?))
    }

    pub fn add_light(&mut self, at: Point) -> PieceId {
        self.add_piece(Piece::light(at))
    }

    pub fn add_digit(&mut self, at: Point) -> PieceId {
        self.add_piece(Piece::digit(at))
    }

    pub fn add_gate(
        &mut self,
        at: Point,
        function: LogicFunction,
        label: impl Into<String>,
        num_inputs: usize,
        num_outputs: usize,
    ) -> PieceId {
        let gate = LogicGate::new(function, label, num_inputs, num_outputs);
        self.add_piece(Piece::gate(at, gate))
    }

    builtin_fn_gen!(add_and, And);
    builtin_fn_gen!(add_or, Or);
    builtin_fn_gen!(add_not, Not);

    /// Removes a piece along with every connection touching it.
    pub fn remove_piece(&mut self, piece_id: PieceId) -> Option<Piece> {
        let piece = self.pieces.remove(piece_id.0)?;
        self.connections
            .retain(|conn| conn.start.piece != piece_id && conn.end.piece != piece_id);
        Some(piece)
    }

    /// Wires an output pin to an input pin and returns the connection's index.
    ///
    /// Wiring the same start piece to the same input pin twice returns the existing connection.
    pub fn connect(&mut self, start: Pin, end: Pin) -> Result<usize> {
        self.check_pins(start, end)?;
        let duplicate = self.connections.iter().position(|conn| {
            conn.start.piece == start.piece && conn.end.piece == end.piece && conn.end.index == end.index
        });
        match duplicate {
            Some(existing) => {
                debug!("Connection {} -> {} already exists", start.piece, end.piece);
                Ok(existing)
            }
            None => {
                self.connections.push(Connection::new(start, end));
                Ok(self.connections.len() - 1)
            }
        }
    }

    /// Fails unless `start` is an existing output pin and `end` an existing input pin.
    pub(crate) fn check_pins(&self, start: Pin, end: Pin) -> Result<()> {
        if start.index >= self.existing(start.piece)?.num_outputs() {
            return Err(Error::NoSuchPin {
                piece: start.piece,
                direction: PinDirection::Output,
                index: start.index,
            });
        }
        if end.index >= self.existing(end.piece)?.num_inputs() {
            return Err(Error::NoSuchPin {
                piece: end.piece,
                direction: PinDirection::Input,
                index: end.index,
            });
        }
        Ok(())
    }

    pub(crate) fn push_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn remove_connection(&mut self, index: usize) -> Option<Connection> {
        if index < self.connections.len() {
            Some(self.connections.remove(index))
        } else {
            None
        }
    }

    fn connection_mut(&mut self, index: usize) -> Result<&mut Connection> {
        self.connections
            .get_mut(index)
            .ok_or(Error::UnknownConnection(index))
    }

    pub fn add_waypoint(&mut self, index: usize, point: Point) -> Result<()> {
        self.connection_mut(index)?.intermediate_points.push(point);
        Ok(())
    }

    /// Moves waypoint `waypoint` of connection `index`. Returns false if there is no such waypoint.
    pub fn move_waypoint(&mut self, index: usize, waypoint: usize, to: Point) -> Result<bool> {
        match self.connection_mut(index)?.intermediate_points.get_mut(waypoint) {
            Some(point) => {
                *point = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_highlight(&mut self, index: usize, highlight: bool) -> Result<()> {
        self.connection_mut(index)?.highlight = highlight;
        Ok(())
    }

    /// The points a wire passes through: its start pin, its waypoints, then its end pin.
    pub fn wire_path(&self, index: usize) -> Option<Vec<Point>> {
        let conn = self.connections.get(index)?;
        let start = self.piece(conn.start.piece)?.output_pin(conn.start.index);
        let end = self.piece(conn.end.piece)?.input_pin(conn.end.index);
        let mut path = Vec::with_capacity(conn.intermediate_points.len() + 2);
        path.push(start);
        path.extend_from_slice(&conn.intermediate_points);
        path.push(end);
        Some(path)
    }

    pub fn toggle_button(&mut self, piece_id: PieceId) -> Result<bool> {
        match self.existing_mut(piece_id)?.kind_mut() {
            PieceKind::Button(button) => Ok(button.toggle()),
            _ => Err(Error::UnexpectedKind {
                piece: piece_id,
                expected: "button",
            }),
        }
    }

    pub fn press(&mut self, piece_id: PieceId) -> Result<()> {
        self.momentary(piece_id, true)
    }

    pub fn release(&mut self, piece_id: PieceId) -> Result<()> {
        self.momentary(piece_id, false)
    }

    fn momentary(&mut self, piece_id: PieceId, held: bool) -> Result<()> {
        match self.existing_mut(piece_id)?.kind_mut() {
            PieceKind::Momentary(button) if held => button.press(),
            PieceKind::Momentary(button) => button.release(),
            _ => {
                return Err(Error::UnexpectedKind {
                    piece: piece_id,
                    expected: "momentary button",
                })
            }
        }
        Ok(())
    }

    /// Overrides a source piece's state. Returns false if the piece is missing or not a source.
    pub(crate) fn force_piece(&mut self, piece_id: PieceId, active: bool) -> bool {
        match self.piece_mut(piece_id) {
            Some(piece) => piece.force(active),
            None => false,
        }
    }

    pub fn clock_mut(&mut self, piece_id: PieceId) -> Result<&mut Clock> {
        match self.existing_mut(piece_id)?.kind_mut() {
            PieceKind::Clock(clock) => Ok(clock),
            _ => Err(Error::UnexpectedKind {
                piece: piece_id,
                expected: "clock",
            }),
        }
    }

    /// Delivers the host's current time to one clock. Returns true if its output flipped.
    pub fn advance_clock(&mut self, piece_id: PieceId, now: Duration) -> Result<bool> {
        Ok(self.clock_mut(piece_id)?.advance(now))
    }

    /// Delivers the host's current time to every clock, including those inside composites.
    pub fn advance_clocks(&mut self, now: Duration) -> bool {
        let mut flipped = false;
        for (_, piece) in self.pieces.iter_mut() {
            flipped |= match piece.kind_mut() {
                PieceKind::Clock(clock) => clock.advance(now),
                PieceKind::Composite(gate) => gate.sub_circuit_mut().advance_clocks(now),
                _ => false,
            };
        }
        flipped
    }

    /// Drops every piece and connection, leaving only `piece`.
    pub(crate) fn replace_with(&mut self, piece: Piece) -> PieceId {
        self.pieces.clear();
        self.connections.clear();
        self.add_piece(piece)
    }
}

impl CircuitSim for Circuit {
    fn step(&mut self) -> bool {
        for (_, piece) in self.pieces.iter_mut() {
            piece.clear_inputs();
        }
        // Every source is sampled before any input is written.
        let drives = self
            .connections
            .iter()
            .filter_map(|conn| {
                let source = self.pieces.get(conn.start.piece.0)?;
                Some((conn.end, source.output_at(conn.start.index)))
            })
            .collect::<Vec<_>>();
        for (end, active) in drives {
            if let Some(piece) = self.pieces.get_mut(end.piece.0) {
                piece.drive_input(end.index, active);
            }
        }
        let mut changed = false;
        for (_, piece) in self.pieces.iter_mut() {
            changed |= piece.evaluate();
        }
        changed
    }
}

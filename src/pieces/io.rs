use crate::bits;

use super::Evaluate;

/// A latching switch: toggled from outside, drives its state until toggled again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Button {
    state: bool,
}

impl Button {
    pub fn new(state: bool) -> Self {
        Self { state }
    }

    pub fn state(&self) -> bool {
        self.state
    }

    pub fn set_state(&mut self, state: bool) {
        self.state = state;
    }

    pub fn toggle(&mut self) -> bool {
        self.state = !self.state;
        self.state
    }
}

impl Evaluate for Button {
    fn evaluate(&mut self, _inputs: &[bool]) {}
}

/// A push button that only drives true while held.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MomentaryButton {
    held: bool,
}

impl MomentaryButton {
    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn press(&mut self) {
        self.held = true;
    }

    pub fn release(&mut self) {
        self.held = false;
    }

    pub(crate) fn force(&mut self, held: bool) {
        self.held = held;
    }
}

impl Evaluate for MomentaryButton {
    fn evaluate(&mut self, _inputs: &[bool]) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Light {
    state: bool,
}

impl Light {
    pub fn state(&self) -> bool {
        self.state
    }
}

impl Evaluate for Light {
    fn evaluate(&mut self, inputs: &[bool]) {
        self.state = inputs.first().copied().unwrap_or(false);
    }
}

/// Shows its four input bits as one hexadecimal digit. Input 0 is the least significant bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DigitDisplay {
    value: u8,
}

impl DigitDisplay {
    pub const NUM_INPUTS: usize = 4;

    pub fn value(&self) -> u8 {
        self.value
    }

    pub fn digit(&self) -> char {
        char::from_digit(self.value as u32, 16)
            .map(|digit| digit.to_ascii_uppercase())
            .unwrap_or('0')
    }
}

impl Evaluate for DigitDisplay {
    fn evaluate(&mut self, inputs: &[bool]) {
        let width = inputs.len().min(Self::NUM_INPUTS);
        self.value = bits::pack::<u8>(&inputs[..width]);
    }
}

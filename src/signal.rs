use serde::{Deserialize, Serialize};

/// The value driven by a piece's output pins.
///
/// Pieces with exactly one output always use `Single`; `Multi` is reserved for
/// two or more outputs. Truth table rows use the same shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    Single(bool),
    Multi(Vec<bool>),
}

impl Default for Signal {
    fn default() -> Self {
        Signal::Single(false)
    }
}

impl Signal {
    /// An all-false signal for `width` output pins.
    pub fn low(width: usize) -> Self {
        if width == 1 {
            Signal::Single(false)
        } else {
            Signal::Multi(vec![false; width])
        }
    }

    pub fn from_bits(bits: Vec<bool>) -> Self {
        if bits.len() == 1 {
            Signal::Single(bits[0])
        } else {
            Signal::Multi(bits)
        }
    }

    /// Value seen on output pin `index`. A single signal drives every index.
    pub fn get(&self, index: usize) -> bool {
        match self {
            Signal::Single(active) => *active,
            Signal::Multi(actives) => actives.get(index).copied().unwrap_or(false),
        }
    }

    pub fn width(&self) -> usize {
        match self {
            Signal::Single(_) => 1,
            Signal::Multi(actives) => actives.len(),
        }
    }

    /// Returns the signal reshaped for `width` pins, or `None` if its arity disagrees.
    pub fn conform(self, width: usize) -> Option<Self> {
        match self {
            Signal::Single(active) if width == 1 => Some(Signal::Single(active)),
            Signal::Multi(actives) if actives.len() == width => Some(Signal::from_bits(actives)),
            _ => None,
        }
    }
}

impl From<bool> for Signal {
    fn from(active: bool) -> Self {
        Signal::Single(active)
    }
}

use std::{fmt, sync::Arc};

use log::warn;

use crate::{signal::Signal, truth_table::TruthTable};

use super::Evaluate;

pub type GateFn = Arc<dyn Fn(&[bool]) -> Signal + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    And,
    Or,
    Not,
}

impl Builtin {
    pub fn label(self) -> &'static str {
        match self {
            Builtin::And => "AND",
            Builtin::Or => "OR",
            Builtin::Not => "NOT",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "AND" => Some(Builtin::And),
            "OR" => Some(Builtin::Or),
            "NOT" => Some(Builtin::Not),
            _ => None,
        }
    }

    pub fn num_inputs(self) -> usize {
        match self {
            Builtin::And | Builtin::Or => 2,
            Builtin::Not => 1,
        }
    }

    fn apply(self, inputs: &[bool]) -> bool {
        match self {
            Builtin::And => inputs.iter().all(|active| *active),
            Builtin::Or => inputs.iter().any(|active| *active),
            Builtin::Not => !inputs.first().copied().unwrap_or(false),
        }
    }
}

/// The pure function a [`LogicGate`] evaluates.
#[derive(Clone)]
pub enum LogicFunction {
    Builtin(Builtin),
    Table(Arc<TruthTable>),
    Custom(GateFn),
}

impl LogicFunction {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&[bool]) -> Signal + Send + Sync + 'static,
    {
        LogicFunction::Custom(Arc::new(f))
    }

    pub fn call(&self, inputs: &[bool]) -> Signal {
        match self {
            LogicFunction::Builtin(builtin) => Signal::Single(builtin.apply(inputs)),
            LogicFunction::Table(table) => table.lookup(inputs),
            LogicFunction::Custom(f) => f(inputs),
        }
    }
}

impl fmt::Debug for LogicFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicFunction::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
            LogicFunction::Table(table) => f.debug_tuple("Table").field(table).finish(),
            LogicFunction::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogicGate {
    function: LogicFunction,
    label: String,
    num_inputs: usize,
    num_outputs: usize,
    output: Signal,
}

impl LogicGate {
    pub fn new(
        function: LogicFunction,
        label: impl Into<String>,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Self {
        let mut gate = Self {
            function,
            label: label.into(),
            num_inputs,
            num_outputs,
            output: Signal::low(num_outputs),
        };
        gate.evaluate(&vec![false; num_inputs]);
        gate
    }

    pub fn builtin(builtin: Builtin) -> Self {
        Self::new(
            LogicFunction::Builtin(builtin),
            builtin.label(),
            builtin.num_inputs(),
            1,
        )
    }

    pub fn from_table(table: TruthTable, label: impl Into<String>) -> Self {
        let (num_inputs, num_outputs) = (table.num_inputs(), table.num_outputs());
        Self::new(
            LogicFunction::Table(Arc::new(table)),
            label,
            num_inputs,
            num_outputs,
        )
    }

    pub fn function(&self) -> &LogicFunction {
        &self.function
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    pub fn output(&self) -> &Signal {
        &self.output
    }
}

impl Evaluate for LogicGate {
    fn evaluate(&mut self, inputs: &[bool]) {
        let result = self.function.call(inputs);
        let width = result.width();
        self.output = match result.conform(self.num_outputs) {
            Some(output) => output,
            None => {
                warn!(
                    "Gate `{}` produced {width} output(s) but declares {}; driving all-false",
                    self.label, self.num_outputs
                );
                Signal::low(self.num_outputs)
            }
        };
    }
}

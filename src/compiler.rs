use std::{collections::HashMap, rc::Rc};

use derivative::Derivative;
use thiserror::Error;

use crate::{
  block::Value,
  thread::{Status, Thread},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
  #[error("unsupported opcode: {opcode}")]
  Unsupported { opcode: String },
  #[error("block not found: {id}")]
  MissingBlock { id: String },
  #[error("{0}")]
  Other(String),
}

/// Outcome of running a suspendable computation up to its next stop.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
  Suspended(Status),
  Completed(Option<Value>),
}

/// Compiled code that can be stopped and picked up again later.
pub trait Coroutine {
  fn resume(&mut self, thread: &mut Thread) -> Step;
}

impl<F> Coroutine for F
where
  F: FnMut(&mut Thread) -> Step,
{
  fn resume(&mut self, thread: &mut Thread) -> Step {
    self(thread)
  }
}

/// A compiled procedure bound to one thread; called with its arguments.
pub type Procedure = Rc<dyn Fn(Vec<Value>) -> Box<dyn Coroutine>>;

pub type ProcedureFactory = Rc<dyn Fn(&Thread) -> Procedure>;

pub type StartingFunction = Rc<dyn Fn(&Thread) -> Box<dyn Coroutine>>;

/// Result of compiling one script, shared by every thread running it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct CompiledScript {
  #[derivative(Debug(format_with = "fmt_procedure_codes"))]
  pub procedures: HashMap<String, ProcedureFactory>,
  #[derivative(Debug = "ignore")]
  pub starting_function: StartingFunction,
  /// Whether the entry point is a hat that restarts its own script.
  pub executable_hat: bool,
}

fn fmt_procedure_codes(
  procedures: &HashMap<String, ProcedureFactory>,
  f: &mut std::fmt::Formatter,
) -> std::fmt::Result {
  f.debug_list().entries(procedures.keys()).finish()
}

pub trait Compiler {
  fn compile(&self, thread: &Thread) -> Result<CompiledScript, CompileError>;
}

impl<F> Compiler for F
where
  F: Fn(&Thread) -> Result<CompiledScript, CompileError>,
{
  fn compile(&self, thread: &Thread) -> Result<CompiledScript, CompileError> {
    self(thread)
  }
}

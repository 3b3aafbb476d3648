//! Running blocks written for the interpreter from compiled code.
//!
//! Such blocks expect a block utility that exposes the thread's stack frame
//! and lets them start branches. [`CompatBlockUtility`] provides that on top
//! of a record the compiled caller owns.

use std::rc::Rc;

use thiserror::Error;

use crate::{
  block::Value,
  frame::ExecutionContext,
  target::Sequencer,
  thread::{Status, Thread},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum UtilityError {
  #[error("{0} is not supported by this BlockUtility")]
  Unsupported(&'static str),
}

/// A branch a block asked to run, read back by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartedBranch {
  pub branch_number: u32,
  pub is_loop: bool,
}

/// What block implementations may ask of whoever runs them.
pub trait BlockUtility {
  fn thread(&mut self) -> &mut Thread;

  /// State the block keeps between runs of itself.
  fn stack_frame(&mut self) -> &mut ExecutionContext;

  fn start_branch(&mut self, branch_number: u32, is_loop: bool);

  fn start_procedure(&mut self, procedure_code: &str)
    -> Result<(), UtilityError>;

  fn init_params(&mut self) -> Result<(), UtilityError>;

  fn push_param(&mut self, name: &str, value: Value)
    -> Result<(), UtilityError>;

  fn get_param(&mut self, name: &str) -> Result<Option<Value>, UtilityError>;

  fn yield_thread(&mut self) {
    self.thread().status = Status::Yield;
  }

  fn yield_tick(&mut self) {
    self.thread().status = Status::YieldTick;
  }
}

/// Block utility bound to one thread for the length of one legacy call.
pub struct CompatBlockUtility<'t> {
  thread: &'t mut Thread,
  sequencer: Option<Rc<dyn Sequencer>>,
  started_branch: Option<StartedBranch>,
}

impl<'t> CompatBlockUtility<'t> {
  /// Points the thread's stack at `fake_block_id` and exposes `stack_frame`
  /// on it as the frame the block will see.
  pub fn init(
    thread: &'t mut Thread,
    fake_block_id: &str,
    stack_frame: ExecutionContext,
  ) -> Self {
    let sequencer = thread.target.runtime.sequencer();
    thread.replace_stack_base(fake_block_id);
    thread.compatibility_stack_frame = Some(stack_frame);
    CompatBlockUtility {
      thread,
      sequencer,
      started_branch: None,
    }
  }

  pub fn sequencer(&self) -> Option<&Rc<dyn Sequencer>> {
    self.sequencer.as_ref()
  }

  pub fn started_branch(&self) -> Option<StartedBranch> {
    self.started_branch
  }
}

impl BlockUtility for CompatBlockUtility<'_> {
  fn thread(&mut self) -> &mut Thread {
    &mut *self.thread
  }

  fn stack_frame(&mut self) -> &mut ExecutionContext {
    self
      .thread
      .compatibility_stack_frame
      .get_or_insert_with(ExecutionContext::default)
  }

  fn start_branch(&mut self, branch_number: u32, is_loop: bool) {
    self.started_branch = Some(StartedBranch {
      branch_number,
      is_loop,
    });
  }

  fn start_procedure(&mut self, _: &str) -> Result<(), UtilityError> {
    Err(UtilityError::Unsupported("startProcedure"))
  }

  // Compiled scripts pass parameters themselves.
  fn init_params(&mut self) -> Result<(), UtilityError> {
    Err(UtilityError::Unsupported("initParams"))
  }

  fn push_param(&mut self, _: &str, _: Value) -> Result<(), UtilityError> {
    Err(UtilityError::Unsupported("pushParam"))
  }

  fn get_param(&mut self, _: &str) -> Result<Option<Value>, UtilityError> {
    Err(UtilityError::Unsupported("getParam"))
  }
}

/// Runs `block` against `thread` through a freshly bound utility and
/// returns its result together with the branch it started, if any.
pub fn call_legacy_block<R>(
  thread: &mut Thread,
  fake_block_id: &str,
  stack_frame: ExecutionContext,
  block: impl FnOnce(&mut dyn BlockUtility) -> R,
) -> (R, Option<StartedBranch>) {
  let mut util = CompatBlockUtility::init(thread, fake_block_id, stack_frame);
  let result = block(&mut util);
  (result, util.started_branch())
}

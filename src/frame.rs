use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::trace;

use crate::{block::Value, timer::Timer};

/// Procedure parameters bound on a frame.
pub type Params = HashMap<String, Value>;

/// State a block implementation keeps across suspensions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
  pub timer: Option<Timer>,
  pub values: HashMap<String, Value>,
}

/// The instruction a frame is executing.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
  pub id: String,
  pub opcode: String,
}

impl Op {
  pub fn new(id: &str, opcode: &str) -> Rc<Op> {
    Rc::new(Op {
      id: id.to_string(),
      opcode: opcode.to_string(),
    })
  }
}

/// Metadata for one level of a thread's stack.
#[derive(Debug, Default)]
pub struct StackFrame {
  pub is_loop: bool,
  pub warp_mode: bool,
  /// Reported value from the block just executed at the parent's request.
  pub just_reported: Option<Value>,
  /// Reporter whose inputs are memoized in `reported`.
  pub reporting: Option<String>,
  pub reported: Option<HashMap<String, Value>>,
  /// Set while this frame waits on a nested reporter.
  pub waiting_reporter: bool,
  /// Only procedure call frames have a parameter map.
  pub params: Option<Params>,
  pub execution_context: Option<ExecutionContext>,
  pub op: Option<Rc<Op>>,
}

impl StackFrame {
  pub fn new(warp_mode: bool) -> Self {
    StackFrame {
      warp_mode,
      ..Default::default()
    }
  }

  pub fn reset(&mut self) -> &mut Self {
    *self = StackFrame::default();
    self
  }

  /// Clears the frame for the next block at this level, keeping warp mode.
  pub fn reuse(&mut self) -> &mut Self {
    let warp_mode = self.warp_mode;
    self.reset();
    self.warp_mode = warp_mode;
    self
  }
}

/// Recycles stack frames between threads.
///
/// Clones share one free list, so every thread handed a clone by the same
/// owner draws from and returns to the same pool.
#[derive(Debug, Clone, Default)]
pub struct FramePool {
  free: Rc<RefCell<Vec<Box<StackFrame>>>>,
}

impl FramePool {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn create(&self, warp_mode: bool) -> Box<StackFrame> {
    match self.free.borrow_mut().pop() {
      Some(mut frame) => {
        frame.warp_mode = warp_mode;
        frame
      }
      None => {
        trace!("allocating stack frame");
        Box::new(StackFrame::new(warp_mode))
      }
    }
  }

  pub fn release(&self, mut frame: Box<StackFrame>) {
    frame.reset();
    self.free.borrow_mut().push(frame);
  }

  /// Number of frames waiting to be reused.
  pub fn len(&self) -> usize {
    self.free.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

use std::{collections::HashMap, rc::Rc};

use derivative::Derivative;
use log::{debug, error};

use crate::{
  block::{Block, Value, PROCEDURES_CALL},
  blocks::Blocks,
  compiler::{Compiler, Coroutine, Procedure, Step},
  frame::{ExecutionContext, FramePool, Params, StackFrame},
  target::Target,
  timer::Timer,
};

/// How many enclosing frames `is_recursive_call` looks at.
const RECURSION_CHECK_DEPTH: usize = 5;

/// Where a thread stands with respect to being stepped. The numbers are
/// shared with compiled code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
  /// Step from block to block as normal.
  #[default]
  Running = 0,
  /// A primitive waits on an external result. Only settling it resumes.
  PromiseWait = 1,
  Yield = 2,
  /// Yield until at least the next tick. Cleared on resumption.
  YieldTick = 3,
  /// Nothing left to run.
  Done = 4,
}

/// A running script: its stack of blocks and the frames that go with it.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Thread {
  top_block: String,
  stack: Vec<Option<String>>,
  stack_frames: Vec<Box<StackFrame>>,
  pub status: Status,
  pub is_killed: bool,
  pub target: Rc<Target>,
  /// The blocks this thread executes. Not always the target's own blocks.
  pub block_container: Rc<Blocks>,
  /// Started by clicking the script rather than by its hat.
  pub stack_click: bool,
  pub request_script_glow_in_frame: bool,
  pub block_glow_in_frame: Option<String>,
  pub warp_timer: Option<Timer>,
  pub just_reported: Option<Value>,
  tried_to_compile: bool,
  is_compiled: bool,
  // Only meaningful once compiled.
  #[derivative(Debug = "ignore")]
  generator: Option<Box<dyn Coroutine>>,
  #[derivative(Debug = "ignore")]
  procedures: HashMap<String, Procedure>,
  pub executable_hat: bool,
  pub compatibility_stack_frame: Option<ExecutionContext>,
  #[derivative(Debug = "ignore")]
  pool: FramePool,
}

impl Thread {
  pub fn new(
    top_block: &str,
    target: Rc<Target>,
    block_container: Rc<Blocks>,
    pool: FramePool,
  ) -> Self {
    Thread {
      top_block: top_block.to_string(),
      stack: Vec::new(),
      stack_frames: Vec::new(),
      status: Status::Running,
      is_killed: false,
      target,
      block_container,
      stack_click: false,
      request_script_glow_in_frame: false,
      block_glow_in_frame: None,
      warp_timer: None,
      just_reported: None,
      tried_to_compile: false,
      is_compiled: false,
      generator: None,
      procedures: HashMap::new(),
      executable_hat: false,
      compatibility_stack_frame: None,
      pool,
    }
  }

  /// `&` never appears in ids, so it can separate the two.
  pub fn id_from_target_and_block(target_id: &str, top_block: &str) -> String {
    format!("{target_id}&{top_block}")
  }

  pub fn get_id(&self) -> String {
    Thread::id_from_target_and_block(&self.target.id, &self.top_block)
  }

  pub fn top_block(&self) -> &str {
    &self.top_block
  }

  pub fn stack(&self) -> &[Option<String>] {
    &self.stack
  }

  pub fn stack_frames(&self) -> &[Box<StackFrame>] {
    &self.stack_frames
  }

  pub fn push_stack(&mut self, block_id: &str) {
    self.stack.push(Some(block_id.to_string()));
    // A frame may still be in place if we just popped.
    if self.stack.len() > self.stack_frames.len() {
      let warp_mode = self
        .stack_frames
        .last()
        .map_or(false, |parent| parent.warp_mode);
      self.stack_frames.push(self.pool.create(warp_mode));
    }
  }

  /// Moves to `block_id` at the current depth without touching the pool.
  pub fn reuse_stack_for_next_block(&mut self, block_id: Option<String>) {
    let (Some(top), Some(frame)) =
      (self.stack.last_mut(), self.stack_frames.last_mut())
    else {
      return;
    };
    *top = block_id;
    frame.reuse();
  }

  pub fn pop_stack(&mut self) -> Option<String> {
    if let Some(frame) = self.stack_frames.pop() {
      self.pool.release(frame);
    }
    self.stack.pop().flatten()
  }

  pub fn peek_stack(&self) -> Option<&str> {
    self.stack.last().and_then(|id| id.as_deref())
  }

  pub fn peek_stack_frame(&self) -> Option<&StackFrame> {
    self.stack_frames.last().map(|frame| &**frame)
  }

  pub fn peek_stack_frame_mut(&mut self) -> Option<&mut StackFrame> {
    self.stack_frames.last_mut().map(|frame| &mut **frame)
  }

  pub fn peek_parent_stack_frame(&self) -> Option<&StackFrame> {
    let len = self.stack_frames.len();
    if len < 2 {
      return None;
    }
    Some(&*self.stack_frames[len - 2])
  }

  pub fn peek_parent_stack_frame_mut(&mut self) -> Option<&mut StackFrame> {
    let len = self.stack_frames.len();
    if len < 2 {
      return None;
    }
    Some(&mut *self.stack_frames[len - 2])
  }

  pub fn push_reported_value(&mut self, value: Option<Value>) {
    self.just_reported = value;
  }

  /// Gives the current frame a parameter map if it has none.
  ///
  /// # Panics
  /// If the stack is empty.
  pub fn init_params(&mut self) {
    let Some(frame) = self.peek_stack_frame_mut() else {
      panic!("init_params called on an empty stack");
    };
    frame.params.get_or_insert_with(Params::new);
  }

  /// # Panics
  /// If `init_params` was not called for the current frame.
  pub fn push_param(&mut self, name: &str, value: Value) {
    match self.peek_stack_frame_mut().and_then(|frame| frame.params.as_mut()) {
      Some(params) => {
        params.insert(name.to_string(), value);
      }
      None => panic!("push_param called before init_params"),
    }
  }

  /// Looks `name` up in the innermost frame that has parameters. Outer
  /// procedures' parameters are never visible.
  pub fn get_param(&self, name: &str) -> Option<&Value> {
    self
      .stack_frames
      .iter()
      .rev()
      .find_map(|frame| frame.params.as_ref())
      .and_then(|params| params.get(name))
  }

  pub fn get_all_params(&self) -> Option<&Params> {
    self.peek_stack_frame().and_then(|frame| frame.params.as_ref())
  }

  pub fn at_stack_top(&self) -> bool {
    self.peek_stack() == Some(self.top_block.as_str())
  }

  /// Continues with the block after the current one at the same depth.
  pub fn go_to_next_block(&mut self) {
    let next = self
      .peek_stack()
      .and_then(|id| self.with_block(id, |block| block.next.clone()))
      .flatten();
    self.reuse_stack_for_next_block(next);
  }

  /// Unwinds until a procedure call or a waiting reporter, or until the
  /// stack is empty, in which case the thread is done.
  pub fn stop_this_script(&mut self) {
    while let Some(block_id) = self.peek_stack().map(str::to_string) {
      if self
        .peek_stack_frame()
        .is_some_and(|frame| frame.waiting_reporter)
      {
        break;
      }
      let is_call = self
        .with_block(&block_id, |block| block.opcode == PROCEDURES_CALL)
        .unwrap_or(false);
      if is_call {
        // The call already ran, and which arguments were evaluated is lost
        // if it is entered again.
        self.go_to_next_block();
        break;
      }
      self.pop_stack();
    }

    if self.stack.is_empty() {
      self.request_script_glow_in_frame = false;
      self.status = Status::Done;
    }
  }

  /// Guesses whether calling `procedure_code` recurses by looking at the
  /// closest enclosing frames only.
  pub fn is_recursive_call(&self, procedure_code: &str) -> bool {
    let below_top = self.stack_frames.len().saturating_sub(1);
    self.stack_frames[..below_top]
      .iter()
      .rev()
      .take(RECURSION_CHECK_DEPTH)
      .any(|frame| {
        frame
          .op
          .as_ref()
          .and_then(|op| {
            self.with_block(&op.id, |block| {
              block.proccode() == Some(procedure_code)
            })
          })
          .unwrap_or(false)
      })
  }

  /// Drops everything on the stack and finishes the thread.
  pub fn retire(&mut self) {
    debug!("retiring thread {}", self.get_id());
    self.release_frames();
    self.stack.clear();
    self.request_script_glow_in_frame = false;
    self.status = Status::Done;
  }

  pub fn kill(&mut self) {
    self.is_killed = true;
    self.retire();
  }

  /// Resumes a thread waiting on an external result.
  pub fn settle_promise(&mut self, value: Option<Value>) {
    if self.status != Status::PromiseWait {
      return;
    }
    self.status = Status::Running;
    self.push_reported_value(value);
  }

  pub fn is_warp_mode(&self) -> bool {
    self.peek_stack_frame().is_some_and(|frame| frame.warp_mode)
  }

  pub fn start_warp_timer(&mut self) {
    self.warp_timer.get_or_insert_with(Timer::start);
  }

  pub fn warp_budget_exceeded(&self) -> bool {
    let budget = self.target.runtime.config().warp_budget();
    self
      .warp_timer
      .is_some_and(|timer| timer.time_elapsed() > budget)
  }

  pub fn tried_to_compile(&self) -> bool {
    self.tried_to_compile
  }

  pub fn is_compiled(&self) -> bool {
    self.is_compiled
  }

  pub fn should_try_compile(&self) -> bool {
    !self.tried_to_compile && self.target.runtime.config().compiler_enabled
  }

  /// Attaches compiled code to this thread, reusing the cached result for
  /// its script when there is one. Does nothing after the first call.
  pub fn try_compile(&mut self, compiler: &dyn Compiler) {
    if self.tried_to_compile {
      return;
    }
    self.tried_to_compile = true;

    // Clicked scripts are compiled without hats, so they must not share a
    // cache entry with the script started normally.
    let can_cache = !self.stack_click;

    let blocks = if self.block_container.get_block(&self.top_block).is_some() {
      Rc::clone(&self.block_container)
    } else {
      self.target.runtime.flyout_blocks()
    };
    let cached = if can_cache {
      blocks.get_cached_compile_result(&self.top_block)
    } else {
      None
    };

    let result = match cached {
      Some(Err(error)) => {
        debug!("not compiling {} after earlier error: {error}", self.top_block);
        return;
      }
      Some(Ok(result)) => {
        debug!("using cached compile result for {}", self.top_block);
        result
      }
      None => match compiler.compile(self) {
        Ok(script) => {
          let script = Rc::new(script);
          if can_cache {
            blocks.cache_compile_result(&self.top_block, Rc::clone(&script));
          }
          script
        }
        Err(error) => {
          error!("cannot compile script {}: {error}", self.target.get_name());
          if can_cache {
            blocks.cache_compile_error(&self.top_block, error.clone());
          }
          self.target.runtime.emit_compile_error(&self.target, &error);
          return;
        }
      },
    };

    let procedures = result
      .procedures
      .iter()
      .map(|(code, factory)| (code.clone(), factory(self)))
      .collect();
    self.procedures = procedures;
    self.generator = Some((result.starting_function)(self));
    self.executable_hat = result.executable_hat;

    if !self.block_container.force_no_glow {
      self.block_glow_in_frame = Some(self.top_block.clone());
      self.request_script_glow_in_frame = true;
    }

    self.is_compiled = true;
  }

  pub fn procedure(&self, procedure_code: &str) -> Option<Procedure> {
    self.procedures.get(procedure_code).cloned()
  }

  /// Runs the compiled script until it next stops.
  pub fn resume_compiled(&mut self) -> Step {
    match self.status {
      Status::Done => return Step::Completed(None),
      Status::PromiseWait => return Step::Suspended(Status::PromiseWait),
      Status::Yield | Status::YieldTick => self.status = Status::Running,
      Status::Running => {}
    }
    let Some(mut generator) = self.generator.take() else {
      return Step::Completed(None);
    };

    let step = generator.resume(self);
    if self.status == Status::Done {
      // Stopped from inside, e.g. by retiring the thread.
      self.request_script_glow_in_frame = false;
      return Step::Completed(None);
    }
    match step {
      Step::Suspended(Status::Done) => {
        self.status = Status::Done;
        self.request_script_glow_in_frame = false;
        Step::Completed(None)
      }
      Step::Suspended(status) => {
        self.status = status;
        self.generator = Some(generator);
        step
      }
      Step::Completed(_) => {
        self.status = Status::Done;
        self.request_script_glow_in_frame = false;
        step
      }
    }
  }

  /// Overwrites the bottom of the stack; used to give legacy blocks a
  /// block id to look at.
  pub(crate) fn replace_stack_base(&mut self, block_id: &str) {
    match self.stack.first_mut() {
      Some(base) => *base = Some(block_id.to_string()),
      None => self.push_stack(block_id),
    }
  }

  fn with_block<R>(&self, id: &str, f: impl FnOnce(&Block) -> R) -> Option<R> {
    if let Some(block) = self.block_container.get_block(id) {
      return Some(f(block));
    }
    if let Some(block) = self.target.blocks.get_block(id) {
      return Some(f(block));
    }
    self.target.runtime.flyout_blocks().get_block(id).map(f)
  }

  fn release_frames(&mut self) {
    for frame in self.stack_frames.drain(..) {
      self.pool.release(frame);
    }
  }
}

impl Drop for Thread {
  fn drop(&mut self) {
    self.release_frames();
  }
}

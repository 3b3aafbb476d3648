#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use blockrun::{
  Blocks, CompileError, Config, FramePool, Op, Runtime, Sequencer, Target,
  Thread,
};
use serde_json::json;

pub fn init_logger() {
  let _ = pretty_env_logger::try_init();
}

pub struct TestSequencer;

impl Sequencer for TestSequencer {
  fn retire_thread(&self, thread: &mut Thread) {
    thread.retire();
  }
}

pub struct TestRuntime {
  pub config: Config,
  pub flyout: Rc<Blocks>,
  pub sequencer: Rc<dyn Sequencer>,
  pub compile_errors: RefCell<Vec<(String, CompileError)>>,
}

impl Runtime for TestRuntime {
  fn config(&self) -> &Config {
    &self.config
  }

  fn flyout_blocks(&self) -> Rc<Blocks> {
    Rc::clone(&self.flyout)
  }

  fn sequencer(&self) -> Option<Rc<dyn Sequencer>> {
    Some(Rc::clone(&self.sequencer))
  }

  fn emit_compile_error(&self, target: &Target, error: &CompileError) {
    self
      .compile_errors
      .borrow_mut()
      .push((target.name.clone(), error.clone()));
  }
}

pub fn blocks(json: serde_json::Value) -> Blocks {
  Blocks::from_json(&json.to_string()).unwrap()
}

/// A script the tests build threads from:
/// `hat -> call -> say`, where `call` runs `greet %s`.
pub fn script_blocks() -> Blocks {
  blocks(json!({
    "hat": {
      "opcode": "event_whenflagclicked",
      "next": "call",
      "topLevel": true
    },
    "call": {
      "opcode": "procedures_call",
      "next": "say",
      "mutation": { "tagName": "mutation", "proccode": "greet %s" }
    },
    "say": { "opcode": "looks_say" },
    "last_call": {
      "opcode": "procedures_call",
      "mutation": { "proccode": "greet %s" }
    },
    "other_call": {
      "opcode": "procedures_call",
      "mutation": { "proccode": "wave" }
    },
    "repeat": { "opcode": "control_repeat" },
    "wait": { "opcode": "control_wait" }
  }))
}

pub struct Fixture {
  pub runtime: Rc<TestRuntime>,
  pub target: Rc<Target>,
  pub pool: FramePool,
}

impl Fixture {
  pub fn new() -> Self {
    Fixture::build(script_blocks(), Blocks::new(), Config::default())
  }

  pub fn build(blocks: Blocks, flyout: Blocks, config: Config) -> Self {
    let runtime = Rc::new(TestRuntime {
      config,
      flyout: Rc::new(flyout),
      sequencer: Rc::new(TestSequencer),
      compile_errors: RefCell::new(Vec::new()),
    });
    let target = Target::new(
      "sprite1",
      "Sprite1",
      Rc::new(blocks),
      Rc::clone(&runtime) as Rc<dyn Runtime>,
    );
    Fixture {
      runtime,
      target,
      pool: FramePool::new(),
    }
  }

  pub fn thread(&self, top_block: &str) -> Thread {
    Thread::new(
      top_block,
      Rc::clone(&self.target),
      Rc::clone(&self.target.blocks),
      self.pool.clone(),
    )
  }

  /// A thread running blocks from the runtime's flyout.
  pub fn flyout_thread(&self, stack: &[&str]) -> Thread {
    let mut thread = Thread::new(
      stack.first().copied().unwrap_or_default(),
      Rc::clone(&self.target),
      Rc::clone(&self.runtime.flyout),
      self.pool.clone(),
    );
    for id in stack {
      push_with_op(&mut thread, id);
    }
    thread
  }

  /// Pushes each block and records it as the frame's op, like an
  /// interpreter entering it would.
  pub fn thread_with_stack(&self, stack: &[&str]) -> Thread {
    let mut thread = self.thread(stack.first().copied().unwrap_or("hat"));
    for id in stack {
      push_with_op(&mut thread, id);
    }
    thread
  }
}

pub fn push_with_op(thread: &mut Thread, id: &str) {
  let opcode = thread
    .block_container
    .get_block(id)
    .map(|block| block.opcode.clone())
    .unwrap_or_default();
  thread.push_stack(id);
  thread.peek_stack_frame_mut().unwrap().op = Some(Op::new(id, &opcode));
}

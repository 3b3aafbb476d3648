use std::rc::Rc;

use derivative::Derivative;

use crate::{
  blocks::Blocks, compiler::CompileError, config::Config, thread::Thread,
};

/// The outer runtime a target belongs to.
pub trait Runtime {
  fn config(&self) -> &Config;

  /// Blocks shown in the palette, which can be run by clicking them.
  fn flyout_blocks(&self) -> Rc<Blocks>;

  fn sequencer(&self) -> Option<Rc<dyn Sequencer>>;

  /// Called once per failed compilation.
  fn emit_compile_error(&self, target: &Target, error: &CompileError);
}

/// Steps threads each tick.
pub trait Sequencer {
  /// Stops `thread` so it is never stepped again.
  fn retire_thread(&self, thread: &mut Thread);
}

/// A sprite or the stage.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Target {
  pub id: String,
  pub name: String,
  pub blocks: Rc<Blocks>,
  #[derivative(Debug = "ignore")]
  pub runtime: Rc<dyn Runtime>,
}

impl Target {
  pub fn new(
    id: &str,
    name: &str,
    blocks: Rc<Blocks>,
    runtime: Rc<dyn Runtime>,
  ) -> Rc<Target> {
    Rc::new(Target {
      id: id.to_string(),
      name: name.to_string(),
      blocks,
      runtime,
    })
  }

  pub fn get_name(&self) -> &str {
    &self.name
  }
}

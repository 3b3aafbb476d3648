use std::{cell::RefCell, collections::HashMap, rc::Rc};

use log::trace;

use crate::{
  block::Block,
  compiler::{CompileError, CompiledScript},
};

/// What the compile cache remembers about a script.
pub type CompileOutcome = Result<Rc<CompiledScript>, CompileError>;

/// A block graph keyed by block id, as found in a target or the flyout.
#[derive(Debug, Default)]
pub struct Blocks {
  blocks: HashMap<String, Block>,
  compile_cache: RefCell<HashMap<String, CompileOutcome>>,
  /// Disables the glow request scripts from this container make on compile.
  pub force_no_glow: bool,
}

impl Blocks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reads an sb3 style `{ "id": { "opcode": .. } }` block map.
  pub fn from_json(json: &str) -> serde_json::Result<Self> {
    let blocks: HashMap<String, Block> = serde_json::from_str(json)?;
    Ok(Blocks {
      blocks,
      ..Default::default()
    })
  }

  pub fn insert(&mut self, id: &str, block: Block) {
    self.blocks.insert(id.to_string(), block);
    self.reset_cache();
  }

  pub fn get_block(&self, id: &str) -> Option<&Block> {
    self.blocks.get(id)
  }

  /// The block that runs after `id` at the same stack depth.
  pub fn get_next_block(&self, id: &str) -> Option<String> {
    self.blocks.get(id).and_then(|block| block.next.clone())
  }

  pub fn get_cached_compile_result(
    &self,
    top_block: &str,
  ) -> Option<CompileOutcome> {
    self.compile_cache.borrow().get(top_block).cloned()
  }

  pub fn cache_compile_result(
    &self,
    top_block: &str,
    script: Rc<CompiledScript>,
  ) {
    trace!("caching compiled script for {top_block}");
    self
      .compile_cache
      .borrow_mut()
      .insert(top_block.to_string(), Ok(script));
  }

  pub fn cache_compile_error(&self, top_block: &str, error: CompileError) {
    trace!("caching compile error for {top_block}");
    self
      .compile_cache
      .borrow_mut()
      .insert(top_block.to_string(), Err(error));
  }

  pub fn reset_cache(&self) {
    self.compile_cache.borrow_mut().clear();
  }
}

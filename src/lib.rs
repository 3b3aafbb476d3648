//! Threads for a block based runtime: the stack and frames a script needs to
//! be suspended and resumed, and the glue that attaches compiled code to it.

pub mod block;
pub mod blocks;
pub mod compat;
pub mod compiler;
pub mod config;
pub mod frame;
pub mod target;
pub mod thread;
pub mod timer;

pub use block::{Block, Mutation, Value};
pub use blocks::Blocks;
pub use compat::{call_legacy_block, BlockUtility, CompatBlockUtility};
pub use compiler::{CompileError, CompiledScript, Compiler, Coroutine, Step};
pub use config::Config;
pub use frame::{ExecutionContext, FramePool, Op, StackFrame};
pub use target::{Runtime, Sequencer, Target};
pub use thread::{Status, Thread};

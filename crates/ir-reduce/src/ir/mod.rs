mod builder;
mod display;
mod instruction;
mod module;
pub mod optimizer;
mod verify;

pub use builder::FunctionBuilder;
pub use instruction::{BinOp, Inst, Operand, Ty, ValueId};
pub use module::{Block, BlockId, FuncId, Function, InstId, Module};
pub use verify::{verify_function, verify_module};

mod driver;
mod insts_to_args;
mod oracle;
mod reduce_branches;
mod reduce_operands;
mod reduce_passes;
mod reduce_returns;

pub use driver::{
    DeltaPass, InterestingnessTest, Stats, TestRunner, run_delta_pass, run_reduction,
};
pub use insts_to_args::InstsToArgs;
pub use oracle::{Chunk, Oracle, partition};
pub use reduce_branches::ReduceBranches;
pub use reduce_operands::ReduceOperands;
pub use reduce_passes::ReducePasses;
pub use reduce_returns::ReduceReturns;

/// Every reduction pass, in default pipeline order: control flow first so
/// later passes see fewer blocks, then value-level passes, then whole
/// optimizer sweeps.
pub fn default_passes() -> Vec<Box<dyn DeltaPass>> {
    vec![
        Box::new(ReduceBranches::to_true()),
        Box::new(ReduceBranches::to_false()),
        Box::new(InstsToArgs),
        Box::new(ReduceOperands),
        Box::new(ReduceReturns),
        Box::new(ReducePasses),
    ]
}

pub fn pass_by_name(name: &str) -> Option<Box<dyn DeltaPass>> {
    match name {
        "reduce-branches-true" => Some(Box::new(ReduceBranches::to_true())),
        "reduce-branches-false" => Some(Box::new(ReduceBranches::to_false())),
        "insts-to-args" => Some(Box::new(InstsToArgs)),
        "reduce-operands" => Some(Box::new(ReduceOperands)),
        "reduce-returns" => Some(Box::new(ReduceReturns)),
        "reduce-passes" => Some(Box::new(ReducePasses)),
        _ => None,
    }
}

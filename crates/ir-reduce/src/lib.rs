#![allow(
    clippy::cast_possible_truncation, // intentional: i64 constant payloads narrowed for 32-bit folds
    clippy::cast_possible_wrap, // intentional: unsigned/signed reinterpretation in constant folding
    clippy::cast_sign_loss, // intentional: same reinterpretation, other direction
    clippy::missing_errors_doc // error conditions are described on the Error variants
)]

pub mod delta;
pub mod error;
pub mod ir;

/// Test harness module for writing unit and integration tests.
///
/// This module is only available when running tests or when the
/// `test-harness` feature is enabled.
#[cfg(any(test, feature = "test-harness"))]
pub mod test_harness;

pub use delta::{
    DeltaPass, InterestingnessTest, Stats, TestRunner, default_passes, pass_by_name,
    run_delta_pass, run_reduction,
};
pub use error::{Error, Result};
pub use ir::{Function, FunctionBuilder, Inst, Module, Operand, Ty, verify_module};

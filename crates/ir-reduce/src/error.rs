#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed program: {0}")]
    Malformed(String),

    #[error("unsupported construct: {0}")]
    Unsupported(String),

    #[error("oracle consulted {actual} features, expected {expected}")]
    OracleMismatch { expected: usize, actual: usize },

    #[error("interestingness test error: {0}")]
    Test(String),

    #[error("function index {0} not found")]
    FunctionNotFound(u32),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

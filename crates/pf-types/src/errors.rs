use thiserror::Error;

use crate::coords::InstanceCoord;

/// Main error type for the PhaseFront system
#[derive(Error, Debug)]
pub enum PfError {
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    #[error("Surrogate error: {0}")]
    Model(#[from] ModelError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Division by zero: {context}")]
    DivideByZero { context: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors from invoking external executables
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Executable not found: {path}")]
    ExecutableNotFound { path: String },

    #[error("Failed to launch {executable}: {message}")]
    Spawn { executable: String, message: String },

    #[error("Failed to feed input to {executable}: {message}")]
    Stdin { executable: String, message: String },

    #[error("Non-numeric output from {executable}: {line:?}")]
    Parse { executable: String, line: String },

    #[error("{executable} exceeded its {timeout_secs}s budget and was killed")]
    Timeout { executable: String, timeout_secs: u64 },
}

/// Errors from the surrogate model lifecycle
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid surrogate state: {message}")]
    InvalidState { message: String },

    #[error("No fresh proposals for {solver}: conditioning produced only known coordinates")]
    NoFreshProposals { solver: String },
}

/// Errors from metric computation
#[derive(Error, Debug)]
pub enum MetricError {
    #[error("No pairable results for {solver} at {instance}")]
    EmptyGroup {
        solver: String,
        instance: InstanceCoord,
    },

    #[error("{solver} produced no output rows for seed {seed}")]
    EmptyMeasurement { solver: String, seed: u64 },

    #[error("Reference output has zero norm for {solver} at {instance}")]
    ZeroNormReference {
        solver: String,
        instance: InstanceCoord,
    },
}

/// Errors from checkpoint and observation persistence
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Checkpoint already exists: {path}")]
    CheckpointExists { path: String },

    #[error("Corrupt archive {path}: {message}")]
    Corrupt { path: String, message: String },
}

/// Result type alias for PhaseFront operations
pub type PfResult<T> = Result<T, PfError>;

/// Helper macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::PfError::Config(format!($($arg)*))
    };
}

/// Helper macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::PfError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let error = PfError::Config("no solvers configured".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: no solvers configured"
        );

        let error = PfError::DivideByZero {
            context: "m is zero".to_string(),
        };
        assert!(error.to_string().contains("m is zero"));
    }

    #[test]
    fn sub_errors_convert() {
        let exec = ExecError::ExecutableNotFound {
            path: "bin/vrls".to_string(),
        };
        let error: PfError = exec.into();
        assert!(matches!(error, PfError::Exec(_)));
        assert!(error.to_string().contains("bin/vrls"));

        let metric = MetricError::EmptyGroup {
            solver: "vrls".to_string(),
            instance: InstanceCoord::new(10, 100, 1000),
        };
        let error: PfError = metric.into();
        assert!(error.to_string().contains("(k=10, m=100, n=1000)"));
    }

    #[test]
    fn error_macros() {
        let error = config_error!("bad worker count: {}", 0);
        assert!(matches!(error, PfError::Config(_)));
        assert!(error.to_string().contains("bad worker count: 0"));

        let error = internal_error!("no surrogate for {}", "vrls");
        assert!(matches!(error, PfError::Internal(_)));
    }
}

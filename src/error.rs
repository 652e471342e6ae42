use thiserror::Error;

use crate::ir::{BlockId, OperatorId, VarId};

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Construction Errors
/// - [`Error::ConstantResult`] - A constant was supplied where a mutable result is required
///
/// ## Graph Errors
/// - [`Error::UnknownBlock`] - A block id that the method does not own
/// - [`Error::UnknownOperator`] - An operator id that the method does not own
/// - [`Error::UnknownVariable`] - A variable handle outside of the variable table
///
/// ## Parse Errors
/// - [`Error::MalformedAttribute`] - A numeric attribute did not parse; only the node is dropped
/// - [`Error::DanglingReference`] - A forward reference did not resolve during the second pass
/// - [`Error::DuplicateId`] - A block id repeats within one method
/// - [`Error::Xml`] - The document is not well-formed
///
/// ## Protocol and Pipeline Errors
/// - [`Error::UnbalancedContext`] - A transformation context was finished with frames left on it
/// - [`Error::NotSupported`] - The operation cannot be applied to this input
///
/// Capability and legality queries on operators never produce errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A constant expression was used where a mutable result operand is required.
    ///
    /// Result operands of an operator must be variables or physical registers. This is a
    /// construction-time invariant and is never coerced.
    #[error("Constant expression '{0}' cannot be used as an operator result")]
    ConstantResult(String),

    /// The method does not own a basic block with this id.
    #[error("Unknown basic block - {0}")]
    UnknownBlock(BlockId),

    /// The method does not own an operator with this id.
    #[error("Unknown operator - {0}")]
    UnknownOperator(OperatorId),

    /// The variable handle does not index into the variable table.
    #[error("Unknown variable - {0}")]
    UnknownVariable(VarId),

    /// A numeric attribute of a dump node could not be parsed.
    ///
    /// Only the node carrying the attribute is dropped; the rest of the document is kept.
    #[error("Malformed attribute '{attribute}' on <{node}>: '{value}'")]
    MalformedAttribute {
        /// The element name of the offending node
        node: String,
        /// The attribute that failed to parse
        attribute: String,
        /// The raw attribute value
        value: String,
    },

    /// A reference in the dump could not be resolved in the second parsing pass.
    #[error("Dangling {kind} reference '{id}' in <{node}>")]
    DanglingReference {
        /// The element name of the node holding the reference
        node: String,
        /// What kind of element the reference should point to
        kind: &'static str,
        /// The id that could not be found
        id: String,
    },

    /// A dump node repeats an id that an earlier node of the same method already uses.
    ///
    /// The later node is dropped.
    #[error("Duplicate {node} id '{id}'")]
    DuplicateId {
        /// The element name of the repeated node
        node: String,
        /// The repeated id
        id: String,
    },

    /// The input is not a well-formed XML document.
    #[error("XML error - {0}")]
    Xml(String),

    /// A transformation context still had frames on its stack when it was finished.
    #[error("Transformation context finished with {0} frame(s) still pushed")]
    UnbalancedContext(usize),

    /// The operation cannot be applied to this input.
    #[error("Operation not supported - {0}")]
    NotSupported(String),

    /// An internal structure is damaged.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

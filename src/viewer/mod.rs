//! Parsed model of XML IR dumps for navigation tools.
//!
//! A dump written by [`XmlDumper`](crate::ir::XmlDumper) is read back into a [`Document`]:
//! plain data (names, rendered text, spans) plus resolved positions for edges and reaching
//! definitions. Navigation tools use it to jump between methods through call targets, between
//! blocks through edges, and from a use to its reaching definitions.
//!
//! # Usage
//!
//! ```rust
//! use armir::viewer::Parser;
//!
//! let xml = r#"<Methods><Method Name="Main">
//!   <BasicBlock Id="BB0" Index="0" Type="EntryBasicBlock">
//!     <Edge From="BB0" To="BB1" Kind="Unconditional"/>
//!     <Operator Index="0" Type="DirectCall" Call="Helper">call Helper()</Operator>
//!   </BasicBlock>
//!   <BasicBlock Id="BB1" Index="1" Type="ExitBasicBlock"/>
//! </Method><Method Name="Helper"/></Methods>"#;
//!
//! let outcome = Parser::default().parse_str(xml)?;
//! let main = outcome.document.method("Main").unwrap();
//! let call = &main.basic_blocks[0].operators[0];
//! assert_eq!(outcome.document.resolve_call(call).map(|m| m.name.as_str()), Some("Helper"));
//! # Ok::<(), armir::Error>(())
//! ```

mod model;
mod parser;
mod xmltree;

pub use model::{
    BasicBlock, BasicBlockEdge, BlockRef, Debug, Document, Method, Operator, OperatorRef,
    ReachingDefinition, Variable,
};
pub use parser::{ParseOutcome, Parser};

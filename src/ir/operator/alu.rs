//! ALU operation codes.

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// Arithmetic and logic operation codes used by ALU-style operators.
///
/// The same code set describes the main operation and the shift applied to the last operand of
/// [`BinaryOpWithShift`](crate::ir::BinaryOpWithShift).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Alu {
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Remainder
    Rem,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise exclusive or
    Xor,
    /// Shift left
    Shl,
    /// Shift right
    Shr,
}

impl Alu {
    /// Returns `true` if the operands of this operation may be swapped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armir::ir::Alu;
    ///
    /// assert!(Alu::Xor.is_commutative());
    /// assert!(!Alu::Sub.is_commutative());
    /// ```
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        matches!(self, Self::Add | Self::Mul | Self::And | Self::Or | Self::Xor)
    }

    /// Returns `true` for the two shift codes.
    #[must_use]
    pub const fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_round_trip() {
        for alu in Alu::iter() {
            let name = alu.to_string();
            assert_eq!(name.parse::<Alu>().unwrap(), alu);
        }
        assert_eq!(Alu::Shl.to_string(), "SHL");
    }

    #[test]
    fn commutative_set() {
        let commutative: Vec<_> = Alu::iter().filter(|a| a.is_commutative()).collect();
        assert_eq!(
            commutative,
            vec![Alu::Add, Alu::Mul, Alu::And, Alu::Or, Alu::Xor]
        );
    }
}

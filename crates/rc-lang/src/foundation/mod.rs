//! Shared foundation types for the RC compiler.

pub mod span;

pub use span::{SourceFile, SourceMap, Span};

use serde::{Deserialize, Serialize};

/// Intrinsic or indirection mutability of an expression.
///
/// Ordered `Foreign < Immutable < Mutable`: a slot may always receive a value
/// whose indirection mutability is at least as permissive as its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Mutability {
    /// The value may be read but never written or retained.
    Foreign,
    /// The value may be read.
    Immutable,
    /// The value may be read and written.
    Mutable,
}

impl Mutability {
    /// The weaker of two mutabilities.
    pub fn min(self, other: Mutability) -> Mutability {
        if self <= other {
            self
        } else {
            other
        }
    }
}

/// How an expression or callable touches its receiver's state.
///
/// Ordered `None < Read < Write`. The composition analyzer uses the
/// per-callable summaries to decide which instances a firing locks.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ReceiverAccess {
    /// The receiver is not touched.
    #[default]
    None,
    /// The receiver is read.
    Read,
    /// The receiver is written.
    Write,
}

impl ReceiverAccess {
    /// Least upper bound of two accesses.
    pub fn lub(self, other: ReceiverAccess) -> ReceiverAccess {
        if self >= other {
            self
        } else {
            other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutability_ordering() {
        assert!(Mutability::Foreign < Mutability::Immutable);
        assert!(Mutability::Immutable < Mutability::Mutable);
        assert_eq!(
            Mutability::Mutable.min(Mutability::Foreign),
            Mutability::Foreign
        );
    }

    #[test]
    fn receiver_access_lub() {
        assert_eq!(
            ReceiverAccess::None.lub(ReceiverAccess::Read),
            ReceiverAccess::Read
        );
        assert_eq!(
            ReceiverAccess::Write.lub(ReceiverAccess::Read),
            ReceiverAccess::Write
        );
        assert_eq!(ReceiverAccess::default(), ReceiverAccess::None);
    }
}

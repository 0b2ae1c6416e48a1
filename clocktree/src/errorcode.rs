// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Standard error enum for clock tree operations.

use core::fmt;

/// Errors returned by clock nodes and by the clock tree.
///
/// Build-time errors (`UnresolvedParent`, `NullNode`, `DuplicateClock`,
/// `AllocationFailure`) abort construction of the whole tree. All other errors
/// are returned by a single operation and leave the tree usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum ErrorCode {
    /// A hardware status bit did not reach the expected state in time
    Timeout = 0,
    /// The node is not in a state that allows the operation
    InvalidState = 1,
    /// A parameter was out of range
    InvalidArgument = 2,
    /// The requested rate cannot be produced by this node
    UnsupportedRate = 3,
    /// The operation is refused for a critical clock
    PermissionDenied = 4,
    /// No clock with this identifier exists
    NotFound = 5,
    /// A topology entry names a parent that was not registered before it
    UnresolvedParent = 6,
    /// A declared clock identifier was never populated
    NullNode = 7,
    /// Two topology entries share an identifier or a name
    DuplicateClock = 8,
    /// The registry has no room for the topology
    AllocationFailure = 9,
}

impl From<ErrorCode> for usize {
    fn from(err: ErrorCode) -> usize {
        err as usize
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ErrorCode::Timeout => "timed out waiting for hardware",
            ErrorCode::InvalidState => "invalid state",
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::UnsupportedRate => "unsupported rate",
            ErrorCode::PermissionDenied => "refused for critical clock",
            ErrorCode::NotFound => "no such clock",
            ErrorCode::UnresolvedParent => "unresolved parent",
            ErrorCode::NullNode => "declared clock never populated",
            ErrorCode::DuplicateClock => "duplicate clock",
            ErrorCode::AllocationFailure => "out of clock slots",
        };
        f.write_str(msg)
    }
}

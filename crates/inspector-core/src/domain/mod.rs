//! Debugger domain vocabulary.
//!
//! Pure types with no infrastructure dependencies.  They describe debugger
//! concepts the way the bridge reasons about them, independent of how either
//! protocol spells them.  The wire spelling lives in small `wire_*` helpers
//! next to each type so translation code never hard-codes strings.

pub mod debugger;

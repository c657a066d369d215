//! Signal codec derivation
//!
//! Building blocks the compiler combines for every signal: bit positions and
//! masks, sign extension, IEEE-754 conversion, linear scaling, multiplexor
//! grouping and layout ordering.

pub mod bits;
pub mod float;
pub mod layout;
pub mod multiplex;
pub mod scaling;

pub use float::FloatFormat;
pub use multiplex::MultiplexLayout;
pub use scaling::Scaling;

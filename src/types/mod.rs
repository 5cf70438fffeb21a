//! Data types shared across the conversion pipeline.

mod cell;
mod drawing;
mod report;
mod style;

pub use cell::*;
pub use drawing::*;
pub use report::*;
pub use style::*;

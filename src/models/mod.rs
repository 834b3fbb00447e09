pub mod dashboard;
pub mod plot;
pub mod result;

pub use dashboard::*;
pub use plot::*;
pub use result::*;

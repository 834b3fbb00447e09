pub mod plots;
pub mod results;

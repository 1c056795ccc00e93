pub mod descriptor;
pub mod phase;

//! Small numeric helpers shared by the indicator states.

pub mod math;

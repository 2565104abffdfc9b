// Pure gameplay rules applied by the round use cases.

pub mod erosion;

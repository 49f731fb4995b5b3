mod face;
mod vector_record;

pub use face::*;
pub use vector_record::*;

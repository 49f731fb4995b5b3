pub const DIMS: usize = 4;

pub const EVENT_A: i64 = 7;
pub const EVENT_B: i64 = 9;
/// Event whose faces are removed by the delete test; keeps other tests independent of it.
pub const EVENT_DELETE: i64 = 31;

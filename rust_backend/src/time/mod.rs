pub mod clock;

pub use clock::{floor_to_minutes, Clock, FrameBound, DEFAULT_SAMPLING_RATE_HZ};

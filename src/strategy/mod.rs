pub mod spike;

pub use spike::{detect_spike, resolve_winner};

pub mod engine;
pub mod projection;

pub use engine::SessionEngine;
pub use projection::RemainingTime;

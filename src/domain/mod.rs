pub mod enums;
pub mod session;
pub mod task;
pub mod tether;

pub use enums::{SessionState, TaskStatus};
pub use session::{ActiveSession, SessionPhase};
pub use task::{TaskDefinition, TaskGroup, TaskRuntime};
pub use tether::Tether;

// Sequencer module
// Track model, cycle alignment, state transitions and the step scheduler

pub mod clock;
pub mod lcm;
pub mod reducer;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod timeline;
pub mod track;

pub use clock::{Clock, ClockError, ClockTick, ClockTime, ReadyFlag, SampleClock, ScheduleHandle};
pub use reducer::{Action, transition};
pub use scheduler::{Scheduler, TransportState};
pub use state::{Limits, PolyrhythmState, RosterEntry};
pub use store::Store;
pub use timeline::{Subdivision, Tempo};
pub use track::{Beat, RotateDirection, Track};

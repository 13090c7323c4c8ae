mod driver;
mod session;
mod state;
mod timer;

pub use driver::{EngineOptions, PollingEngine};
pub use session::{CANCELED_MARKER, NOTHING_YET, PollSession, StatusView, render_result};
pub use state::{Effect, OverlapPolicy, Phase, PollMachine};
pub use timer::{IntervalTimer, MIN_PERIOD};

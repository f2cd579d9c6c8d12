/// Virtual clock and event queue.
pub mod clock;
pub mod engine;
/// Events delivered by the clock.
pub mod event;
pub mod kpi;

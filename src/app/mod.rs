//! Application boundary: ports, events, and the workload task.
//!
//! Everything the update core needs from the outside world is expressed
//! as a **port trait** in [`ports`].  The [`task`] module hosts the
//! application task that cooperates with the pause rendezvous.

pub mod events;
pub mod ports;
pub mod task;

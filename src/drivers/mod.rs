//! Low-level platform drivers.
//!
//! | Driver     | Purpose                                     |
//! |------------|---------------------------------------------|
//! | `task_pin` | Core-pinned FreeRTOS task spawning          |
//! | `watchdog` | Task watchdog subscription for the app task |

pub mod task_pin;
pub mod watchdog;

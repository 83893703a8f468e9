//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter     | Implements              | Connects to                  |
//! |-------------|-------------------------|------------------------------|
//! | `sim_fpga`  | FpgaPort                | In-process thermal ILC model |
//! | `loopback`  | CommandChannel, AckPort | In-process request queue     |
//! | `log_sink`  | EventSink               | `log` facade                 |

pub mod log_sink;
pub mod loopback;
pub mod sim_fpga;

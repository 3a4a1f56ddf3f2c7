//! # zb-modbus - Zigbee to Modbus bridge cluster
//!
//! Device-side implementation of a manufacturer-specific ZCL cluster that
//! carries Modbus transactions, encoded as short JSON strings, over a Zigbee
//! network. The crate is designed for embedded systems and supports `no_std`
//! environments: every buffer has a fixed capacity and nothing allocates.
//!
//! ## Features
//!
//! ### Command queue
//! - **Slot pool**: fixed set of command records, reused after completion
//! - **Dispatcher**: bounded FIFO, admission inside the stack callback and
//!   deferred processing one record per scheduler turn
//! - **Send timeout**: outstanding responses are abandoned after 1000 ms
//!
//! ### Scheduling
//! - Cooperative single-threaded scheduler with callbacks, alarms and
//!   cancellation, driven by task values
//!
//! ### Device glue
//! - Identify mode LED blinking, hall sensor handling, network state LED and
//!   firmware update progress
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! zb-modbus = "0.1.0"
//! ```
//!
//! ### Queueing and draining a command
//!
//! ```rust
//! use zb_modbus::modbus::{
//!     self, CommandAddr, CommandHandler, DataPacketResponse, Dispatcher, DrainOutcome,
//!     JsonCommandRequest, QueueTask, ResponseStatus,
//! };
//! use zb_modbus::scheduler::Scheduler;
//! use zb_modbus::zcl::{
//!     AttrValue, AttributeStore, ClusterRole, IncomingCommand, OutgoingFrame, ParsedHeader,
//!     ZclStack,
//! };
//! # use zb_modbus::error::Error;
//! # struct Echo;
//! # impl CommandHandler for Echo {
//! #     fn handle_json_command(
//! #         &mut self,
//! #         _addr: &CommandAddr,
//! #         request: &JsonCommandRequest,
//! #         resp: &mut DataPacketResponse,
//! #     ) -> ResponseStatus {
//! #         resp.fc = request.len();
//! #         ResponseStatus::Ok
//! #     }
//! # }
//! # struct Radio;
//! # impl ZclStack for Radio {
//! #     fn send_command(&mut self, _frame: &OutgoingFrame<'_>) -> Result<(), Error> { Ok(()) }
//! # }
//! # struct NoAttrs;
//! # impl AttributeStore for NoAttrs {
//! #     fn read_attribute(&self, _: u8, _: u16, _: ClusterRole, _: u16) -> Option<AttrValue> { None }
//! # }
//!
//! let mut dispatcher: Dispatcher<Echo> = Dispatcher::new(Echo);
//! let mut sched: Scheduler<QueueTask, 4, 16> = Scheduler::new();
//!
//! let header = ParsedHeader {
//!     cluster_id: modbus::CLUSTER_ID,
//!     cmd_id: modbus::CMD_JSON_COMMAND_REQ_ID,
//!     seq_number: 7,
//!     ..ParsedHeader::default()
//! };
//! dispatcher.enqueue(&IncomingCommand::new(header, b"\x02{}"), &NoAttrs, &mut sched)?;
//!
//! assert_eq!(sched.run_one_pending_task(0), Some(QueueTask::Drain));
//! let outcome = dispatcher.drain_one(&mut Radio, &mut sched);
//! assert!(matches!(outcome, DrainOutcome::Responded(_)));
//! # Ok::<(), Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging. Without
//!   it, log records go through the `log` facade.

#![cfg_attr(all(not(feature = "std"), not(test)), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Error type shared by every fallible operation.
pub mod error;

/// Cooperative scheduler: callbacks, alarms and cancellation over task values.
pub mod scheduler;

/// Zigbee Cluster Library frame model and the traits consumed from the stack.
pub mod zcl;

/// The Modbus vendor cluster: wire format, slot pool, dispatcher and handlers.
pub mod modbus;

/// Board LEDs and buttons.
pub mod gpio;

/// Application glue tying the cluster, the scheduler and the board together.
pub mod device;

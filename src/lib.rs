// Copyright 2020-2022 The NATS Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A command line client for the NATS.io ecosystem.
//!
//! The `sub` command subscribes to a subject, optionally in a queue group
//! or on a generated inbox, and prints every message it receives. Messages
//! delivered by a `JetStream` consumer can be acknowledged as they arrive.
//!
//! `> cargo run -- sub --help`
//!
//! ## Example
//!
//! ```no_run
//! # fn main() -> std::io::Result<()> {
//! use nats_box::{ConnectOptions, Shutdown, SubCommand};
//!
//! let cmd = SubCommand {
//!     subject: Some("orders.>".to_string()),
//!     queue: Some("workers".to_string()),
//!     ack: true,
//!     ..Default::default()
//! };
//!
//! let (_trigger, shutdown) = Shutdown::new();
//! cmd.run(&ConnectOptions::new("demo.nats.io"), &shutdown)?;
//! # Ok(()) }
//! ```

#![deny(missing_docs, nonstandard_style, unsafe_code)]
#![warn(rust_2018_idioms)]

/// Header constants and types.
pub mod header;

mod message;
mod options;
mod shutdown;
mod sub;
mod transport;

pub use header::HeaderMap;
pub use message::{Message, MessageInfo};
pub use options::{ConnectOptions, DEFAULT_SERVER};
pub use shutdown::{Shutdown, Trigger};
pub use sub::{MessagePrinter, SubCommand};
pub use transport::{new_inbox, MessageHandler, NatsTransport, Transport};

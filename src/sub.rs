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

use std::{
    io::{self, Write},
    sync::Arc,
};

use log::{error, info};
use parking_lot::Mutex;
use structopt::StructOpt;

use crate::{
    message::{Message, MessageInfo},
    options::ConnectOptions,
    shutdown::Shutdown,
    transport::{self, NatsTransport, Transport},
};

/// Generic subscription client.
#[derive(Debug, Clone, Default, StructOpt)]
#[structopt(after_help = "EXAMPLES:
    # To subscribe to messages, in a queue group and acknowledge any JetStream ones
    nats-box sub source.subject --queue work --ack

    # To subscribe to a randomly generated inbox
    nats-box sub --inbox")]
pub struct SubCommand {
    /// Subject to subscribe to
    pub subject: Option<String>,

    /// Subscribe to a named queue group
    #[structopt(long)]
    pub queue: Option<String>,

    /// Show the raw data received
    #[structopt(short, long)]
    pub raw: bool,

    /// Acknowledge JetStream messages that have the correct metadata
    #[structopt(long)]
    pub ack: bool,

    /// Subscribe to a generated inbox
    #[structopt(short, long)]
    pub inbox: bool,
}

impl SubCommand {
    /// The subject to subscribe on. A missing subject is only allowed in
    /// inbox mode, where a fresh inbox is generated instead.
    pub fn resolve_subject(&self) -> io::Result<String> {
        match self.subject.as_deref() {
            Some(subject) if !subject.is_empty() => Ok(subject.to_string()),
            _ if self.inbox => Ok(transport::new_inbox()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "subject is required",
            )),
        }
    }

    fn queue(&self) -> Option<&str> {
        self.queue.as_deref().filter(|queue| !queue.is_empty())
    }

    /// Connect with `options` and print every received message to stdout
    /// until `shutdown` fires.
    pub fn run(&self, options: &ConnectOptions, shutdown: &Shutdown) -> io::Result<()> {
        let subject = self.resolve_subject()?;
        let transport = Arc::new(NatsTransport::connect(options)?);
        self.subscribe(&subject, transport, io::stdout(), shutdown)
    }

    /// Subscribe to `subject` over an established transport and write the
    /// received messages to `out` until `shutdown` fires.
    ///
    /// The transport is closed before returning, on success or error.
    pub fn subscribe<T, W>(
        &self,
        subject: &str,
        transport: Arc<T>,
        out: W,
        shutdown: &Shutdown,
    ) -> io::Result<()>
    where
        T: Transport,
        W: Write + Send + 'static,
    {
        let _close = CloseOnDrop(&*transport);

        if !self.raw || self.inbox {
            if self.ack {
                info!(
                    "Subscribing on {} with acknowledgement of JetStream messages",
                    subject
                );
            } else {
                info!("Subscribing on {}", subject);
            }
        }

        let printer = MessagePrinter::new(transport.clone(), out, self.raw, self.ack);
        transport.subscribe(
            subject,
            self.queue(),
            Box::new(move |msg| printer.handle(msg)),
        )?;

        transport.flush()?;
        if let Some(err) = transport.last_error() {
            return Err(err);
        }

        shutdown.wait();
        Ok(())
    }
}

struct CloseOnDrop<'a, T: Transport>(&'a T);

impl<T: Transport> Drop for CloseOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.close();
    }
}

struct Output<W> {
    received: u64,
    out: W,
}

/// Displays and optionally acknowledges messages.
///
/// The counter and the output sink share one lock that is held for the
/// whole of `handle`, so concurrently delivered messages never interleave
/// and indices follow processing order.
pub struct MessagePrinter<T, W> {
    transport: Arc<T>,
    raw: bool,
    ack: bool,
    output: Mutex<Output<W>>,
}

impl<T: Transport, W: Write> MessagePrinter<T, W> {
    /// Create a printer writing to `out`. With `ack`, messages carrying
    /// delivery metadata are acknowledged through `transport`.
    pub fn new(transport: Arc<T>, out: W, raw: bool, ack: bool) -> MessagePrinter<T, W> {
        MessagePrinter {
            transport,
            raw,
            ack,
            output: Mutex::new(Output { received: 0, out }),
        }
    }

    /// Handle one received message.
    ///
    /// The acknowledgement is sent after the message was written, even if
    /// writing it failed. Acknowledgement failures are logged and dropped.
    pub fn handle(&self, msg: Message) -> io::Result<()> {
        let mut output = self.output.lock();
        output.received += 1;
        let index = output.received;

        let info = match msg.reply.as_deref() {
            Some(reply) if !reply.is_empty() => msg.message_info().ok(),
            _ => None,
        };

        let result = self.display(&mut output.out, index, &msg, info.as_ref());

        if self.ack && info.is_some() {
            self.acknowledge(&msg);
        }

        result
    }

    fn display(
        &self,
        out: &mut W,
        index: u64,
        msg: &Message,
        info: Option<&MessageInfo<'_>>,
    ) -> io::Result<()> {
        if self.raw {
            out.write_all(&msg.data)?;
            if !msg.data.ends_with(b"\n") {
                out.write_all(b"\n")?;
            }
            return out.flush();
        }

        match (info, msg.reply.as_deref()) {
            (Some(info), _) => writeln!(
                out,
                "[#{}] Received JetStream message: consumer: {} > {} / subject: {} / \
                 delivered: {} / consumer seq: {} / stream seq: {} / ack: {}",
                index,
                info.stream,
                info.consumer,
                msg.subject,
                info.delivered,
                info.consumer_seq,
                info.stream_seq,
                self.ack
            )?,
            (None, Some(reply)) if !reply.is_empty() => writeln!(
                out,
                "[#{}] Received on {:?} with reply {:?}",
                index, msg.subject, reply
            )?,
            (None, _) => writeln!(out, "[#{}] Received on {:?}", index, msg.subject)?,
        }

        if !msg.headers.is_empty() {
            for (name, values) in &msg.headers {
                for value in values {
                    writeln!(out, "{}: {}", name, value)?;
                }
            }
            writeln!(out)?;
        }

        out.write_all(&msg.data)?;
        if !msg.data.ends_with(b"\n") {
            writeln!(out)?;
        }
        writeln!(out)?;
        out.flush()
    }

    fn acknowledge(&self, msg: &Message) {
        let reply = match msg.reply.as_deref() {
            Some(reply) => reply,
            None => return,
        };
        if let Err(err) = self.transport.publish(reply, b"") {
            error!(
                "Acknowledging message via subject {} failed: {}",
                reply, err
            );
        }
    }
}

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

use std::{io, sync::Arc};

use parking_lot::Mutex;

use crate::{message::Message, options::ConnectOptions};

/// A closure invoked once per received message. It may be called from
/// transport-owned threads, possibly concurrently.
pub type MessageHandler = Box<dyn Fn(Message) -> io::Result<()> + Send + Sync + 'static>;

/// Create a new globally unique inbox subject.
pub fn new_inbox() -> String {
    format!("_INBOX.{}", nuid::next())
}

/// The messaging operations the subscription runner relies on.
pub trait Transport: Send + Sync + 'static {
    /// Register `handler` for messages on `subject`. With a queue group,
    /// each message is handed to only one member of the group.
    fn subscribe(&self, subject: &str, queue: Option<&str>, handler: MessageHandler)
        -> io::Result<()>;

    /// Publish `payload` on `subject`.
    fn publish(&self, subject: &str, payload: &[u8]) -> io::Result<()>;

    /// Send buffered protocol traffic and wait for the server to process it.
    fn flush(&self) -> io::Result<()>;

    /// Take the last asynchronous error reported for this connection.
    fn last_error(&self) -> Option<io::Error>;

    /// Unsubscribe every handler and close the connection.
    fn close(&self);
}

/// A [`Transport`] backed by a `nats` client connection.
pub struct NatsTransport {
    conn: Mutex<Option<nats::Connection>>,
    handlers: Mutex<Vec<nats::Handler>>,
    last_error: Arc<Mutex<Option<io::Error>>>,
}

impl std::fmt::Debug for NatsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsTransport")
            .field("connected", &self.conn.lock().is_some())
            .field("handlers", &self.handlers.lock().len())
            .finish()
    }
}

impl NatsTransport {
    /// Connect using the given options. Asynchronous errors reported by the
    /// server are kept for [`Transport::last_error`].
    pub fn connect(options: &ConnectOptions) -> io::Result<NatsTransport> {
        let last_error = Arc::new(Mutex::new(None));
        let slot = last_error.clone();
        let conn = options
            .to_nats_options()?
            .error_callback(move |err| {
                log::debug!("connection received an error: {}", err);
                *slot.lock() = Some(err);
            })
            .connect(options.servers())?;

        Ok(NatsTransport {
            conn: Mutex::new(Some(conn)),
            handlers: Mutex::new(Vec::new()),
            last_error,
        })
    }

    fn connection(&self) -> io::Result<nats::Connection> {
        self.conn
            .lock()
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection is closed"))
    }
}

impl Transport for NatsTransport {
    fn subscribe(
        &self,
        subject: &str,
        queue: Option<&str>,
        handler: MessageHandler,
    ) -> io::Result<()> {
        let conn = self.connection()?;
        let sub = match queue {
            Some(queue) => conn.queue_subscribe(subject, queue)?,
            None => conn.subscribe(subject)?,
        };
        let handler = sub.with_handler(move |msg| handler(Message::from(msg)));
        self.handlers.lock().push(handler);
        Ok(())
    }

    fn publish(&self, subject: &str, payload: &[u8]) -> io::Result<()> {
        self.connection()?.publish(subject, payload)
    }

    fn flush(&self) -> io::Result<()> {
        self.connection()?.flush()
    }

    fn last_error(&self) -> Option<io::Error> {
        self.last_error.lock().take()
    }

    fn close(&self) {
        for handler in self.handlers.lock().drain(..) {
            if let Err(err) = handler.unsubscribe() {
                log::debug!("failed to unsubscribe handler: {}", err);
            }
        }
        if let Some(conn) = self.conn.lock().take() {
            conn.close();
        }
    }
}

impl Drop for NatsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

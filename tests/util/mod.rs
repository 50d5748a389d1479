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

#![allow(dead_code)]

use std::{
    env, fs,
    io::{self, Write},
    net::{TcpListener, TcpStream},
    path::PathBuf,
    process::{Child, Command},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use nats_box::{HeaderMap, Message, MessageHandler, Shutdown, SubCommand, Transport, Trigger};
use parking_lot::Mutex;

pub const JS_REPLY: &str = "$JS.ACK.ORDERS.NEW.1.22.11.1614779440436214000.3";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A cloneable in-memory output sink.
#[derive(Debug, Clone, Default)]
pub struct Output(Arc<Mutex<Vec<u8>>>);

impl Output {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub subject: String,
    pub payload: Vec<u8>,
    /// Bytes written to the output when the publish happened.
    pub output_len: usize,
}

struct Subscription {
    subject: String,
    queue: Option<String>,
    handler: Arc<MessageHandler>,
}

/// A transport that keeps everything in memory. Tests deliver messages by
/// hand and inspect what was published.
#[derive(Default)]
pub struct MockTransport {
    pub output: Output,
    subscriptions: Mutex<Vec<Subscription>>,
    published: Mutex<Vec<Published>>,
    async_error: Mutex<Option<io::Error>>,
    fail_publish: AtomicBool,
    fail_flush: AtomicBool,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Arc<MockTransport> {
        Arc::new(MockTransport::default())
    }

    pub fn fail_publish(&self) {
        self.fail_publish.store(true, Ordering::SeqCst);
    }

    pub fn fail_flush(&self) {
        self.fail_flush.store(true, Ordering::SeqCst);
    }

    pub fn set_async_error(&self, err: io::Error) {
        *self.async_error.lock() = Some(err);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    pub fn subject(&self) -> Option<String> {
        self.subscriptions.lock().first().map(|s| s.subject.clone())
    }

    pub fn queue(&self) -> Option<String> {
        self.subscriptions
            .lock()
            .first()
            .and_then(|s| s.queue.clone())
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Block until a handler is registered.
    pub fn wait_for_subscription(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.subscription_count() == 0 {
            assert!(Instant::now() < deadline, "no subscription was made");
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Hand `msg` to the first registered handler.
    pub fn deliver(&self, msg: Message) -> io::Result<()> {
        let handler = self
            .subscriptions
            .lock()
            .first()
            .map(|s| s.handler.clone())
            .expect("no subscription to deliver to");
        (**handler)(msg)
    }

    /// Deliver `messages` spread over `threads` threads at once.
    pub fn deliver_concurrently(self: &Arc<Self>, messages: Vec<Message>, threads: usize) {
        let mut buckets: Vec<Vec<Message>> = (0..threads).map(|_| Vec::new()).collect();
        for (i, msg) in messages.into_iter().enumerate() {
            buckets[i % threads].push(msg);
        }

        let workers: Vec<_> = buckets
            .into_iter()
            .map(|bucket| {
                let transport = self.clone();
                thread::spawn(move || {
                    for msg in bucket {
                        transport.deliver(msg).unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
    }
}

impl Transport for MockTransport {
    fn subscribe(
        &self,
        subject: &str,
        queue: Option<&str>,
        handler: MessageHandler,
    ) -> io::Result<()> {
        self.subscriptions.lock().push(Subscription {
            subject: subject.to_string(),
            queue: queue.map(String::from),
            handler: Arc::new(handler),
        });
        Ok(())
    }

    fn publish(&self, subject: &str, payload: &[u8]) -> io::Result<()> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection lost"));
        }
        self.published.lock().push(Published {
            subject: subject.to_string(),
            payload: payload.to_vec(),
            output_len: self.output.len(),
        });
        Ok(())
    }

    fn flush(&self) -> io::Result<()> {
        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "flush timed out"));
        }
        Ok(())
    }

    fn last_error(&self) -> Option<io::Error> {
        self.async_error.lock().take()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A subscriber running on a background thread.
pub struct Running {
    pub transport: Arc<MockTransport>,
    trigger: Trigger,
    handle: thread::JoinHandle<io::Result<()>>,
}

impl Running {
    /// Stop the subscriber and return its result.
    pub fn stop(self) -> io::Result<()> {
        self.trigger.shutdown();
        self.handle.join().unwrap()
    }
}

/// Start `cmd` against a fresh mock transport and wait for it to subscribe.
pub fn spawn_subscriber(cmd: SubCommand) -> Running {
    init_logging();

    let transport = MockTransport::new();
    let (trigger, shutdown) = Shutdown::new();
    let handle = thread::spawn({
        let transport = transport.clone();
        move || {
            let subject = cmd.resolve_subject()?;
            let output = transport.output.clone();
            cmd.subscribe(&subject, transport, output, &shutdown)
        }
    });
    transport.wait_for_subscription();

    Running {
        transport,
        trigger,
        handle,
    }
}

pub fn with_headers(msg: Message, headers: &[(&str, &str)]) -> Message {
    msg.with_headers(headers.iter().cloned().collect::<HeaderMap>())
}

/// A `nats-server` child process, killed and cleaned up on drop.
pub struct Server {
    child: Child,
    port: u16,
    config: Option<PathBuf>,
}

impl Drop for Server {
    fn drop(&mut self) {
        self.child.kill().ok();
        self.child.wait().ok();
        if let Some(config) = &self.config {
            fs::remove_file(config).ok();
        }
    }
}

impl Server {
    pub fn client_url(&self) -> String {
        format!("nats://127.0.0.1:{}", self.port)
    }

    // Wait up to 5s for the server to accept connections.
    fn wait_ready(&self) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while TcpStream::connect(("127.0.0.1", self.port)).is_err() {
            assert!(Instant::now() < deadline, "nats-server did not start");
            thread::sleep(Duration::from_millis(50));
        }
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .unwrap()
}

/// Starts a local NATS server with the given config contents. Returns
/// `None` when no `nats-server` binary is on the `PATH`.
pub fn run_server(cfg: &str) -> Option<Server> {
    init_logging();

    let port = free_port();
    let mut cmd = Command::new("nats-server");
    cmd.arg("-a").arg("127.0.0.1").arg("-p").arg(port.to_string());

    let config = if cfg.is_empty() {
        None
    } else {
        let path = env::temp_dir().join(format!("nats-box-{}.conf", nuid::next()));
        fs::write(&path, cfg).unwrap();
        cmd.arg("-c").arg(&path);
        Some(path)
    };

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            eprintln!("nats-server not found on PATH, skipping");
            if let Some(config) = config {
                fs::remove_file(config).ok();
            }
            return None;
        }
        Err(err) => panic!("failed to start nats-server: {}", err),
    };

    let server = Server {
        child,
        port,
        config,
    };
    server.wait_ready();
    Some(server)
}

/// Starts a local basic NATS server.
pub fn run_basic_server() -> Option<Server> {
    run_server("")
}

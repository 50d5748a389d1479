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

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

/// Fires a [`Shutdown`].
///
/// Clones share the same signal. Nothing is ever sent over the channel:
/// waiters wake up once the sender is gone, either because `shutdown` was
/// called or because every `Trigger` was dropped.
#[derive(Debug, Clone)]
pub struct Trigger {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl Trigger {
    /// Wake every current and future waiter.
    pub fn shutdown(&self) {
        self.tx.lock().take();
    }
}

/// A cancellation token handed to long running commands.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: Receiver<()>,
}

impl Shutdown {
    /// Create a linked trigger and token.
    pub fn new() -> (Trigger, Shutdown) {
        let (tx, rx) = crossbeam_channel::bounded(0);
        let trigger = Trigger {
            tx: Arc::new(Mutex::new(Some(tx))),
        };
        (trigger, Shutdown { rx })
    }

    /// Block until shutdown is requested.
    pub fn wait(&self) {
        while self.rx.recv().is_ok() {}
    }
}

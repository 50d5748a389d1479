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

use std::{fmt, io, str::FromStr};

use crate::header::HeaderMap;

const ACK_PREFIX: &str = "$JS.ACK.";

/// A message received on a subject.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// The subject this message came from.
    pub subject: String,

    /// Optional reply subject that may be used for sending a response to this
    /// message.
    pub reply: Option<String>,

    /// Headers associated with this `Message`, empty if none were sent.
    pub headers: HeaderMap,

    /// The message contents.
    pub data: Vec<u8>,
}

impl From<nats::Message> for Message {
    fn from(msg: nats::Message) -> Message {
        Message {
            headers: msg.headers.as_ref().map(HeaderMap::from).unwrap_or_default(),
            subject: msg.subject,
            reply: msg.reply,
            data: msg.data,
        }
    }
}

impl Message {
    /// Creates a new `Message` that is not bound to any connection.
    pub fn new(subject: &str, reply: Option<&str>, data: impl AsRef<[u8]>) -> Message {
        Message {
            subject: subject.to_string(),
            reply: reply.map(String::from),
            data: data.as_ref().to_vec(),
            headers: HeaderMap::new(),
        }
    }

    /// Attach headers to this message.
    pub fn with_headers(mut self, headers: HeaderMap) -> Message {
        self.headers = headers;
        self
    }

    /// Parse the `JetStream` delivery metadata encoded in the reply subject.
    ///
    /// Fails with `InvalidInput` when there is no reply subject and with
    /// `InvalidData` when the reply subject is not a well formed
    /// `JetStream` acknowledgement subject.
    pub fn message_info(&self) -> io::Result<MessageInfo<'_>> {
        let reply = self.reply.as_deref().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "message has no reply subject")
        })?;
        MessageInfo::parse(reply)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("Message")
            .field("subject", &self.subject)
            .field("headers", &self.headers)
            .field("reply", &self.reply)
            .field("length", &self.data.len())
            .finish()
    }
}

/// Delivery bookkeeping attached to messages consumed from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageInfo<'a> {
    /// The stream name.
    pub stream: &'a str,
    /// The consumer name.
    pub consumer: &'a str,
    /// The number of delivery attempts for this message.
    pub delivered: u64,
    /// The stream sequence number of this message.
    pub stream_seq: u64,
    /// The consumer sequence number of this message.
    pub consumer_seq: u64,
}

impl<'a> MessageInfo<'a> {
    /// Parse an acknowledgement subject.
    ///
    /// Two layouts exist: the legacy one with 7 tokens after `$JS.ACK.` and
    /// the current one with domain and account hash prepended, which may
    /// carry further trailing tokens. The publish timestamp and pending
    /// count must be numeric but are not kept.
    pub fn parse(reply: &'a str) -> io::Result<MessageInfo<'a>> {
        let rest = reply
            .strip_prefix(ACK_PREFIX)
            .ok_or_else(|| invalid(reply, "not an acknowledgement subject"))?;
        let tokens: Vec<&str> = rest.split('.').collect();

        let tokens = match tokens.len() {
            7 => &tokens[..],
            n if n >= 9 => &tokens[2..],
            _ => return Err(invalid(reply, "unexpected number of tokens")),
        };

        number::<u64>(reply, tokens[5])?;
        number::<u64>(reply, tokens[6])?;

        Ok(MessageInfo {
            stream: tokens[0],
            consumer: tokens[1],
            delivered: number(reply, tokens[2])?,
            stream_seq: number(reply, tokens[3])?,
            consumer_seq: number(reply, tokens[4])?,
        })
    }
}

fn number<T: FromStr>(reply: &str, token: &str) -> io::Result<T> {
    token
        .parse()
        .map_err(|_| invalid(reply, "malformed numeric token"))
}

fn invalid(reply: &str, reason: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("invalid JetStream reply subject {:?}: {}", reply, reason),
    )
}

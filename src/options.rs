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

use std::{io, path::PathBuf};

use structopt::StructOpt;

/// The server used when neither `--server` nor `NATS_URL` is given.
pub const DEFAULT_SERVER: &str = "nats://127.0.0.1:4222";

/// Connection settings shared by every command.
///
/// Each setting can be given on the command line or through the
/// environment variable named in its help text.
#[derive(Debug, Clone, StructOpt)]
pub struct ConnectOptions {
    /// NATS server urls, separated by commas
    #[structopt(
        short = "s",
        long = "server",
        env = "NATS_URL",
        default_value = DEFAULT_SERVER
    )]
    pub server: String,

    /// Username or token
    #[structopt(long, env = "NATS_USER")]
    pub user: Option<String>,

    /// Password
    #[structopt(long, env = "NATS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Authentication token
    #[structopt(long, env = "NATS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// User credentials file
    #[structopt(long, env = "NATS_CREDS", parse(from_os_str))]
    pub creds: Option<PathBuf>,

    /// TLS client certificate file
    #[structopt(long = "tlscert", env = "NATS_CERT", parse(from_os_str))]
    pub tls_cert: Option<PathBuf>,

    /// TLS client private key file
    #[structopt(long = "tlskey", env = "NATS_KEY", parse(from_os_str))]
    pub tls_key: Option<PathBuf>,

    /// TLS certificate authority chain file
    #[structopt(long = "tlsca", env = "NATS_CA", parse(from_os_str))]
    pub tls_ca: Option<PathBuf>,

    /// Name reported to the server for this connection
    #[structopt(long = "connection-name")]
    pub name: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> ConnectOptions {
        ConnectOptions {
            server: DEFAULT_SERVER.to_string(),
            user: None,
            password: None,
            token: None,
            creds: None,
            tls_cert: None,
            tls_key: None,
            tls_ca: None,
            name: None,
        }
    }
}

impl ConnectOptions {
    /// Options pointing at the given server list, without authentication.
    pub fn new(server: &str) -> ConnectOptions {
        ConnectOptions {
            server: server.to_string(),
            ..Default::default()
        }
    }

    /// Parse the comma separated server list.
    pub fn servers(&self) -> io::Result<Vec<nats::ServerAddress>> {
        let servers = self
            .server
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(|url| url.parse::<nats::ServerAddress>())
            .collect::<io::Result<Vec<_>>>()?;

        if servers.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "at least one server url is required",
            ));
        }
        Ok(servers)
    }

    /// Check that the given settings can be combined.
    pub fn validate(&self) -> io::Result<()> {
        if self.password.is_some() && self.user.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "a password requires a user",
            ));
        }
        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "a TLS certificate and key must be given together",
            ));
        }
        Ok(())
    }

    /// Build the client options. Credentials files take precedence over a
    /// user and password, which take precedence over a token.
    pub fn to_nats_options(&self) -> io::Result<nats::Options> {
        self.validate()?;

        let mut options = if let Some(creds) = &self.creds {
            nats::Options::with_credentials(creds)
        } else if let Some(user) = &self.user {
            nats::Options::with_user_pass(user, self.password.as_deref().unwrap_or_default())
        } else if let Some(token) = &self.token {
            nats::Options::with_token(token)
        } else {
            nats::Options::new()
        };

        let name = match &self.name {
            Some(name) => name.clone(),
            None => format!("NATS CLI Version {}", env!("CARGO_PKG_VERSION")),
        };
        options = options.with_name(&name);

        if let (Some(cert), Some(key)) = (&self.tls_cert, &self.tls_key) {
            options = options.client_cert(cert, key);
        }
        if let Some(ca) = &self.tls_ca {
            options = options.add_root_certificate(ca);
        }

        Ok(options)
    }
}

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

use std::process;

use nats_box::{ConnectOptions, Shutdown, SubCommand};
use structopt::StructOpt;

/// NATS utility for interacting with a NATS server.
#[derive(Debug, StructOpt)]
#[structopt(name = "nats-box")]
struct Cli {
    #[structopt(flatten)]
    connect: ConnectOptions,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Generic subscription client
    #[structopt(name = "sub")]
    Sub(SubCommand),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::from_args();

    // Held until exit. Nothing fires it, so commands run until the process
    // is killed.
    let (_trigger, shutdown) = Shutdown::new();

    let result = match args.cmd {
        Command::Sub(cmd) => cmd.run(&args.connect, &shutdown),
    };

    if let Err(err) = result {
        eprintln!("nats-box: error: {}", err);
        process::exit(1);
    }
}

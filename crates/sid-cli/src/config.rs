use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use sid::{DEFAULT_EPOCH, Epoch, NodeId, Sid};

/// Upper bound on `generate --count`, about a quarter second of IDs at the
/// full per-node rate.
pub const MAX_COUNT: usize = 1_000_000;

/// Command-line arguments for the `sid` binary.
///
/// Global options can also be supplied through environment variables (or a
/// `.env` file in the working directory).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sid",
    version,
    about = "Generate and decode decentralized Snowflake-style IDs"
)]
pub struct CliArgs {
    /// Epoch that ID timestamps are measured from, as an RFC 3339 instant.
    ///
    /// Every node sharing an ID space must use the same epoch. The process
    /// refuses to start if the value does not parse.
    ///
    /// Environment variable: `SID_EPOCH`
    #[arg(long, env = "SID_EPOCH", default_value = DEFAULT_EPOCH, global = true)]
    pub epoch: String,

    /// Explicit node ID (0-1023). Defaults to a hash of the host name.
    ///
    /// Assign distinct values per host when hash collisions are not
    /// acceptable.
    ///
    /// Environment variable: `SID_NODE_ID`
    #[arg(long, env = "SID_NODE_ID", global = true)]
    pub node_id: Option<u16>,

    /// Time source used to stamp IDs.
    ///
    /// Environment variable: `SID_CLOCK`
    #[arg(long, env = "SID_CLOCK", value_enum, default_value_t = ClockKind::System, global = true)]
    pub clock: ClockKind,

    /// Print JSON lines instead of plain text.
    #[arg(long, default_value_t = false, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate new IDs, one per line.
    Generate {
        /// How many IDs to generate.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },
    /// Decode IDs into timestamp, node and sequence.
    Decode {
        /// Decimal IDs to decode.
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show the node ID this process would stamp into IDs.
    Node,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockKind {
    /// Wall clock. Generation fails while the clock is behind the last ID.
    System,
    /// Ticker anchored to the wall clock at startup; never goes backward.
    Monotonic,
}

/// Validated runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub epoch: Epoch,
    pub node: Option<NodeId>,
    pub clock: ClockKind,
    pub json: bool,
    pub action: Action,
}

/// The command to run, with its arguments validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Generate { count: usize },
    Decode { ids: Vec<Sid> },
    Node,
}

impl TryFrom<CliArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let epoch = Epoch::parse(&args.epoch).context("invalid epoch (--epoch / SID_EPOCH)")?;

        let node = args
            .node_id
            .map(NodeId::new)
            .transpose()
            .context("invalid node id (--node-id / SID_NODE_ID)")?;

        let action = match args.command {
            Command::Generate { count } => {
                if count == 0 {
                    bail!("--count must be greater than 0");
                }
                if count > MAX_COUNT {
                    bail!("--count ({count}) exceeds the maximum of {MAX_COUNT}");
                }
                Action::Generate { count }
            }
            Command::Decode { ids } => {
                let ids = ids
                    .iter()
                    .map(|raw| raw.parse::<Sid>().with_context(|| format!("cannot decode {raw:?}")))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Action::Decode { ids }
            }
            Command::Node => Action::Node,
        };

        Ok(Self {
            epoch,
            node,
            clock: args.clock,
            json: args.json,
            action,
        })
    }
}

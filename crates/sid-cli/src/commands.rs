use crate::config::{Action, ClockKind, Config};
use serde::Serialize;
use sid::{Epoch, MonotonicClock, NodeId, Sid, SidGenerator, TimeSource};
use std::io::Write;

/// One decoded ID, as printed by `decode --json` and `generate --json`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DecodedSid {
    #[serde(with = "sid::as_string")]
    pub id: Sid,
    pub timestamp: u64,
    pub time: String,
    pub node: u64,
    pub sequence: u64,
}

impl DecodedSid {
    pub fn new(id: Sid, epoch: Epoch) -> Self {
        Self {
            id,
            timestamp: id.timestamp(),
            time: id.time_from(epoch).to_rfc3339(),
            node: id.node(),
            sequence: id.sequence(),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
struct NodeReport {
    node: u16,
    source: &'static str,
}

/// Runs the configured action, writing results to `out`.
pub fn run(config: &Config, out: &mut impl Write) -> anyhow::Result<()> {
    match &config.action {
        Action::Generate { count } => {
            let node = config.node.unwrap_or_else(|| NodeId::resolve().id);
            match config.clock {
                ClockKind::System => {
                    let generator = SidGenerator::with_node(node, config.epoch)?;
                    generate(&generator, *count, config.json, out)
                }
                ClockKind::Monotonic => {
                    let clock = MonotonicClock::with_epoch(config.epoch)?;
                    let generator = SidGenerator::with_parts(node, config.epoch, clock);
                    generate(&generator, *count, config.json, out)
                }
            }
        }
        Action::Decode { ids } => {
            for id in ids {
                let decoded = DecodedSid::new(*id, config.epoch);
                if config.json {
                    serde_json::to_writer(&mut *out, &decoded)?;
                    writeln!(out)?;
                } else {
                    writeln!(
                        out,
                        "{} time={} node={} sequence={}",
                        decoded.id, decoded.time, decoded.node, decoded.sequence
                    )?;
                }
            }
            Ok(())
        }
        Action::Node => {
            let report = match config.node {
                Some(node) => NodeReport {
                    node: node.get(),
                    source: "configured",
                },
                None => {
                    let resolved = NodeId::resolve();
                    NodeReport {
                        node: resolved.id.get(),
                        source: resolved.source.as_str(),
                    }
                }
            };
            if config.json {
                serde_json::to_writer(&mut *out, &report)?;
                writeln!(out)?;
            } else {
                writeln!(out, "{} ({})", report.node, report.source)?;
            }
            Ok(())
        }
    }
}

fn generate<T: TimeSource>(
    generator: &SidGenerator<T>,
    count: usize,
    json: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    tracing::debug!(?generator, count, "generating ids");
    for _ in 0..count {
        let id = generator.generate()?;
        if json {
            serde_json::to_writer(&mut *out, &DecodedSid::new(id, generator.epoch()))?;
            writeln!(out)?;
        } else {
            writeln!(out, "{id}")?;
        }
    }
    out.flush()?;
    Ok(())
}

use std::time::Duration;

use pb_bus::DEFAULT_ENDPOINT;

use crate::errors::ConfigError;
use crate::metrics::RateUnits;

/// Default total message count across all publishers
pub const DEFAULT_TOTAL_MESSAGES: usize = 100_000;

/// Default payload size in bytes
pub const DEFAULT_MESSAGE_SIZE: usize = 128;

/// Default wall-clock abort deadline for the completion wait
pub const DEFAULT_ABORT_TIMEOUT: Duration = Duration::from_secs(30);

/// One benchmark run's configuration. Immutable once parsed; roles get
/// the pieces they need by value, never through shared mutable state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoint: String,
    pub publishers: usize,
    pub subscribers: usize,
    pub total_messages: usize,
    pub message_size: usize,
    pub rate_units: RateUnits,
    pub abort_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            publishers: 1,
            subscribers: 1,
            total_messages: DEFAULT_TOTAL_MESSAGES,
            message_size: DEFAULT_MESSAGE_SIZE,
            rate_units: RateUnits::DecimalMb,
            abort_timeout: DEFAULT_ABORT_TIMEOUT,
        }
    }
}

impl RunConfig {
    /// The total is split evenly; a remainder is simply not sent
    pub fn messages_per_publisher(&self) -> usize {
        self.total_messages / self.publishers
    }

    /// What each subscriber can actually expect to see: every publisher's
    /// full stream. Derived from the per-publisher share so a total that
    /// does not divide evenly still lets subscribers complete.
    pub fn subscriber_target(&self) -> usize {
        self.messages_per_publisher() * self.publishers
    }
}

/// What the CLI asked for
#[derive(Debug, Clone)]
pub enum CliAction {
    Run(RunConfig),
    Help,
}

pub fn usage() -> String {
    format!(
        "Usage: pub-bench [-s SERVER({DEFAULT_ENDPOINT})] [-np NUM_PUBLISHERS] [-ns NUM_SUBSCRIBERS] [-n NUM_MSGS] [-ms MESSAGE_SIZE] [-u mb|mib] [-t ABORT_SECS]\n\
         - h\n\tShow help message\n\
         - ms int\n\tSize of each message in bytes (default {DEFAULT_MESSAGE_SIZE})\n\
         - n int\n\tTotal number of messages to publish, divided evenly across publishers (default {DEFAULT_TOTAL_MESSAGES})\n\
         - np int\n\tNumber of concurrent publishers (default 1)\n\
         - ns int\n\tNumber of concurrent subscribers (default 1)\n\
         - s string\n\tMessage bus endpoint; use inproc://NAME for the in-process bus (default {DEFAULT_ENDPOINT})\n\
         - t int\n\tAbort deadline in seconds for the completion wait (default 30)\n\
         - u mb|mib\n\tThroughput units, decimal megabytes or binary mebibytes (default mb)"
    )
}

fn parse_count(flag: &str, value: &str, min: usize) -> Result<usize, ConfigError> {
    match value.parse::<usize>() {
        Ok(n) if n >= min => Ok(n),
        _ => Err(ConfigError::InvalidValue { flag: flag.to_string(), value: value.to_string() }),
    }
}

/// Parses the flag surface. `args` excludes the program name. Any flag
/// may repeat; the last occurrence wins. `-h` anywhere short-circuits.
pub fn parse_args<I>(args: I) -> Result<CliAction, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut config = RunConfig::default();
    let mut iter = args.into_iter();

    while let Some(flag) = iter.next() {
        if flag == "-h" {
            return Ok(CliAction::Help);
        }

        let value = match flag.as_str() {
            "-s" | "-np" | "-ns" | "-n" | "-ms" | "-u" | "-t" => {
                iter.next().ok_or_else(|| ConfigError::MissingValue(flag.clone()))?
            }
            _ => return Err(ConfigError::UnknownFlag(flag)),
        };

        match flag.as_str() {
            "-s" => config.endpoint = value,
            "-np" => config.publishers = parse_count(&flag, &value, 1)?,
            "-ns" => config.subscribers = parse_count(&flag, &value, 0)?,
            "-n" => config.total_messages = parse_count(&flag, &value, 1)?,
            "-ms" => config.message_size = parse_count(&flag, &value, 0)?,
            "-t" => config.abort_timeout = Duration::from_secs(parse_count(&flag, &value, 1)? as u64),
            "-u" => {
                config.rate_units = match value.as_str() {
                    "mb" => RateUnits::DecimalMb,
                    "mib" => RateUnits::BinaryMib,
                    _ => return Err(ConfigError::InvalidValue { flag, value }),
                }
            }
            _ => unreachable!(),
        }
    }

    Ok(CliAction::Run(config))
}

// SPDX-License-Identifier: MIT
//
// SMT Data Interaction Client

//! SMT CLI - command-line front end for the SMT platform client
//!
//! ```text
//! smt-cli connect <SOURCE>                       list the tags of a data source
//! smt-cli get --tag t1 --max-count 10            query historical data
//! smt-cli get --params '{"tagId": "t1"}'         same, from a JSON parameter set
//! smt-cli push --tag t1 --sample 1700000000,2.5  send samples for one tag
//! ```
//!
//! The platform URL comes from `--base-url` or `SMT_BASE_URL`. Results are printed
//! to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use smt_core::{
    ClientConfig, DataInteractionClient, RequestParams, Sample, SampleValue, Tag, TagSelector,
    TimePoint, ValueFilter, ValueKind,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "smt-cli")]
#[command(about = "SMT CLI - Connects to data sources, pushes and queries tag data", long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Platform base URL (overrides SMT_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect to a data source and print its tags
    Connect {
        /// Data source identifier
        source: String,
    },

    /// Query historical data
    Get(GetArgs),

    /// Send samples for a tag
    Push {
        /// Tag id
        #[arg(long)]
        tag: String,

        /// Sample as `x,y` or `x,y,q`, repeatable
        #[arg(long = "sample", required = true, value_parser = parse_sample)]
        samples: Vec<Sample>,
    },
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// Tag id, repeat for several tags
    #[arg(long = "tag", required_unless_present = "params", conflicts_with = "params")]
    tags: Vec<String>,

    /// Start of the period (integer, or timestamp text; quote digits to keep them text)
    #[arg(long, conflicts_with = "params")]
    from: Option<String>,

    /// End of the period (integer, or timestamp text; quote digits to keep them text)
    #[arg(long, conflicts_with = "params")]
    to: Option<String>,

    /// Maximum number of values per tag
    #[arg(long, conflicts_with = "params")]
    max_count: Option<u64>,

    /// Step between values in microseconds
    #[arg(long, conflicts_with = "params")]
    time_step: Option<i64>,

    /// Value kind filter (int, float, string, bool), repeatable
    #[arg(long = "value", value_parser = parse_value_kind, conflicts_with = "params")]
    values: Vec<ValueKind>,

    /// Render timestamps as ISO 8601 strings
    #[arg(long, conflicts_with = "params")]
    format: bool,

    /// Only physically recorded values
    #[arg(long, conflicts_with = "params")]
    actual: Option<bool>,

    /// Full parameter set as JSON, keyed by wire field names
    #[arg(long)]
    params: Option<String>,
}

impl GetArgs {
    fn into_params(self) -> Result<RequestParams> {
        if let Some(raw) = self.params {
            let value: Value = serde_json::from_str(&raw).context("--params is not valid JSON")?;
            return Ok(RequestParams::from_json(&value)?);
        }

        let mut tags = self.tags;
        let selector = match tags.len() {
            1 => TagSelector::from(tags.remove(0)),
            _ => TagSelector::Many(tags.into_iter().map(Into::into).collect()),
        };

        let mut params = RequestParams::new(selector);
        params.from = self.from.as_deref().map(parse_time_point);
        params.to = self.to.as_deref().map(parse_time_point);
        params.max_count = self.max_count;
        params.time_step = self.time_step;
        params.value = match self.values.len() {
            0 => None,
            1 => Some(ValueFilter::One(self.values[0])),
            _ => Some(ValueFilter::Many(self.values)),
        };
        params.format = self.format.then_some(true);
        params.actual = self.actual;
        Ok(params)
    }
}

/// `123` is an epoch, `"123"` (JSON-quoted) and anything else non-numeric is text
fn parse_time_point(raw: &str) -> TimePoint {
    serde_json::from_str::<TimePoint>(raw).unwrap_or_else(|_| TimePoint::Text(raw.to_string()))
}

fn parse_value_kind(raw: &str) -> std::result::Result<ValueKind, String> {
    ValueKind::parse(raw).ok_or_else(|| format!("unknown value kind '{}'", raw))
}

fn parse_sample(raw: &str) -> std::result::Result<Sample, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let (x, y, q) = match parts.as_slice() {
        [x, y] => (*x, *y, "0"),
        [x, y, q] => (*x, *y, *q),
        _ => return Err(format!("expected x,y or x,y,q, got '{}'", raw)),
    };

    let y = match y.parse::<i64>() {
        Ok(v) => SampleValue::Int(v),
        Err(_) => SampleValue::Float(
            y.parse::<f64>()
                .map_err(|_| format!("sample value '{}' is not a number", y))?,
        ),
    };
    let q = q
        .parse::<i32>()
        .map_err(|_| format!("quality '{}' is not an integer", q))?;

    Ok(Sample::with_quality(parse_time_point(x), y, q))
}

async fn run(client: DataInteractionClient, command: Command) -> Result<Value> {
    match command {
        Command::Connect { source } => {
            let tags = client
                .connect(&source)
                .await
                .with_context(|| format!("connect to '{}' failed", source))?;
            info!("Data source '{}' has {} tag(s)", source, tags.len());
            Ok(Value::Array(tags.iter().map(Tag::to_descriptor).collect()))
        }
        Command::Get(get) => {
            let params = get.into_params()?;
            let data = client.get_data(&params).await.context("get data failed")?;
            Ok(Value::Array(data))
        }
        Command::Push { tag, samples } => {
            let count = samples.len();
            let tag = Tag::with_samples(tag, Default::default(), samples);
            client
                .set_data(std::slice::from_ref(&tag))
                .await
                .context("set data failed")?;
            info!("Sent {} sample(s) for tag '{}'", count, tag.name());
            Ok(json!({ "tag": tag.id(), "sent": count }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing
    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("SMT CLI v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.base_url {
        Some(url) => ClientConfig::new(url),
        None => ClientConfig::from_env().context("Failed to load configuration from environment")?,
    };
    let client = DataInteractionClient::new(config)?;

    let output = run(client.clone(), args.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    let metrics = client.metrics().snapshot();
    info!(
        requests = metrics.requests_total,
        operations = metrics.operations_total,
        failed = metrics.operations_failed,
        "Done"
    );
    Ok(())
}

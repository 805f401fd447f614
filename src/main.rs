use std::collections::HashMap;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value as JsonValue;
use tracing::info;

use hybrid_stats::command::types::{TableVersion, Team, WebQuery};
use hybrid_stats::command::WebStatsHandler;
use hybrid_stats::engine::ast::{CompareOperator, Expr};
use hybrid_stats::engine::builders::{RollupTables, rollup_population_query};
use hybrid_stats::engine::exec::MemoryGateway;
use hybrid_stats::engine::types::ScalarValue;
use hybrid_stats::logging;
use hybrid_stats::shared::config::CONFIG;

#[derive(Parser)]
#[command(name = "hybrid-stats")]
#[command(about = "Plan, print and run web analytics queries", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the routing decision for a request
    Plan(RequestArgs),
    /// Print the SQL the request would run first
    Sql(RequestArgs),
    /// Answer a request against events loaded from a JSON lines file
    Run {
        #[command(flatten)]
        request: RequestArgs,

        /// JSON lines file with one raw event per line
        #[arg(short, long)]
        events: PathBuf,
    },
}

#[derive(clap::Args)]
struct RequestArgs {
    /// Request JSON file, stdin when omitted
    #[arg(short, long)]
    request: Option<PathBuf>,

    #[arg(long, default_value_t = 1)]
    team_id: i64,

    #[arg(long, default_value = "UTC")]
    timezone: String,

    /// Rollup table set, `v1` or `v2`
    #[arg(long)]
    table_version: Option<String>,

    /// Clock to route against, RFC 3339
    #[arg(long)]
    now: Option<String>,
}

impl RequestArgs {
    fn query(&self) -> anyhow::Result<WebQuery> {
        let raw = match &self.request {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };
        serde_json::from_str(&raw).context("parsing request")
    }

    fn team(&self) -> anyhow::Result<Team> {
        let table_version = match self.table_version.as_deref() {
            None => None,
            Some("v1") => Some(TableVersion::V1),
            Some("v2") => Some(TableVersion::V2),
            Some(other) => bail!("unknown table version {other:?}"),
        };
        Ok(Team {
            id: self.team_id,
            timezone: self.timezone.clone(),
            table_version,
        })
    }

    fn now(&self) -> anyhow::Result<DateTime<Utc>> {
        match &self.now {
            Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
                .context("parsing --now")?
                .with_timezone(&Utc)),
            None => Ok(Utc::now()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init()?;
    let config = &CONFIG.query;

    match args.command {
        Command::Plan(request) => {
            let team = request.team()?;
            let gateway = MemoryGateway::new();
            let handler =
                WebStatsHandler::new(&gateway, &team, config).with_now(request.now()?);
            let explanation = handler.explain(&request.query()?)?;
            println!("{}: {}", explanation.decision.plan, explanation.decision.reason);
        }
        Command::Sql(request) => {
            let team = request.team()?;
            let gateway = MemoryGateway::new();
            let handler =
                WebStatsHandler::new(&gateway, &team, config).with_now(request.now()?);
            println!("{}", handler.explain(&request.query()?)?.query);
        }
        Command::Run { request, events } => {
            let team = request.team()?;
            let now = request.now()?;
            let gateway = MemoryGateway::new();
            load_events(&gateway, &events, &config.events_table).await?;
            materialize_before(&gateway, now).await?;

            let handler = WebStatsHandler::new(&gateway, &team, config).with_now(now);
            let response = handler.handle(&request.query()?).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

async fn load_events(gateway: &MemoryGateway, path: &Path, table: &str) -> anyhow::Result<()> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut rows = Vec::new();
    for (line_no, line) in raw.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
        let JsonValue::Object(fields) = serde_json::from_str(line)
            .with_context(|| format!("line {}", line_no + 1))?
        else {
            bail!("line {}: expected a JSON object", line_no + 1);
        };
        let row: HashMap<String, ScalarValue> = fields
            .into_iter()
            .map(|(key, value)| {
                let cell = match (key.as_str(), value) {
                    ("timestamp", JsonValue::String(ts)) => DateTime::parse_from_rfc3339(&ts)
                        .map(|t| ScalarValue::Timestamp(t.timestamp()))
                        .with_context(|| format!("line {}: timestamp", line_no + 1))?,
                    ("timestamp", JsonValue::Number(n)) => {
                        ScalarValue::Timestamp(n.as_i64().unwrap_or_default())
                    }
                    (_, other) => ScalarValue::from(other),
                };
                Ok((key, cell))
            })
            .collect::<anyhow::Result<_>>()?;
        rows.push(row);
    }
    info!(target: "hybrid_stats::exec", events = rows.len(), "Loaded events");
    gateway.insert(table, rows).await;
    Ok(())
}

/// Fills both rollup versions from every whole day before `now`'s day.
async fn materialize_before(gateway: &MemoryGateway, now: DateTime<Utc>) -> anyhow::Result<()> {
    let Some(midnight) = now.date_naive().and_hms_opt(0, 0, 0) else {
        bail!("no midnight for {now}");
    };
    for version in [TableVersion::V1, TableVersion::V2] {
        let tables = RollupTables::for_version(version);
        let job = rollup_population_query(&tables, &CONFIG.query).and_where(Expr::compare(
            CompareOperator::Lt,
            Expr::field("timestamp"),
            Expr::datetime(midnight.and_utc()),
        ));
        gateway.materialize(tables.name, &job).await?;
    }
    Ok(())
}

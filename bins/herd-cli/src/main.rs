//! herd-cli: operator interface for a running herd node.
//!
//! Talks JSON-RPC to `herd-node`: inspect the herd, submit receipts by
//! hand, fire the payout trigger, and force a reset.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use serde_json::Value;
use tracing::debug;

use herd_core::constants::DEFAULT_RPC_PORT;
use herd_core::types::{IdentityKey, Receipt, ReceiptId};

/// CyberHerd command-line interface.
#[derive(Parser)]
#[command(name = "herd-cli")]
#[command(version, about = "Inspect and drive a CyberHerd node.")]
struct Cli {
    /// RPC endpoint URL.
    #[arg(short, long, global = true, default_value_t = default_endpoint())]
    rpc_endpoint: String,

    /// Print raw JSON instead of a summary.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List current herd members.
    Herd,
    /// Show spots remaining, cycle, and cooldown.
    Status,
    /// Show this cycle's counters.
    Metrics,
    /// Show split-payment percentages.
    Splits,
    /// Submit a payment receipt.
    Submit(SubmitArgs),
    /// Compute the herd payout for a trigger amount.
    Trigger {
        /// Trigger amount in sats.
        amount: u64,
    },
    /// Wipe the herd and start a new cycle.
    Reset {
        /// Admission note for the new cycle.
        #[arg(long)]
        admission_reference: Option<String>,
    },
}

#[derive(Args)]
struct SubmitArgs {
    /// Receipt identifier.
    #[arg(long)]
    id: String,

    /// Amount in sats.
    #[arg(long)]
    amount: u64,

    /// Sender identity key.
    #[arg(long)]
    sender: String,

    /// Content the payment was attached to.
    #[arg(long, default_value = "")]
    target: String,

    /// The payment was made on the cycle's admission note.
    #[arg(long)]
    admission: bool,

    /// Sender's payout destination.
    #[arg(long)]
    destination: Option<String>,

    /// The sender has no identity metadata record.
    #[arg(long)]
    no_metadata: bool,

    /// The target content was not authored by the tracked project.
    #[arg(long)]
    foreign_author: bool,
}

impl SubmitArgs {
    fn into_receipt(self) -> Receipt {
        Receipt {
            id: ReceiptId(self.id),
            amount: self.amount,
            sender: IdentityKey(self.sender),
            target: self.target,
            is_admission_target: self.admission,
            sender_has_identity_metadata: !self.no_metadata,
            payout_destination: self.destination,
            target_author_eligible: !self.foreign_author,
        }
    }
}

fn default_endpoint() -> String {
    format!("http://127.0.0.1:{DEFAULT_RPC_PORT}")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = HttpClientBuilder::default()
        .build(&cli.rpc_endpoint)
        .context("Failed to connect to RPC")?;

    let (method, params) = match cli.command {
        Commands::Herd => ("getherd", ArrayParams::new()),
        Commands::Status => ("getstatus", ArrayParams::new()),
        Commands::Metrics => ("getmetrics", ArrayParams::new()),
        Commands::Splits => ("getsplittargets", ArrayParams::new()),
        Commands::Submit(args) => {
            let mut params = ArrayParams::new();
            params
                .insert(args.into_receipt())
                .context("encoding receipt")?;
            ("submitreceipt", params)
        }
        Commands::Trigger { amount } => {
            let mut params = ArrayParams::new();
            params.insert(amount).context("encoding amount")?;
            ("trigger", params)
        }
        Commands::Reset { admission_reference } => {
            let mut params = ArrayParams::new();
            params
                .insert(admission_reference)
                .context("encoding admission reference")?;
            ("resetherd", params)
        }
    };

    let response = call(&client, method, params).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", render(method, &response));
    }
    Ok(())
}

async fn call(client: &HttpClient, method: &str, params: ArrayParams) -> Result<Value> {
    debug!(method, "rpc call");
    client
        .request(method, params)
        .await
        .with_context(|| format!("RPC {method} failed"))
}

/// Human-readable summary of an RPC response.
fn render(method: &str, response: &Value) -> String {
    match method {
        "getherd" => render_members(response),
        "getstatus" | "resetherd" => {
            let mut out = format!(
                "spots remaining: {} of {}\nminimum receipt: {} sats\ncycle started: {}\nnext reset: {}",
                response["spots_remaining"],
                response["max_herd_size"],
                response["min_receipt_amount"],
                response["cycle_started_at"].as_str().unwrap_or("-"),
                response["next_reset_at"].as_str().unwrap_or("-"),
            );
            if let Some(reference) = response["admission_reference"].as_str() {
                out.push_str(&format!("\nadmission note: {reference}"));
            }
            if let Some(secs) = response["cooldown_remaining_secs"].as_u64() {
                out.push_str(&format!("\nheadbutt cooldown: {secs}s"));
            }
            out.push('\n');
            out.push_str(&render_members(&response["members"]));
            out
        }
        "getsplittargets" => response
            .as_array()
            .map(|targets| {
                targets
                    .iter()
                    .map(|t| {
                        format!(
                            "{:>3}%  {}  {}",
                            t["percent"].as_u64().unwrap_or(0),
                            t["alias"].as_str().unwrap_or("?"),
                            t["destination"].as_str().unwrap_or("?")
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default(),
        "trigger" => {
            let mut out = format!(
                "trigger {} sats -> herd share {} sats",
                response["trigger_amount"], response["disbursable"]
            );
            for share in response["shares"].as_array().into_iter().flatten() {
                out.push_str(&format!(
                    "\n  {} sats  {} ({})",
                    share["amount"],
                    share["identity"].as_str().unwrap_or("?"),
                    share["payout_destination"].as_str().unwrap_or("?")
                ));
            }
            if response["undistributed"].as_u64().unwrap_or(0) > 0 {
                out.push_str(&format!("\n  undistributed: {} sats", response["undistributed"]));
            }
            out
        }
        "submitreceipt" => {
            let outcome = response["outcome"].as_str().unwrap_or("unknown");
            let identity = response["identity"].as_str().unwrap_or("");
            format!("{outcome} {identity}").trim_end().to_string()
        }
        _ => serde_json::to_string_pretty(response).unwrap_or_default(),
    }
}

fn render_members(members: &Value) -> String {
    let Some(members) = members.as_array() else {
        return String::new();
    };
    if members.is_empty() {
        return "herd is empty".to_string();
    }
    members
        .iter()
        .enumerate()
        .map(|(i, m)| {
            format!(
                "{}. {}  {} sats  -> {}",
                i + 1,
                m["identity"].as_str().unwrap_or("?"),
                m["cumulative"],
                m["payout_destination"].as_str().unwrap_or("?")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "herd-cli", "submit", "--id", "r1", "--amount", "21", "--sender", "alice",
            "--admission", "--destination", "alice@ln.example",
        ])
        .unwrap();
        let Commands::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        let receipt = args.into_receipt();
        assert_eq!(receipt.amount, 21);
        assert!(receipt.is_admission_target);
        assert!(receipt.sender_has_identity_metadata);
        assert!(receipt.target_author_eligible);
        assert_eq!(receipt.payout_destination.as_deref(), Some("alice@ln.example"));
    }

    #[test]
    fn default_endpoint_uses_default_port() {
        let cli = Cli::try_parse_from(["herd-cli", "status"]).unwrap();
        assert_eq!(cli.rpc_endpoint, format!("http://127.0.0.1:{DEFAULT_RPC_PORT}"));
    }

    #[test]
    fn render_empty_herd() {
        assert_eq!(render("getherd", &json!([])), "herd is empty");
    }

    #[test]
    fn render_ranked_members() {
        let members = json!([
            {"identity": "a", "cumulative": 500, "payout_destination": "a@ln"},
            {"identity": "b", "cumulative": 300, "payout_destination": "b@ln"},
        ]);
        let out = render("getherd", &members);
        assert_eq!(out, "1. a  500 sats  -> a@ln\n2. b  300 sats  -> b@ln");
    }

    #[test]
    fn render_submit_outcome() {
        let resp = json!({"outcome": "headbutt_failed", "identity": "d", "required_minimum": 201});
        assert_eq!(render("submitreceipt", &resp), "headbutt_failed d");
        let dup = json!({"outcome": "duplicate", "receipt": "r1"});
        assert_eq!(render("submitreceipt", &dup), "duplicate");
    }
}

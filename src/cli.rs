// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   link-sentinel run --seeds seeds.json [--json] [--html report.html]
//   link-sentinel page https://example.com/links --label "Example"
//
// The engine knobs (timeouts, concurrency, deadline, retries) are shared by
// both subcommands through the flattened `EngineArgs` struct.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use link_sentinel::config::{CheckerConfig, RetryPolicy};

#[derive(Parser, Debug)]
#[command(
    name = "link-sentinel",
    version,
    about = "Checks every outbound link on a fixed set of seed pages",
    long_about = "link-sentinel fetches each seed page once, probes every external link it \
                  finds, and reports which ones are OK, redirected, broken, timing out or \
                  failing at the transport level."
)]
pub struct Cli {
    /// Log more (-v = debug, -vv = trace). RUST_LOG overrides this.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check all seed pages listed in a JSON seeds file
    ///
    /// Example: link-sentinel run --seeds seeds.json --html report.html
    Run {
        /// Path to the seeds file
        #[arg(long, default_value = "seeds.json")]
        seeds: PathBuf,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Check a single seed page given on the command line
    ///
    /// Example: link-sentinel page https://example.com/links
    Page {
        /// Seed page URL
        url: String,

        /// Site name shown in the report (defaults to the URL)
        #[arg(long)]
        label: Option<String>,

        /// Hosts whose links count as internal (repeatable)
        #[arg(long = "skip-domain")]
        skip_domains: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Also write a standalone HTML report to this path
    #[arg(long)]
    pub html: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EngineArgs {
    /// Per-link request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,

    /// Seed page fetch timeout in seconds
    #[arg(long, default_value_t = 15)]
    pub page_timeout: u64,

    /// Redirect hops followed before a link counts as failing
    #[arg(long, default_value_t = 5)]
    pub max_redirects: usize,

    /// Number of links probed at once
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Give up on the whole run after this many seconds (unset = no limit)
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Extra attempts for links that time out or fail at the transport level
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Backoff step between retries, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub retry_backoff_ms: u64,

    /// Override the User-Agent header
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl EngineArgs {
    /// Builds the engine config; `skip_domains` comes from the seeds source
    pub fn to_config(&self, skip_domains: Vec<String>) -> CheckerConfig {
        let defaults = CheckerConfig::default();
        CheckerConfig {
            probe_timeout: Duration::from_secs(self.timeout),
            page_timeout: Duration::from_secs(self.page_timeout),
            max_redirects: self.max_redirects,
            concurrency: self.concurrency,
            deadline: self.deadline.map(Duration::from_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            skip_domains,
            retry: RetryPolicy {
                max_attempts: self.retries.saturating_add(1),
                backoff: Duration::from_millis(self.retry_backoff_ms),
            },
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_map_to_engine_defaults() {
        let cli = Cli::parse_from(["link-sentinel", "page", "https://example.com/"]);
        let Commands::Page { engine, label, .. } = cli.command else {
            panic!("expected page subcommand");
        };
        assert!(label.is_none());

        let config = engine.to_config(Vec::new());
        let defaults = CheckerConfig::default();
        assert_eq!(config.probe_timeout, defaults.probe_timeout);
        assert_eq!(config.page_timeout, defaults.page_timeout);
        assert_eq!(config.max_redirects, defaults.max_redirects);
        assert_eq!(config.concurrency, defaults.concurrency);
        assert_eq!(config.deadline, None);
        assert_eq!(config.retry, RetryPolicy::none());
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::parse_from([
            "link-sentinel",
            "-v",
            "run",
            "--seeds",
            "sites.json",
            "--json",
            "--deadline",
            "60",
            "--retries",
            "2",
            "--concurrency",
            "4",
        ]);
        assert_eq!(cli.verbose, 1);
        let Commands::Run { seeds, output, engine } = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(seeds, PathBuf::from("sites.json"));
        assert!(output.json);

        let config = engine.to_config(vec!["wordpress.org".to_string()]);
        assert_eq!(config.deadline, Some(Duration::from_secs(60)));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.skip_domains, vec!["wordpress.org"]);
    }
}

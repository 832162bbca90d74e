//! PrivShield CLI
//!
//! Inspects rule lists, runs request URLs through the filter chain, resolves
//! domain policies and checks pinned certificates from the command line.

mod config;

use std::collections::BTreeSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use ps_compiler::repository::{CancelToken, RuleListRepository};
use ps_core::chain::FilterChain;
use ps_core::lists::Blocklists;
use ps_core::pinning::{CertificateInfo, PinCheck};
use ps_core::resolver::resolve;
use ps_core::tab::Tab;
use ps_core::types::{Blocker, ListId};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "ps-cli")]
#[command(about = "PrivShield policy and content filtering tools")]
struct Cli {
    /// Policy config (JSON). Browser defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show what was parsed from each rule list
    Info {
        /// Directory holding the list assets
        #[arg(short, long)]
        lists: Option<PathBuf>,
    },

    /// Filter request URLs as issued by a document
    Check {
        /// Directory holding the list assets
        #[arg(short, long)]
        lists: Option<PathBuf>,

        /// URL of the document issuing the requests
        #[arg(short, long)]
        document: String,

        /// Request URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Print the effective policy for a host
    Resolve {
        host: String,
    },

    /// Check an observed certificate and IP set against a host's pins
    Pin {
        host: String,

        /// Observed certificate (JSON)
        #[arg(long)]
        cert: Option<PathBuf>,

        /// Observed IP address (repeatable)
        #[arg(long = "ip")]
        ips: Vec<IpAddr>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = Config::load_or_default(cli.config.as_deref())
        .map_err(|e| e.to_string())
        .and_then(|config| match cli.command {
            Commands::Info { lists } => cmd_info(&config, lists.as_deref()),
            Commands::Check { lists, document, urls } => {
                cmd_check(&config, lists.as_deref(), &document, &urls)
            }
            Commands::Resolve { host } => cmd_resolve(&config, &host),
            Commands::Pin { host, cert, ips } => cmd_pin(&config, &host, cert.as_deref(), &ips),
        });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn lists_dir<'a>(config: &'a Config, arg: Option<&'a Path>) -> Result<&'a Path, String> {
    arg.or(config.lists_dir.as_deref())
        .ok_or_else(|| "No list directory given (use --lists or set lists_dir)".to_string())
}

fn load_lists(dir: &Path) -> Result<Blocklists, String> {
    let handle = RuleListRepository::new(dir).spawn_load();
    let lists = handle.join().map_err(|e| e.to_string())?;
    log::debug!("Loaded {} rules from {}", lists.total_rules(), dir.display());
    Ok(lists)
}

fn cmd_info(config: &Config, lists: Option<&Path>) -> Result<(), String> {
    let dir = lists_dir(config, lists)?;
    let repo = RuleListRepository::new(dir);
    let lists = repo.load_dir(&CancelToken::new()).map_err(|e| e.to_string())?;

    println!("Rule lists in {}", dir.display());
    for id in ListId::ALL {
        let list = lists.get(id);
        let stats = list.stats();
        println!();
        println!("{} ({})", id.display_name(), repo.path_of(id).display());
        if let Some(title) = list.title() {
            println!("  Title:       {}", title);
        }
        println!("  Version:     {}", list.version().unwrap_or("unknown"));
        println!("  Lines:       {}", stats.lines);
        println!("  Blocks:      {}", list.blocks().len());
        println!("  Exceptions:  {}", list.exceptions().len());
        println!("  Skipped:     {}", stats.skipped);
    }
    println!();
    println!("Total rules: {}", lists.total_rules());

    Ok(())
}

fn cmd_check(
    config: &Config,
    lists: Option<&Path>,
    document: &str,
    urls: &[String],
) -> Result<(), String> {
    let lists = load_lists(lists_dir(config, lists)?)?;
    let chain = FilterChain::new(Arc::new(lists));
    let store = config.store();

    let tab = Tab::new(&config.defaults);
    if let Some(change) = tab.on_document_start(document, &store, &config.defaults) {
        println!("Document host: {}", change.host);
        if let Some(key) = &change.custom_settings {
            println!("Custom settings: {}", key);
        }
    }

    let policy = tab.policy();
    for url in urls {
        let decision = chain.check_request(&policy, tab.requests(), url);
        let verdict = format!("{:?}", decision.verdict).to_lowercase();
        match (&decision.blocker, &decision.rule) {
            (Some(blocker), Some(rule)) => println!("{:<8} {}  [{}: {}]", verdict, url, blocker, rule),
            (Some(blocker), None) => println!("{:<8} {}  [{}]", verdict, url, blocker),
            _ => println!("{:<8} {}", verdict, url),
        }
    }

    let log = tab.requests();
    println!();
    println!("Requests:  {}", log.len());
    println!("Blocked:   {}", log.blocked_count());
    let blockers = ListId::ALL
        .into_iter()
        .map(Blocker::List)
        .chain([Blocker::ThirdPartyRequests]);
    for blocker in blockers {
        let count = log.blocked_count_for(blocker);
        if count > 0 {
            println!("  {:<14} {}", blocker.to_string(), count);
        }
    }

    Ok(())
}

fn cmd_resolve(config: &Config, host: &str) -> Result<(), String> {
    let store = config.store();
    let policy = resolve(host, &store, &config.defaults);
    let json = serde_json::to_string_pretty(&policy).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn cmd_pin(
    config: &Config,
    host: &str,
    cert: Option<&Path>,
    ips: &[IpAddr],
) -> Result<(), String> {
    let observed_cert = cert
        .map(|path| {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            serde_json::from_str::<CertificateInfo>(&text)
                .map_err(|e| format!("Invalid certificate '{}': {}", path.display(), e))
        })
        .transpose()?;
    let observed_ips: Option<BTreeSet<IpAddr>> =
        (!ips.is_empty()).then(|| ips.iter().copied().collect());

    let store = config.store();
    let policy = resolve(host, &store, &config.defaults);
    let check = config
        .verifier()
        .verify(observed_cert.as_ref(), observed_ips.as_ref(), &policy.pins);

    match check {
        PinCheck::NothingPinned => println!("{}: nothing pinned", host),
        PinCheck::Matched => println!("{}: pins match", host),
        PinCheck::Mismatch(mismatch) => {
            println!("{}: PINNED MISMATCH", host);
            println!("  Certificate:   {}", if mismatch.certificate { "mismatch" } else { "ok" });
            println!("  IP addresses:  {}", if mismatch.ip_addresses { "mismatch" } else { "ok" });
            return Err(format!("pinned values for {} do not match", host));
        }
    }

    Ok(())
}

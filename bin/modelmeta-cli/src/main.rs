//! modelmeta CLI - Admin Command Line Interface
//!
//! Resolves address templates offline and talks to a management endpoint to
//! describe resources or walk the model tree.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use modelmeta_client::HttpDispatcher;
use modelmeta_common::{Dispatcher, MetaConfig};
use modelmeta_meta::MetadataProcessor;
use modelmeta_template::{
    AddressTemplate, ResourceDescriptionResolver, SecurityContextResolver, StatementContext,
    StatementContextResolver, StrictResolver, TemplateResolver,
};
use modelmeta_tree::{ModelTree, TraverseContinuation, TraverseFlags};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "modelmeta-cli")]
#[command(about = "Management model metadata CLI")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "modelmeta.toml")]
    config: String,

    /// Management endpoint (overrides the config file)
    #[arg(short, long, env = "MODELMETA_ENDPOINT")]
    endpoint: Option<String>,

    /// Request timeout in milliseconds (overrides the config file)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Log level (overrides the config file)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve an address template offline
    Resolve {
        /// Address template, e.g. /{selected-host}/subsystem=logging
        template: String,
        /// Placeholder value, e.g. --set selected-host=primary
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
        /// Resolution policy
        #[arg(long, value_enum, default_value_t = Policy::Context)]
        policy: Policy,
    },
    /// Fetch and print resource description and security context
    Describe {
        /// Address templates
        #[arg(required = true)]
        templates: Vec<String>,
        /// Include nested descriptions
        #[arg(long)]
        recursive: bool,
        /// Placeholder value, e.g. --set selected-host=primary
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
    /// Walk the model and print every resource found
    Traverse {
        /// Start address template
        #[arg(default_value = "/")]
        template: String,
        /// Additional excluded address prefixes
        #[arg(long)]
        exclude: Vec<String>,
        /// Also print wildcard addresses
        #[arg(long)]
        wildcards: bool,
        /// Read singleton children directly
        #[arg(long)]
        singletons: bool,
        /// Placeholder value, e.g. --set selected-host=primary
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, String)>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Policy {
    /// Fill placeholders from --set values
    Context,
    /// Resource description registry key
    Description,
    /// Security context registry key
    Security,
    /// Fail on placeholders without value
    Strict,
}

fn parse_assignment(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{text}'")),
    }
}

fn statement_context(values: &[(String, String)]) -> StatementContext {
    let mut context = StatementContext::new();
    for (name, value) in values {
        context.assign(name.as_str(), value.as_str());
    }
    context
}

fn resolve(template: &str, context: &StatementContext, policy: Policy) -> Result<AddressTemplate> {
    let template = AddressTemplate::of(template)?;
    let resolved = match policy {
        Policy::Context => StatementContextResolver.resolve(&template, context),
        Policy::Description => ResourceDescriptionResolver.resolve(&template, context),
        Policy::Security => SecurityContextResolver.resolve(&template, context),
        Policy::Strict => StrictResolver.try_resolve(&template, context)?,
    };
    Ok(resolved)
}

fn load_config(args: &Args) -> MetaConfig {
    let mut config = MetaConfig::load_or_default(&args.config);
    if let Some(endpoint) = &args.endpoint {
        config.client.endpoint.clone_from(endpoint);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.client.timeout_ms = timeout_ms;
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!(config = %args.config, endpoint = %config.client.endpoint, "Configuration loaded");

    match args.command {
        Commands::Resolve {
            template,
            values,
            policy,
        } => {
            let resolved = resolve(&template, &statement_context(&values), policy)?;
            println!("{resolved}");
        }
        Commands::Describe {
            templates,
            recursive,
            values,
        } => {
            let templates = templates
                .iter()
                .map(|t| AddressTemplate::of(t))
                .collect::<Result<Vec<_>, _>>()?;
            let dispatcher: Arc<dyn Dispatcher> = Arc::new(HttpDispatcher::new(&config.client)?);
            let processor = MetadataProcessor::from_config(dispatcher, &config)?;
            let metadata = processor
                .process(&statement_context(&values), &templates, recursive)
                .await
                .context("failed to fetch metadata")?;
            if metadata.is_empty() {
                info!(templates = templates.len(), "Metadata registered, no single result to print");
            } else {
                println!("{}", serde_json::to_string_pretty(&metadata)?);
            }
        }
        Commands::Traverse {
            template,
            exclude,
            wildcards,
            singletons,
            values,
        } => {
            let start = resolve(&template, &statement_context(&values), Policy::Strict)?;
            let mut excluded = config.traversal.exclude.clone();
            excluded.extend(exclude);
            let mut flags = TraverseFlags::empty();
            flags.set(TraverseFlags::WILDCARD_RESOURCES, wildcards);
            flags.set(TraverseFlags::INCLUDE_SINGLETONS, singletons);

            let dispatcher: Arc<dyn Dispatcher> = Arc::new(HttpDispatcher::new(&config.client)?);
            let tree = ModelTree::new(dispatcher);
            let continuation = Arc::new(TraverseContinuation::new());
            let stopper = continuation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    stopper.stop();
                }
            });

            let context = tree
                .traverse(&continuation, &start, &excluded, flags, |address, _| {
                    println!("{address}");
                })?
                .await;

            println!();
            println!("State:     {}", context.state());
            println!("Processed: {}", context.processed());
            println!("Accepted:  {}", context.accepted());
            let failed = context.failed();
            println!("Failed:    {}", failed.len());
            for (address, operation) in &failed {
                println!("  {address}: {operation}");
            }
        }
    }

    Ok(())
}

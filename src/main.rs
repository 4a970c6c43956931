use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use nodepool::adapters::{ReqwestSubscriptionSource, TcpProber};
use nodepool::config::Settings;
use nodepool::domain::{NodeCache, NodeService, ProbeCoordinator, Result};

#[derive(Parser, Debug)]
#[clap(version = env!("NODEPOOL_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
pub struct Opts {
    /// Configuration file (defaults to the platform config directory)
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the subscription URL
    #[clap(long, short = 'u')]
    subscription_url: Option<String>,

    /// Override the maximum number of nodes probed per refresh
    #[clap(long)]
    probe_limit: Option<usize>,

    /// Number of nodes to request
    #[clap(long, short = 'n', default_value_t = 1)]
    count: usize,

    /// Also print the vmess:// link of each node
    #[clap(long, short = 'l')]
    link: bool,
}

fn settings(opts: &Opts) -> Result<Settings> {
    let mut settings = Settings::load(opts.config.as_deref())?;
    if let Some(url) = &opts.subscription_url {
        settings.subscription_url = url.clone();
    }
    if let Some(limit) = opts.probe_limit {
        settings.probe_limit = limit;
    }
    settings.validate()?;
    Ok(settings)
}

fn build_service(settings: &Settings) -> Result<NodeService> {
    let url = settings.subscription_url.clone();
    let source = if settings.use_system_proxy {
        ReqwestSubscriptionSource::new(url, settings.download_timeout())?
    } else {
        ReqwestSubscriptionSource::direct(url, settings.download_timeout())?
    };
    let source = Arc::new(source);
    let coordinator = ProbeCoordinator::new(Arc::new(TcpProber::new()))
        .with_limit(settings.probe_limit)
        .with_timeout(settings.probe_timeout());

    Ok(NodeService::new(
        source,
        coordinator,
        NodeCache::new(settings.cache_duration()),
    ))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();

    let service = match settings(&opts).and_then(|s| build_service(&s)) {
        Ok(service) => service,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut served = 0;
    for _ in 0..opts.count {
        let node = match service.get_node().await {
            Some(node) => node,
            None => {
                error!("No reachable node available, try again later");
                continue;
            }
        };
        served += 1;

        println!("{}", node);
        if opts.link {
            match node.to_link() {
                Ok(link) => println!("{}", link),
                Err(e) => error!("{}", e),
            }
        }
    }

    if served == 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

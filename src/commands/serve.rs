use std::{error::Error, path::PathBuf, sync::Arc, time::Duration};
use clap::Args;
use jsonmock::{
    config::{address::ListenAddress, settings::Settings},
    filewatcher::watcher,
    http::{dispatch::Dispatcher, router::RouteTable, server},
    mock::definition::example_definition,
};
use tracing::{error, info};

/// Serve the mock definitions of a folder.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address and optional url prefix: [http(s)://]host:port[/prefix]
    #[arg(value_name = "ADDRESS", required_unless_present = "print_example")]
    pub address: Option<String>,

    /// Folder with the .json mock definitions (defaults to the working directory)
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Optional settings file (dns_resolver_1, dns_resolver_2). The resolvers
    /// are validated and logged only; the listener resolves through the system.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How often the folder is polled for changes, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = watcher::DEFAULT_POLL_INTERVAL.as_millis() as u64)]
    pub poll_interval_ms: u64,

    /// Disable file-watching
    #[arg(long)]
    pub no_watch: bool,

    /// Print an example mock definition and exit
    #[arg(long)]
    pub print_example: bool,
}

pub async fn run(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    let example = serde_json::to_string_pretty(&example_definition())?;
    if args.print_example {
        println!("{}", example);
        return Ok(());
    }

    let raw_address = args.address.as_deref().unwrap_or_default();
    let address = ListenAddress::parse(raw_address)?;

    let settings = Settings::load(args.config.as_deref());
    let [dns_1, dns_2] = settings.dns_resolvers();
    info!(%dns_1, %dns_2, "DNS resolvers configured");

    let root = match args.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let root = root.canonicalize()?;
    info!("Use following json structure: \n{}", example);

    let table = Arc::new(RouteTable::new(root, &address.prefix));

    let watch_handle = if args.no_watch {
        let registered = watcher::scan_directory(&table)?;
        info!(registered, folder = %table.root().display(), "Loaded .json files, watching disabled");
        None
    } else {
        let interval = Duration::from_millis(args.poll_interval_ms.max(1));
        Some(watcher::spawn_watcher(Arc::clone(&table), interval)?)
    };

    let listener = match server::bind(&address.bind_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to start http server.");
            if let Some(handle) = watch_handle {
                handle.close();
            }
            return Err(e.into());
        }
    };
    info!("Started http server on {}:{}{}", address.host, address.port, address.prefix);

    let dispatcher = Arc::new(Dispatcher::new(table, &address.host, address.port));
    server::run(listener, dispatcher, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    if let Some(handle) = watch_handle {
        handle.close();
    }
    info!("Mock server stopped");
    Ok(())
}

//! Appshell CLI.
//!
//! **Commands**
//! - `run <app>`: bootstrap an application from a module tree on disk
//! - `resolve <id>`: print the asset path a module id maps to
//!
//! `run` loads `shell.app.<name>.main` and its transitive dependencies from
//! `--root`, waits for the graph to settle, drains deferred wiring, and
//! starts the application the main manifest named.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use appshell::{
    Bootstrap, BootstrapCtx, ContainerHost, DesktopHost, FsModuleFetcher, HostHooks,
    KeyValueStore, ModuleId, PathResolver, Platform,
};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bootstrap and start an application.
    Run {
        /// Application name; the root module is `shell.app.<name>.main`.
        app: String,

        /// Directory containing the module tree.
        #[arg(long, value_name = "DIR", default_value = ".")]
        root: std::path::PathBuf,

        /// User-agent string for platform detection.
        #[arg(long, value_name = "UA", default_value = "")]
        user_agent: String,

        /// Directory for persistent application state. In-memory when
        /// omitted.
        #[arg(long, value_name = "DIR")]
        storage_dir: Option<std::path::PathBuf>,
    },
    /// Print the asset path for a module id.
    Resolve {
        /// Module id, e.g. `shell.app.demo.main`.
        id: String,

        /// Treat framework utility modules as pre-bundled.
        #[arg(long, default_value_t = false)]
        bundled: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Run {
            app,
            root,
            user_agent,
            storage_dir,
        } => {
            let platform = Platform::detect(&user_agent);
            tracing::info!(%platform, root = %root.display(), "starting");

            // Platforms with no host-readiness signal are ready on
            // arrival; containered platforms wait for the container, and
            // with no container attached that means the fail-open path.
            let host: Arc<dyn HostHooks> = if platform.assumes_ready() {
                Arc::new(DesktopHost::new())
            } else {
                tracing::warn!(%platform, "no container attached; readiness will fail open");
                Arc::new(ContainerHost::new())
            };

            let storage = match storage_dir {
                Some(dir) => Arc::new(KeyValueStore::with_storage(dir)?),
                None => Arc::new(KeyValueStore::new()),
            };

            let ctx = BootstrapCtx::with_storage(storage);
            let fetcher = Arc::new(FsModuleFetcher::new(root, Arc::clone(&ctx)));
            let mut bootstrap = Bootstrap::new(ctx, PathResolver::new(), fetcher, host);
            let _handle = bootstrap.start(&app).await?;
            println!("application `{app}` started");
            Ok(())
        }
        Command::Resolve { id, bundled } => {
            let resolver = PathResolver::new().with_bundled(bundled);
            let asset = resolver.resolve(&ModuleId::new(id));
            if asset.skip {
                println!("{} (pre-bundled, skipped)", asset.path);
            } else {
                println!("{}", asset.path);
            }
            Ok(())
        }
    }
}

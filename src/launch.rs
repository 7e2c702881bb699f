use std::io::IsTerminal;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use argh::FromArgs;
use exitcode::ExitCode;
use swarm_discovery::client::{self, Remote, TargetSource};
use swarm_discovery::config::Config;
use swarm_discovery::resolve::Resolver;
use swarm_discovery::{Error, server, signal, trace};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

#[derive(FromArgs)]
#[argh(
    description = "Discover Prometheus scrape targets in a Docker Swarm cluster",
    help_triggers("-h", "--help")
)]
pub struct RootCommand {
    #[argh(switch, short = 'v', description = "show version")]
    version: bool,

    #[argh(subcommand)]
    sub_commands: Option<SubCommands>,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum SubCommands {
    Server(ServerCommand),
    Client(ClientCommand),
}

#[derive(FromArgs)]
#[argh(
    subcommand,
    name = "server",
    description = "Serve scrape targets over HTTP, resolved on every request",
    help_triggers("-h", "--help")
)]
struct ServerCommand {
    #[argh(
        option,
        short = 'l',
        default = "\"info\".to_string()",
        description = "log level"
    )]
    log_level: String,

    #[argh(
        option,
        default = "default_listen()",
        description = "address to listen on, default 0.0.0.0:8080"
    )]
    listen: SocketAddr,

    #[argh(option, short = 'c', description = "read configuration from the file")]
    config: Option<PathBuf>,

    #[argh(
        option,
        description = "docker engine api address, e.g. unix:///var/run/docker.sock"
    )]
    docker_host: Option<String>,
}

#[derive(FromArgs)]
#[argh(
    subcommand,
    name = "client",
    description = "Periodically write scrape targets to a file for file based discovery",
    help_triggers("-h", "--help")
)]
struct ClientCommand {
    #[argh(
        option,
        short = 'l',
        default = "\"info\".to_string()",
        description = "log level"
    )]
    log_level: String,

    #[argh(
        option,
        short = 's',
        default = "\"http://prometheus-swarm-discovery:8080\".to_string()",
        description = "discovery server address"
    )]
    server: String,

    #[argh(
        option,
        short = 'p',
        default = "\"prometheus\".to_string()",
        description = "name of the prometheus service"
    )]
    prometheus: String,

    #[argh(
        option,
        short = 'o',
        default = "PathBuf::from(\"swarm-endpoints.json\")",
        description = "output file"
    )]
    output: PathBuf,

    #[argh(
        option,
        short = 'i',
        default = "30",
        description = "seconds between two discoveries"
    )]
    interval: u64,

    #[argh(
        switch,
        description = "resolve against the docker engine api directly, without a discovery server"
    )]
    standalone: bool,

    #[argh(option, description = "expose the health check on this address")]
    health_listen: Option<SocketAddr>,

    #[argh(option, short = 'c', description = "read configuration from the file")]
    config: Option<PathBuf>,

    #[argh(
        option,
        description = "docker engine api address, e.g. unix:///var/run/docker.sock"
    )]
    docker_host: Option<String>,
}

impl RootCommand {
    #![allow(clippy::print_stdout, clippy::print_stderr)]
    fn show_version(&self) {
        println!(
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        );
    }

    pub fn run(&self) -> Result<(), ExitCode> {
        if self.version {
            self.show_version();
            return Ok(());
        }

        match &self.sub_commands {
            Some(SubCommands::Server(cmd)) => cmd.run(),
            Some(SubCommands::Client(cmd)) => cmd.run(),
            None => {
                eprintln!("a subcommand is required, run with --help for usage");
                Err(exitcode::USAGE)
            }
        }
    }
}

#[allow(clippy::print_stderr)]
fn init_logging(level: &str) -> Result<(), ExitCode> {
    let levels = match std::env::var(trace::LOG_ENV) {
        Ok(levels) => levels,
        Err(_) => trace::directives(level).map_err(|err| {
            eprintln!("{err}");
            exitcode::CONFIG
        })?,
    };

    let color = std::io::stdout().is_terminal();
    trace::init(color, &levels).map_err(|err| {
        eprintln!("init logging failed, {err}");
        exitcode::CONFIG
    })
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, ExitCode> {
    Config::load_optional(path).map_err(|err| {
        error!(message = "load configuration failed", %err);
        exitcode::CONFIG
    })
}

fn build_runtime() -> Result<Runtime, ExitCode> {
    tokio::runtime::Builder::new_multi_thread()
        .thread_name("swarm-discovery-worker")
        .enable_io()
        .enable_time()
        .build()
        .map_err(|err| {
            error!(message = "build tokio runtime failed", %err);
            exitcode::SOFTWARE
        })
}

fn build_resolver(config: &Config, docker_host: Option<&str>) -> Result<Resolver, ExitCode> {
    let endpoint = config.endpoint(docker_host).map_err(|err| {
        error!(message = "invalid docker host", %err);
        exitcode::CONFIG
    })?;

    let client = docker::Client::new(endpoint);

    info!(
        message = "use docker engine api",
        endpoint = %client.endpoint(),
        tasks = %config.tasks,
        timeout = ?config.timeout(),
    );

    Ok(Resolver::new(
        Arc::new(client),
        config.tasks,
        config.timeout(),
    ))
}

fn install_signals(shutdown: &CancellationToken) -> Result<(), ExitCode> {
    signal::shutdown_on_signals(shutdown.clone()).map_err(|err| {
        error!(message = "install signal handlers failed", %err);
        exitcode::OSERR
    })
}

fn exit_code(err: &Error) -> ExitCode {
    match err {
        Error::Io { .. } => exitcode::IOERR,
        Error::Config { .. } => exitcode::CONFIG,
        _ => exitcode::UNAVAILABLE,
    }
}

impl ServerCommand {
    fn run(&self) -> Result<(), ExitCode> {
        init_logging(&self.log_level)?;
        let config = load_config(self.config.as_ref())?;
        let runtime = build_runtime()?;

        runtime.block_on(async move {
            let resolver = build_resolver(&config, self.docker_host.as_deref())?;

            // the cluster may come up later, requests report failures until then
            match resolver.ping().await {
                Ok(ping) => info!(
                    message = "docker engine api reachable",
                    api_version = %ping.api_version,
                    swarm = ?ping.swarm_status,
                ),
                Err(err) => warn!(message = "docker engine api unreachable", %err),
            }

            let shutdown = CancellationToken::new();
            install_signals(&shutdown)?;

            server::run(self.listen, resolver, shutdown)
                .await
                .map_err(|err| {
                    error!(message = "discovery server failed", %err);
                    exit_code(&err)
                })
        })?;

        runtime.shutdown_timeout(Duration::from_secs(5));

        Ok(())
    }
}

impl ClientCommand {
    fn source(&self, config: &Config) -> Result<TargetSource, ExitCode> {
        if self.standalone {
            return Ok(TargetSource::Local(build_resolver(
                config,
                self.docker_host.as_deref(),
            )?));
        }

        match self.server.parse::<http::Uri>() {
            Ok(uri) if uri.scheme_str() == Some("http") && uri.authority().is_some() => {
                Ok(TargetSource::Remote(Remote::new(self.server.as_str())))
            }
            _ => {
                error!(
                    message = "invalid discovery server address, expect http://host:port",
                    server = %self.server,
                );

                Err(exitcode::CONFIG)
            }
        }
    }

    fn run(&self) -> Result<(), ExitCode> {
        init_logging(&self.log_level)?;

        if self.interval == 0 {
            error!(message = "interval must be greater than 0");
            return Err(exitcode::CONFIG);
        }

        let config = load_config(self.config.as_ref())?;
        let runtime = build_runtime()?;

        runtime.block_on(async move {
            let source = self.source(&config)?;
            let shutdown = CancellationToken::new();
            install_signals(&shutdown)?;

            if let Some(addr) = self.health_listen {
                let source = source.clone();
                let shutdown = shutdown.clone();

                tokio::spawn(async move {
                    if let Err(err) = client::serve_health(addr, source, shutdown).await {
                        error!(message = "serve health check failed", %err);
                    }
                });
            }

            info!(
                message = "start polling targets",
                prometheus = %self.prometheus,
                output = %self.output.display(),
                interval = self.interval,
                standalone = self.standalone,
            );

            let result = client::run(
                &source,
                &self.prometheus,
                &self.output,
                Duration::from_secs(self.interval),
                shutdown.clone(),
            )
            .await;

            // stops the health listener as well
            shutdown.cancel();

            result.map_err(|err| {
                error!(message = "polling targets stopped", %err);
                exit_code(&err)
            })
        })?;

        runtime.shutdown_timeout(Duration::from_secs(5));

        Ok(())
    }
}

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use port_sweep::history::ScanHistory;
use port_sweep::runner::{self, ScanOptions};
use port_sweep::types::HostReport;
use port_sweep::{banner, ports, probe, report, server, services, targets};

/// port-sweep — concurrent TCP connect port scanner with banner probing and a tiny web UI.
#[derive(Debug, Parser)]
#[command(name = "port-sweep", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan one host for open ports.
    Scan {
        host: String,
        #[command(flatten)]
        tuning: Tuning,
        /// Port range, e.g. `1-1000` or `443`.
        #[arg(long, default_value = "1-1000")]
        ports: String,
        /// Disable the progress bar.
        #[arg(long, default_value_t = false)]
        no_progress: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Check whether a host answers on a few common ports.
    Ping {
        host: String,
        #[arg(long = "timeout-ms", default_value_t = 2000)]
        timeout_ms: u64,
    },
    /// Grab a service banner from one port.
    Banner {
        host: String,
        port: u16,
        #[arg(long = "timeout-ms", default_value_t = 5000)]
        timeout_ms: u64,
    },
    /// Scan an IP range (`192.168.1.1-192.168.1.10`) or CIDR, skipping dead hosts.
    Range {
        targets: String,
        #[command(flatten)]
        tuning: Tuning,
        #[arg(long, default_value = "1-100")]
        ports: String,
        /// Liveness check timeout per port in milliseconds.
        #[arg(long = "alive-timeout-ms", default_value_t = 500)]
        alive_timeout_ms: u64,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Serve the web UI and JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,
    },
    /// Interactive prompt accepting the other commands.
    Shell,
}

#[derive(Debug, Clone, Args)]
struct Tuning {
    /// Max concurrent TCP connect attempts.
    #[arg(long, env = "PORT_SWEEP_CONCURRENCY", default_value_t = 100)]
    concurrency: usize,

    /// Per-probe connect timeout in milliseconds.
    #[arg(long = "timeout-ms", env = "PORT_SWEEP_TIMEOUT_MS", default_value_t = 500)]
    timeout_ms: u64,
}

#[derive(Debug, Clone, Args)]
struct OutputArgs {
    /// Write open ports as CSV to this path.
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Write a plain-text report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write results as pretty JSON to this path.
    #[arg(long)]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Shell => run_shell().await,
        cmd => execute(cmd).await,
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).compact().init();
}

/// Cancel `token` on Ctrl+C. Abort the returned handle once the work is done.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nCancelling scan...");
            token.cancel();
        }
    })
}

async fn execute(cmd: Command) -> Result<()> {
    match cmd {
        Command::Scan {
            host,
            tuning,
            ports: port_arg,
            no_progress,
            output,
        } => {
            let (start, end) = ports::parse_port_range(&port_arg)?;
            let opts = ScanOptions {
                start_port: start,
                end_port: end,
                concurrency: tuning.concurrency,
                timeout: Duration::from_millis(tuning.timeout_ms),
                show_progress: !no_progress,
                ..ScanOptions::default()
            };
            println!("\nStarting port scan on host {host} (ports {start}-{end})");
            println!(
                "Using {} workers with {}ms timeout\n",
                opts.concurrency, tuning.timeout_ms
            );

            let started = Instant::now();
            let cancel = CancellationToken::new();
            let watcher = cancel_on_ctrl_c(cancel.clone());
            let result = runner::scan_host(&host, &opts, cancel).await;
            watcher.abort();
            let host_report = result?;

            print_host(&host_report);
            write_outputs(&output, &[host_report], started.elapsed())
        }
        Command::Ping { host, timeout_ms } => {
            println!("Pinging {host}...");
            if probe::is_alive(&host, Duration::from_millis(timeout_ms)).await {
                println!("Host is up!");
            } else {
                println!("Host appears to be down.");
            }
            Ok(())
        }
        Command::Banner {
            host,
            port,
            timeout_ms,
        } => {
            println!("Grabbing banner from {host}:{port}...");
            match banner::grab_banner(&host, port, Duration::from_millis(timeout_ms)).await {
                Ok(b) if !b.is_empty() => println!("Banner: {b}"),
                Ok(_) => println!("Could not retrieve banner (no banner available)"),
                Err(e) => println!("Error: {e}"),
            }
            Ok(())
        }
        Command::Range {
            targets: target_arg,
            tuning,
            ports: port_arg,
            alive_timeout_ms,
            output,
        } => {
            let hosts = targets::expand_targets(&target_arg)?;
            let (start, end) = ports::parse_port_range(&port_arg)?;
            let opts = ScanOptions {
                start_port: start,
                end_port: end,
                concurrency: tuning.concurrency,
                timeout: Duration::from_millis(tuning.timeout_ms),
                liveness_timeout: Duration::from_millis(alive_timeout_ms),
                show_progress: true,
            };
            println!(
                "Scanning {} hosts in range {target_arg} (ports {start}-{end})",
                hosts.len()
            );

            let started = Instant::now();
            let cancel = CancellationToken::new();
            let watcher = cancel_on_ctrl_c(cancel.clone());
            let reports = runner::scan_hosts(&hosts, &opts, cancel).await;
            watcher.abort();
            let reports = reports?;

            for r in &reports {
                print_host(r);
            }
            println!(
                "\n{} of {} hosts were up",
                reports.len(),
                hosts.len()
            );
            write_outputs(&output, &reports, started.elapsed())
        }
        Command::Serve { bind } => {
            let history = ScanHistory::new();
            let b = bind.clone();
            tokio::spawn(async move {
                if let Err(e) = server::spawn_server(&b, history).await {
                    eprintln!("HTTP UI server error: {e}");
                }
            });
            println!("UI server starting at http://{} (Ctrl+C to stop)", bind);
            let _ = tokio::signal::ctrl_c().await;
            Ok(())
        }
        Command::Shell => {
            println!("Already in the interactive shell.");
            Ok(())
        }
    }
}

async fn run_shell() -> Result<()> {
    println!("Commands: scan, ping, banner, range, serve, help, exit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nport-sweep> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.first().copied() {
            None => continue,
            Some("exit") | Some("quit") => {
                println!("Goodbye!");
                break;
            }
            Some("help") => {
                let _ = <Cli as clap::CommandFactory>::command().print_help();
                continue;
            }
            Some(_) => {}
        }
        match Cli::try_parse_from(std::iter::once("port-sweep").chain(words)) {
            Ok(cli) => {
                if let Err(e) = execute(cli.command).await {
                    println!("Error: {e:#}");
                }
            }
            Err(e) => {
                let _ = e.print();
            }
        }
    }
    Ok(())
}

fn print_host(r: &HostReport) {
    let status = if r.status == port_sweep::ScanStatus::Cancelled {
        " (cancelled, partial results)"
    } else {
        ""
    };
    println!("\nScan finished for {}{status}", r.host);
    println!("{}", report::format_summary(&r.host, &r.port_numbers()));
    if r.ports.is_empty() {
        return;
    }
    println!("OS Detection: {}", services::guess_os(&r.port_numbers()));
    print_ports_table(r);
}

fn print_ports_table(r: &HostReport) {
    let port_w = 5usize;
    let mut service_w = "service".len();
    for p in &r.ports {
        service_w = service_w.max(p.service.len());
    }
    println!("{:>port_w$}  {:<service_w$}  banner", "port", "service");
    println!("{:->port_w$}  {:-<service_w$}  {:-<6}", "", "", "");
    for p in &r.ports {
        println!(
            "{:>port_w$}  {:<service_w$}  {}",
            p.port, p.service, p.banner
        );
    }
}

fn write_outputs(output: &OutputArgs, reports: &[HostReport], elapsed: Duration) -> Result<()> {
    if let Some(path) = output.csv.as_deref() {
        report::save_csv(path, reports)?;
        println!("Wrote CSV results to {}", path.display());
    }
    if let Some(path) = output.report.as_deref() {
        report::save_report(path, &report::generate_report(reports, elapsed))?;
        println!("Wrote report to {}", path.display());
    }
    if let Some(path) = output.json.as_deref() {
        let file = std::fs::File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, reports)?;
        println!("Wrote JSON results to {}", path.display());
    }
    Ok(())
}

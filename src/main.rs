use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, error, info, Level, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use tokio::runtime::Runtime;

use sftp_put::cli::{Args, Commands, PutOpts};
use sftp_put::config::{expand_home, load_or_default, ClientConfig};
use sftp_put::remote::memory::MemoryStore;
use sftp_put::remote::sftp::{SftpConfig, SftpConnection};
use sftp_put::remote::RemoteConnection;
use sftp_put::security::{destination_in_dir, safe_error_message, scrub_path};
use sftp_put::upload::{parse_permissions, Encoding, UploadOptions, UploadSource, Uploader};

fn main() {
    let args = Args::parse();

    if let Err(e) = initialize_logging(args.verbose) {
        eprintln!("{}", safe_error_message("Failed to initialize logging", &format!("{:#}", e)));
    }

    if let Err(e) = run(args) {
        report_fatal(&safe_error_message("sftp-put failed", &format!("{:#}", e)));
        std::process::exit(1);
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum ErrorSink {
    Log,
    Stderr,
}

/// Fatal errors go to stderr when no logger would record them
fn error_sink() -> ErrorSink {
    if log::log_enabled!(Level::Error) {
        ErrorSink::Log
    } else {
        ErrorSink::Stderr
    }
}

fn report_fatal(message: &str) {
    match error_sink() {
        ErrorSink::Log => error!("{}", message),
        ErrorSink::Stderr => eprintln!("{}", message),
    }
}

fn run(args: Args) -> Result<()> {
    if let Commands::InitConfig { path } = &args.command {
        info!("Creating default configuration file at {}", path.display());
        ClientConfig::create_default_config_file(path)?;
        info!("Configuration created successfully");
        return Ok(());
    }

    let config = load_or_default(args.config.as_deref())?;
    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;

    runtime.block_on(async {
        let (remote, connection) = open_remote(&args, &config).await?;
        let uploader = Uploader::new(remote);

        let result = match &args.command {
            Commands::Put(opts) => handle_put(&uploader, &config, opts).await,
            Commands::Stat { path } => handle_stat(&uploader, path).await,
            Commands::InitConfig { .. } => Ok(()),
        };

        // Drop the uploader so the connection has a single owner again
        drop(uploader);
        if let Some(connection) = connection.and_then(|c| Arc::try_unwrap(c).ok()) {
            if let Err(e) = connection.close().await {
                debug!("{}", safe_error_message("Error while disconnecting", &e));
            }
        }

        result
    })
}

/// Apply command-line overrides to the configured connection settings
fn connection_config(args: &Args, config: &ClientConfig) -> Result<SftpConfig> {
    let mut sftp = config.sftp_config()?;

    if let Some(host) = &args.host {
        sftp.host = host.clone();
    }
    if let Some(port) = args.port {
        sftp.port = port;
    }
    if let Some(user) = &args.user {
        sftp.username = user.clone();
    }
    if let Some(key) = &args.key {
        sftp.private_key_path = Some(key.clone());
    }
    if let Some(var) = &args.password_env {
        let password = std::env::var(var)
            .context(format!("Password environment variable {} is not set", var))?;
        sftp.password = Some(password);
        // An explicit password wins over the configured key
        if args.key.is_none() {
            sftp.private_key_path = None;
        }
    }
    sftp.private_key_path = sftp
        .private_key_path
        .take()
        .map(|key| PathBuf::from(expand_home(&key.to_string_lossy())));

    Ok(sftp)
}

async fn open_remote(
    args: &Args,
    config: &ClientConfig,
) -> Result<(Arc<dyn RemoteConnection>, Option<Arc<SftpConnection>>)> {
    if args.dry_run {
        info!("Dry run: uploading into an in-memory store");
        let store = MemoryStore::new("/");
        if let Commands::Put(opts) = &args.command {
            // the destination directory exists in a dry run
            if let Some((parent, _)) = resolve_destination(opts)?.rsplit_once('/') {
                store.create_dir_all(parent);
            }
        }
        let store: Arc<dyn RemoteConnection> = Arc::new(store);
        return Ok((store, None));
    }

    let sftp_config = connection_config(args, config)?;
    if let Some(key) = &sftp_config.private_key_path {
        debug!("Using private key {}", scrub_path(&key.to_string_lossy()));
    }

    let connection = Arc::new(SftpConnection::connect(sftp_config).await?);
    let remote: Arc<dyn RemoteConnection> = connection.clone();
    Ok((remote, Some(connection)))
}

/// Build the upload source named on the command line
fn build_source(opts: &PutOpts, options: &UploadOptions) -> Result<UploadSource> {
    if opts.data {
        let encoding: Encoding = options.parsed_encoding()?;
        return Ok(UploadSource::text(&opts.source, encoding)?);
    }

    if opts.source == "-" {
        return Ok(UploadSource::reader(tokio::io::stdin(), options.chunk_size));
    }

    Ok(UploadSource::path(&opts.source))
}

/// Resolve the destination, filling in the source file name for `dir/`
fn resolve_destination(opts: &PutOpts) -> Result<String> {
    if !opts.destination.ends_with('/') {
        return Ok(opts.destination.clone());
    }

    if opts.data || opts.source == "-" {
        return Err(anyhow!(
            "Destination {} is a directory; a file name is required for this source",
            opts.destination
        ));
    }

    destination_in_dir(&opts.destination, Path::new(&opts.source))
        .ok_or_else(|| anyhow!("Cannot derive a file name from {}", opts.source))
}

async fn handle_put(uploader: &Uploader, config: &ClientConfig, opts: &PutOpts) -> Result<()> {
    let mut options = config.upload_options()?;
    if let Some(encoding) = &opts.encoding {
        options = options.encoding(encoding.clone());
    }
    if let Some(mode) = &opts.mode {
        options = options.permissions(parse_permissions(mode)?);
    }
    if let Some(secs) = opts.timeout {
        options = options.timeout(Duration::from_secs(secs));
    }

    let source = build_source(opts, &options)?;
    let destination = resolve_destination(opts)?;

    let completion = if opts.append {
        uploader.append(source, &destination, options).await?
    } else {
        uploader.put(source, &destination, options).await?
    };

    info!(
        "{} bytes written to {} ({:.2}s)",
        completion.bytes_transferred,
        completion.destination,
        completion.elapsed.as_secs_f64()
    );
    Ok(())
}

async fn handle_stat(uploader: &Uploader, path: &str) -> Result<()> {
    let stat = uploader
        .stat(path)
        .await
        .context(format!("Failed to stat {}", path))?;

    println!("path:        {}", path);
    println!("kind:        {:?}", stat.kind);
    println!("size:        {}", stat.size);
    if let Some(perm) = stat.permissions {
        println!("permissions: {:o}", perm & 0o7777);
    }
    if let Some(modified) = stat.modified {
        println!("modified:    {}", modified.to_rfc3339());
    }
    Ok(())
}

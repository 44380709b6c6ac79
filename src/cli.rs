use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for sftp-put.
///
/// Connection flags override the values loaded from the configuration file.
#[derive(Parser, Debug)]
#[clap(name = "sftp-put", about = "Upload buffers, streams and files to an SFTP server")]
pub struct Args {
    /// Path to configuration YAML file
    #[clap(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// SFTP server hostname
    #[clap(long, global = true)]
    pub host: Option<String>,

    /// SFTP server port
    #[clap(long, global = true)]
    pub port: Option<u16>,

    /// SFTP username for authentication
    #[clap(short, long, global = true)]
    pub user: Option<String>,

    /// Path to private key file for authentication
    #[clap(short = 'k', long, global = true)]
    pub key: Option<PathBuf>,

    /// Name of the environment variable holding the password
    #[clap(long, global = true)]
    pub password_env: Option<String>,

    /// Use an in-memory store instead of connecting
    #[clap(long, global = true)]
    pub dry_run: bool,

    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file, standard input or literal text
    Put(PutOpts),

    /// Show the attributes of a remote path
    Stat {
        /// Remote path
        path: String,
    },

    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = crate::constants::DEFAULT_CONFIG_NAME)]
        path: PathBuf,
    },
}

/// Options for the put subcommand.
#[derive(ClapArgs, Debug)]
pub struct PutOpts {
    /// Local file, `-` for standard input, or text with --data
    pub source: String,

    /// Remote destination. A trailing `/` uploads into that directory.
    pub destination: String,

    /// Treat SOURCE as the literal content to upload
    #[clap(long)]
    pub data: bool,

    /// Encoding of the text given with --data
    #[clap(long)]
    pub encoding: Option<String>,

    /// Append to the destination instead of overwriting it
    #[clap(short, long)]
    pub append: bool,

    /// Octal permissions for a newly created file (e.g. 644)
    #[clap(short, long)]
    pub mode: Option<String>,

    /// Abort the transfer after this many seconds
    #[clap(long)]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_put_args_parsing() {
        let args = Args::parse_from([
            "sftp-put",
            "--host", "sftp.example.com",
            "--port", "2222",
            "--user", "tester",
            "put", "/tmp/report.csv", "/upload/",
            "--append",
            "--mode", "640",
        ]);

        assert_eq!(args.host, Some("sftp.example.com".to_string()));
        assert_eq!(args.port, Some(2222));
        assert_eq!(args.user, Some("tester".to_string()));
        match args.command {
            Commands::Put(opts) => {
                assert_eq!(opts.source, "/tmp/report.csv");
                assert_eq!(opts.destination, "/upload/");
                assert!(opts.append);
                assert!(!opts.data);
                assert_eq!(opts.mode.as_deref(), Some("640"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from([
            "sftp-put",
            "put", "hello", "hello.txt",
            "--data",
            "--encoding", "latin1",
            "--key", "/home/tester/.ssh/id_ed25519",
            "--dry-run",
            "-v",
        ]);

        assert!(args.dry_run);
        assert!(args.verbose);
        assert_eq!(args.key, Some(PathBuf::from("/home/tester/.ssh/id_ed25519")));
        match args.command {
            Commands::Put(opts) => {
                assert!(opts.data);
                assert_eq!(opts.encoding.as_deref(), Some("latin1"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_init_config_default_path() {
        let args = Args::parse_from(["sftp-put", "init-config"]);
        match args.command {
            Commands::InitConfig { path } => assert_eq!(path, PathBuf::from("sftp-put.yaml")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_stat_args() {
        let args = Args::parse_from(["sftp-put", "-c", "/etc/sftp-put.yaml", "stat", "upload/a.txt"]);
        assert_eq!(args.config, Some(PathBuf::from("/etc/sftp-put.yaml")));
        assert!(matches!(args.command, Commands::Stat { ref path } if path == "upload/a.txt"));
    }
}

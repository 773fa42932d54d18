use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use env_logger::Env;
use log::{error, info};

use ftp_deploy::config::DEFAULT_CONFIG_FILE;
use ftp_deploy::{deploy, Config, DeployError};

#[derive(Parser, Debug)]
#[command(
    name = "ftp-deploy",
    version,
    about = "Upload a static build to an FTP server, with .htaccess routing for single-page apps",
    long_about = None
)]
struct Cli {
    #[arg(short, long, value_name = "FILE", help = "TOML settings file (default: ./ftp-deploy.toml if present)")]
    config: Option<PathBuf>,

    #[arg(long, help = "FTP host")]
    host: Option<String>,

    #[arg(long, help = "FTP control port")]
    port: Option<u16>,

    #[arg(short, long, help = "Login user")]
    user: Option<String>,

    #[arg(long, env = "FTP_DEPLOY_PASSWORD", hide_env_values = true, help = "Login password")]
    password: Option<String>,

    #[arg(long, value_name = "DIR", help = "Local build directory to upload")]
    local_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Remote root directory, created when missing")]
    remote_dir: Option<String>,

    #[arg(long, value_name = "DIR", conflicts_with = "no_clean", help = "Remote subdirectory to empty first")]
    clean: Option<String>,

    #[arg(long, help = "Do not clean anything before uploading")]
    no_clean: bool,

    #[arg(long, value_name = "PATH", help = "RewriteBase of the generated .htaccess")]
    rewrite_base: Option<String>,

    #[arg(long, help = "Do not upload an .htaccess")]
    no_htaccess: bool,

    #[arg(long, help = "Use explicit FTPS (AUTH TLS)")]
    secure: bool,

    #[arg(short, long, action = ArgAction::Count, help = "More output (-v debug, -vv protocol trace)")]
    verbose: u8,
}

impl Cli {
    fn load_config(&self) -> Result<Config, DeployError> {
        let mut config = match self.config {
            Some(ref path) => Config::load(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Config::load(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Config::default(),
        };

        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ref user) = self.user {
            config.username = user.clone();
        }
        if let Some(ref password) = self.password {
            config.password = password.clone();
        }
        if let Some(ref dir) = self.local_dir {
            config.local_dir = dir.clone();
        }
        if let Some(ref dir) = self.remote_dir {
            config.remote_dir = dir.clone();
        }
        if self.clean.is_some() {
            config.set_clean(self.clean.clone());
        }
        if self.no_clean {
            config.clean = None;
        }
        if let Some(ref base) = self.rewrite_base {
            config.rewrite_base = base.clone();
        }
        if self.no_htaccess {
            config.htaccess = false;
        }
        if self.secure {
            config.secure = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    match deploy(&config) {
        Ok(report) => {
            info!(
                "Deployment completed: {} files ({} bytes), {} directories created",
                report.mirror.files_uploaded, report.mirror.bytes_uploaded, report.mirror.directories_created
            );
            if let Some(ref url) = config.url {
                info!("URL: {}", url);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Deployment failed: {}", err);
            ExitCode::FAILURE
        }
    }
}

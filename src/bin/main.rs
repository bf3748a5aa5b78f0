//! S/MIME Signer CLI
//!
//! Builds and signs a plain-text message, inspects signing identities and
//! manages the configuration file.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use std::io::Write;
use std::path::PathBuf;
use smime_signer::domain::identity::describe_name;
use smime_signer::{ConfigManager, MimeNode, SignatureMode, SmimeConfiguration, SmimeSigner};

#[derive(Parser)]
#[command(name = "smime-signer")]
#[command(about = "Sign outgoing mail as S/MIME multipart/signed")]
#[command(long_about = "
S/MIME Signer - detached CMS signatures for outgoing mail

EXAMPLES:
    # Sign with PEM certificate and key
    smime-signer sign --cert me.pem --key me.key \\
        --from me@example.com --to you@example.com --subject Hi --body 'Hello' -o hi.eml

    # Sign with a PKCS#12 archive (passphrase from SMIME_PASSPHRASE)
    smime-signer sign --p12 me.p12 --from me@example.com --to you@example.com --body-file note.txt

    # Show which identity would be used
    smime-signer inspect

    # Create default configuration file
    smime-signer config init

ENVIRONMENT VARIABLES:
    SMIME_PASSPHRASE  PKCS#12 archive passphrase (name configurable)
    RUST_LOG          Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct IdentityArgs {
    /// PEM certificate (overrides config)
    #[arg(long, value_name = "CERT_PEM")]
    cert: Option<PathBuf>,

    /// PEM private key (overrides config)
    #[arg(long, value_name = "KEY_PEM")]
    key: Option<PathBuf>,

    /// Additional chain certificate, repeatable
    #[arg(long, value_name = "CHAIN_PEM")]
    chain: Vec<PathBuf>,

    /// PKCS#12 archive (overrides config)
    #[arg(long, value_name = "ARCHIVE")]
    p12: Option<PathBuf>,

    /// Archive passphrase
    #[arg(long, env = "SMIME_PASSPHRASE", hide_env_values = true)]
    passphrase: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a text/plain message and sign it
    Sign {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Sender address
        #[arg(long)]
        from: String,

        /// Recipient address, repeatable
        #[arg(long, required = true)]
        to: Vec<String>,

        /// Subject line
        #[arg(long, default_value = "")]
        subject: String,

        /// Message body
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the message body from a file
        #[arg(long, value_name = "FILE")]
        body_file: Option<PathBuf>,

        /// Signature mode (overrides config)
        #[arg(long, value_enum)]
        mode: Option<SignatureModeArg>,

        /// Output .eml file (defaults to stdout)
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,
    },

    /// Resolve the signing identity and show its details
    Inspect {
        #[command(flatten)]
        identity: IdentityArgs,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,
}

#[derive(ValueEnum, Clone, Copy)]
enum SignatureModeArg {
    Full,
    Minimal,
}

impl From<SignatureModeArg> for SignatureMode {
    fn from(arg: SignatureModeArg) -> Self {
        match arg {
            SignatureModeArg::Full => SignatureMode::Full,
            SignatureModeArg::Minimal => SignatureMode::Minimal,
        }
    }
}

/// Parameters for the sign command
struct SignCommandArgs {
    identity: IdentityArgs,
    from: String,
    to: Vec<String>,
    subject: String,
    body: Option<String>,
    body_file: Option<PathBuf>,
    mode: Option<SignatureModeArg>,
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    match cli.command {
        Commands::Sign {
            identity,
            from,
            to,
            subject,
            body,
            body_file,
            mode,
            output,
        } => {
            let args = SignCommandArgs {
                identity,
                from,
                to,
                subject,
                body,
                body_file,
                mode,
                output,
            };
            handle_sign_command(&manager, args).await?;
        }

        Commands::Inspect { identity } => {
            handle_inspect_command(&manager, identity).await?;
        }

        Commands::Config(config_cmd) => {
            handle_config_command(&manager, config_cmd)?;
        }
    }

    Ok(())
}

/// File configuration (when present) with command-line identity overrides applied.
fn effective_config(manager: &ConfigManager, overrides: IdentityArgs) -> Result<SmimeConfiguration> {
    let mut config = if manager.config_path().exists() {
        manager.load()?
    } else {
        SmimeConfiguration::default()
    };

    if overrides.p12.is_some() {
        config.certificate_path = None;
        config.key_path = None;
        config.archive_path = overrides.p12;
    }
    if overrides.cert.is_some() || overrides.key.is_some() {
        config.archive_path = None;
        config.certificate_path = overrides.cert.or(config.certificate_path);
        config.key_path = overrides.key.or(config.key_path);
    }
    if !overrides.chain.is_empty() {
        config.chain_paths = overrides.chain;
    }
    if overrides.passphrase.is_some() {
        config.passphrase = overrides.passphrase;
    }
    Ok(config)
}

async fn handle_sign_command(manager: &ConfigManager, args: SignCommandArgs) -> Result<()> {
    let mut config = effective_config(manager, args.identity)?;
    if let Some(mode) = args.mode {
        config.signature_mode = mode.into();
    }

    let body = match (args.body, args.body_file) {
        (Some(body), _) => body,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .into_diagnostic()
            .with_context(|| format!("Failed to read body file {}", path.display()))?,
        (None, None) => String::new(),
    };

    let message = MimeNode::text("text/plain; charset=utf-8", body)
        .with_header("MIME-Version", "1.0")
        .with_header("From", args.from)
        .with_header("To", args.to.join(", "))
        .with_header("Subject", args.subject);

    let signer = SmimeSigner::from_config(&config)?;
    let signed = signer.sign(message).await?;
    let bytes = signed.build().await?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, &bytes)
                .await
                .into_diagnostic()
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "✅ Signed message written to {} ({} bytes, mode {})",
                path.display(),
                bytes.len(),
                config.signature_mode.as_str()
            );
        }
        None => {
            std::io::stdout()
                .write_all(&bytes)
                .into_diagnostic()
                .context("Failed to write signed message to stdout")?;
        }
    }

    Ok(())
}

async fn handle_inspect_command(manager: &ConfigManager, overrides: IdentityArgs) -> Result<()> {
    let config = effective_config(manager, overrides)?;
    let signer = SmimeSigner::from_config(&config)?;
    let identity = signer.identity().await?;

    println!("🔐 Signing identity");
    println!("  Subject: {}", identity.subject());
    println!("  Issuer:  {}", identity.issuer());
    println!("  Serial:  {}", identity.serial_hex());
    println!("  Chain:   {} certificate(s)", identity.chain().len());
    for (index, cert) in identity.chain().iter().enumerate() {
        println!("    [{index}] {}", describe_name(cert.subject_name()));
    }
    Ok(())
}

fn handle_config_command(manager: &ConfigManager, cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let mut config = manager.load_or_create_default()?;
            if config.passphrase.is_some() {
                config.passphrase = Some("***".to_string());
            }
            println!("📄 Configuration: {}", manager.config_path().display());
            let rendered = toml::to_string_pretty(&config)
                .into_diagnostic()
                .context("Failed to render configuration")?;
            println!("{rendered}");
        }
        ConfigCommands::Init => {
            if manager.config_path().exists() {
                println!(
                    "Configuration already exists: {}",
                    manager.config_path().display()
                );
            } else {
                manager.save(&SmimeConfiguration::default())?;
                println!(
                    "✅ Created default configuration: {}",
                    manager.config_path().display()
                );
            }
        }
    }
    Ok(())
}

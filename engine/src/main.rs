//! filecrypt 命令行入口
//!
//! 用法：
//!   filecrypt encrypt <input> <output> [--recipient <age1...|file>]
//!   filecrypt decrypt <input> [--output-dir <dir>] [--identity <file>]
//!   filecrypt keygen [--output <file>] [--protect]
//!
//! 未指定 recipient / identity 时使用密码方式；密码可来自环境变量，
//! 否则在终端交互输入。所有实际逻辑都委托给库。

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use filecrypt::crypto::asymmetric;
use filecrypt::fs::atomic::write_atomic;
use filecrypt::{DecryptMethod, EncryptMethod, EnvelopeError, PlainFile};
use secrecy::ExposeSecret;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

/// 口令保护私钥时使用的 scrypt 工作因子 log2(N)
const KEY_WORK_FACTOR: u8 = 18;

#[derive(Parser)]
#[command(name = "filecrypt", version, about = "Encrypt files with a password or an age public key")]
struct Cli {
    /// 输出调试日志（也可通过 RUST_LOG 控制）
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encrypt a file
    Encrypt {
        input: PathBuf,
        output: PathBuf,

        /// age recipient (age1...) or a file containing one; selects public-key mode
        #[arg(short, long)]
        recipient: Option<String>,

        /// MIME type recorded in the envelope
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,

        #[arg(long, env = "FILECRYPT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Replace the output file if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Decrypt a file, restoring its original name
    Decrypt {
        input: PathBuf,

        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// age identity file; selects public-key mode
        #[arg(short, long)]
        identity: Option<PathBuf>,

        #[arg(long, env = "FILECRYPT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Passphrase for a protected identity file
        #[arg(long, env = "FILECRYPT_PASSPHRASE", hide_env_values = true)]
        passphrase: Option<String>,

        #[arg(short, long)]
        force: bool,
    },

    /// Generate an age identity
    Keygen {
        /// Write the identity here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Protect the identity with a passphrase
        #[arg(long)]
        protect: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if let Some(hint) = err.downcast_ref::<EnvelopeError>().and_then(EnvelopeError::hint) {
                eprintln!("Hint: {hint}");
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Encrypt {
            input,
            output,
            recipient,
            content_type,
            password,
            force,
        } => encrypt(&input, &output, recipient, content_type, password, force),
        Command::Decrypt {
            input,
            output_dir,
            identity,
            password,
            passphrase,
            force,
        } => decrypt(&input, &output_dir, identity, password, passphrase, force),
        Command::Keygen { output, protect } => keygen(output, protect),
    }
}

fn encrypt(
    input: &Path,
    output: &Path,
    recipient: Option<String>,
    content_type: String,
    password: Option<String>,
    force: bool,
) -> Result<()> {
    let source = PlainFile::open(input, content_type)
        .with_context(|| format!("opening {}", input.display()))?;

    let mut report = |percent: u8| debug!(percent, "encrypting");

    let envelope = match recipient {
        Some(recipient) => {
            let recipient = read_key_argument(&recipient)?;
            filecrypt::encrypt(source, EncryptMethod::PublicKey(&recipient), Some(&mut report))?
        }
        None => {
            let password = match password {
                Some(p) => Zeroizing::new(p),
                None => prompt_new_secret("Password")?,
            };
            filecrypt::encrypt(source, EncryptMethod::Password(password.as_str()), Some(&mut report))?
        }
    };

    write_atomic(output, &envelope, force)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(output = %output.display(), "encrypted");
    Ok(())
}

fn decrypt(
    input: &Path,
    output_dir: &Path,
    identity: Option<PathBuf>,
    password: Option<String>,
    passphrase: Option<String>,
    force: bool,
) -> Result<()> {
    let envelope = fs::read(input).with_context(|| format!("reading {}", input.display()))?;

    let mut report = |percent: u8| debug!(percent, "decrypting");

    let decrypted = match identity {
        Some(path) => {
            let key = Zeroizing::new(
                fs::read(&path).with_context(|| format!("reading {}", path.display()))?,
            );

            let passphrase = match passphrase {
                Some(p) => Some(Zeroizing::new(p)),
                None if asymmetric::is_passphrase_protected(&key) => {
                    Some(prompt_secret("Identity passphrase")?)
                }
                None => None,
            };

            let method = DecryptMethod::PrivateKey {
                key: key.as_slice(),
                passphrase: passphrase.as_ref().map(|p| p.as_str()),
            };
            filecrypt::decrypt(&envelope, method, Some(&mut report))?
        }
        None => {
            let password = match password {
                Some(p) => Zeroizing::new(p),
                None => prompt_secret("Password")?,
            };
            filecrypt::decrypt(&envelope, DecryptMethod::Password(password.as_str()), Some(&mut report))?
        }
    };

    let target = output_dir.join(safe_file_name(decrypted.file_name())?);
    write_atomic(&target, &decrypted.bytes, force)
        .with_context(|| format!("writing {}", target.display()))?;

    println!("{}", target.display());
    Ok(())
}

fn keygen(output: Option<PathBuf>, protect: bool) -> Result<()> {
    let identity = age::x25519::Identity::generate();
    let recipient = identity.to_public().to_string();

    let secret = identity.to_string();
    let text = Zeroizing::new(format!(
        "# public key: {recipient}\n{}\n",
        secret.expose_secret()
    ));

    let contents = if protect {
        let passphrase = prompt_new_secret("Identity passphrase")?;
        asymmetric::protect_identity(text.as_str(), passphrase.as_str(), KEY_WORK_FACTOR)?
    } else {
        text.as_bytes().to_vec()
    };

    match output {
        Some(path) => {
            write_atomic(&path, &contents, false)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Public key: {recipient}");
        }
        None => {
            if protect {
                bail!("refusing to print a protected identity to stdout, use --output");
            }
            print!("{}", *text);
        }
    }

    Ok(())
}

/// 参数既可以是公钥本身，也可以是包含公钥的文件路径
fn read_key_argument(arg: &str) -> Result<String> {
    if arg.trim_start().starts_with("age1") {
        return Ok(arg.to_owned());
    }
    fs::read_to_string(arg).with_context(|| format!("reading recipient file {arg}"))
}

/// 描述符中的文件名来自不可信输入，只保留最后一个普通路径组件
fn safe_file_name(name: &str) -> Result<&str> {
    let candidate = name.rsplit(['/', '\\']).next().unwrap_or_default();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        bail!("encrypted file carries an unusable file name: {name:?}");
    }
    Ok(candidate)
}

fn prompt_secret(label: &str) -> Result<Zeroizing<String>> {
    let secret = rpassword::prompt_password(format!("{label}: "))
        .with_context(|| format!("reading {label}"))?;
    Ok(Zeroizing::new(secret))
}

fn prompt_new_secret(label: &str) -> Result<Zeroizing<String>> {
    let first = prompt_secret(label)?;
    let second = prompt_secret(&format!("Confirm {label}"))?;
    if *first != *second {
        bail!("{label} entries do not match");
    }
    if first.is_empty() {
        bail!("{label} must not be empty");
    }
    Ok(first)
}

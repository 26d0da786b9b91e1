//! Paramstore CLI
//!
//! Entry point for the `paramstore` command-line tool: encode and decode
//! parameter files, stage fetched sheet data as a defaults file, and read or
//! write individual parameters through a store config.

use clap::{Parser, Subcommand};
use paramstore::codec::{compute_hmac, decode_auto, verify_hmac, DEFAULT_XOR_KEY};
use paramstore::store::{read_text, wrap_fetched, write_atomic};
use paramstore::{Codec, ObfuscationMode, ParamStore, StoreOptions};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "paramstore")]
#[command(about = "Layered parameter store tooling", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a plaintext file for storage
    Encode {
        /// Obfuscation mode (plain, xor, aes)
        #[arg(long, short = 'm', default_value = "xor")]
        mode: ObfuscationMode,

        /// AES passphrase
        #[arg(long, short = 'p', env = "PARAMSTORE_PASSPHRASE")]
        passphrase: Option<String>,

        /// XOR key byte
        #[arg(long, default_value_t = DEFAULT_XOR_KEY)]
        xor_key: u8,

        /// Plaintext input file
        input: PathBuf,

        /// Encoded output file
        output: PathBuf,
    },

    /// Decode a stored file and print the plaintext
    Decode {
        /// Obfuscation mode (plain, xor, aes); detected when omitted
        #[arg(long, short = 'm')]
        mode: Option<ObfuscationMode>,

        /// AES passphrase
        #[arg(long, short = 'p', env = "PARAMSTORE_PASSPHRASE")]
        passphrase: Option<String>,

        /// XOR key byte
        #[arg(long, default_value_t = DEFAULT_XOR_KEY)]
        xor_key: u8,

        /// Encoded input file
        input: PathBuf,
    },

    /// Wrap fetched sheet JSON in a provenance envelope and write it encoded
    Stage {
        /// Sheet name recorded in the envelope
        #[arg(long)]
        sheet_name: String,

        /// Obfuscation mode (plain, xor, aes)
        #[arg(long, short = 'm', default_value = "xor")]
        mode: ObfuscationMode,

        /// AES passphrase
        #[arg(long, short = 'p', env = "PARAMSTORE_PASSPHRASE")]
        passphrase: Option<String>,

        /// Raw fetched data
        input: PathBuf,

        /// Defaults file to write
        output: PathBuf,
    },

    /// Print a parameter from the merged view as JSON
    Get {
        /// Path to store config file
        #[arg(long, short = 'c', default_value = "paramstore.toml")]
        config: PathBuf,

        /// Dot-path of the parameter; prints the whole view when omitted
        path: Option<String>,
    },

    /// Set a parameter in the user layer and save it
    Set {
        /// Path to store config file
        #[arg(long, short = 'c', default_value = "paramstore.toml")]
        config: PathBuf,

        /// Dot-path of the parameter
        path: String,

        /// JSON value (bare words are stored as strings)
        value: String,
    },

    /// Show how each layer was loaded
    Status {
        /// Path to store config file
        #[arg(long, short = 'c', default_value = "paramstore.toml")]
        config: PathBuf,
    },

    /// HMAC integrity tags
    Hmac {
        #[command(subcommand)]
        action: HmacCommands,
    },
}

#[derive(Subcommand)]
enum HmacCommands {
    /// Print the tag for a file
    Sign {
        /// HMAC key
        #[arg(long, short = 'k', env = "PARAMSTORE_HMAC_KEY")]
        key: String,

        input: PathBuf,
    },

    /// Check a file against a tag
    Verify {
        /// HMAC key
        #[arg(long, short = 'k', env = "PARAMSTORE_HMAC_KEY")]
        key: String,

        input: PathBuf,

        /// Base64 tag to check
        tag: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "paramstore=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Encode {
            mode,
            passphrase,
            xor_key,
            input,
            output,
        } => run_encode(build_codec(mode, passphrase, xor_key), &input, &output),
        Commands::Decode {
            mode,
            passphrase,
            xor_key,
            input,
        } => run_decode(mode, passphrase, xor_key, &input),
        Commands::Stage {
            sheet_name,
            mode,
            passphrase,
            input,
            output,
        } => run_stage(
            &sheet_name,
            build_codec(mode, passphrase, DEFAULT_XOR_KEY),
            &input,
            &output,
        ),
        Commands::Get { config, path } => run_get(&config, path.as_deref()).await,
        Commands::Set {
            config,
            path,
            value,
        } => run_set(&config, &path, &value).await,
        Commands::Status { config } => run_status(&config).await,
        Commands::Hmac { action } => match action {
            HmacCommands::Sign { key, input } => run_hmac_sign(&key, &input),
            HmacCommands::Verify { key, input, tag } => run_hmac_verify(&key, &input, &tag),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn build_codec(mode: ObfuscationMode, passphrase: Option<String>, xor_key: u8) -> Codec {
    Codec {
        mode,
        passphrase,
        xor_key,
    }
}

fn read_input(path: &Path) -> Result<String, String> {
    read_text(path)
        .map(|(text, _)| text)
        .map_err(|e| format!("{}: {}", path.display(), e))
}

fn run_encode(codec: Codec, input: &Path, output: &Path) -> Result<(), String> {
    let text = read_input(input)?;
    let encoded = codec.encode(&text).map_err(|e| e.to_string())?;
    write_atomic(output, &encoded).map_err(|e| format!("{}: {}", output.display(), e))?;
    eprintln!("Wrote: {} ({})", output.display(), codec.mode);
    Ok(())
}

fn run_decode(
    mode: Option<ObfuscationMode>,
    passphrase: Option<String>,
    xor_key: u8,
    input: &Path,
) -> Result<(), String> {
    let text = read_input(input)?;
    let decoded = match mode {
        Some(mode) => build_codec(mode, passphrase, xor_key)
            .decode(&text)
            .map_err(|e| e.to_string())?,
        None => {
            let (decoded, detected) =
                decode_auto(&text, passphrase.as_deref()).map_err(|e| e.to_string())?;
            eprintln!("Detected mode: {}", detected);
            decoded
        }
    };
    println!("{}", decoded);
    Ok(())
}

fn run_stage(sheet_name: &str, codec: Codec, input: &Path, output: &Path) -> Result<(), String> {
    let raw = read_input(input)?;
    let payload = match serde_json::from_str::<Value>(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Input is not valid JSON, storing as string ({})", e);
            Value::String(raw)
        }
    };

    let envelope = wrap_fetched(sheet_name, payload);
    let pretty = serde_json::to_string_pretty(&envelope).map_err(|e| e.to_string())?;
    let encoded = codec.encode(&pretty).map_err(|e| e.to_string())?;
    write_atomic(output, &encoded).map_err(|e| format!("{}: {}", output.display(), e))?;
    eprintln!("Saved: {} ({} bytes)", output.display(), encoded.len());
    Ok(())
}

async fn open_store(config: &Path) -> Result<ParamStore, String> {
    let options = StoreOptions::from_toml_file(config).map_err(|e| e.to_string())?;
    let store = ParamStore::new(options);
    store.initialize().await.map_err(|e| e.to_string())?;
    Ok(store)
}

async fn run_get(config: &Path, path: Option<&str>) -> Result<(), String> {
    let store = open_store(config).await?;
    let value = match path {
        Some(path) => store
            .get_value(path)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("no parameter at {}", path))?,
        None => store.merged().map_err(|e| e.to_string())?,
    };
    let json = serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

async fn run_set(config: &Path, path: &str, raw_value: &str) -> Result<(), String> {
    let store = open_store(config).await?;
    let value = serde_json::from_str::<Value>(raw_value)
        .unwrap_or_else(|_| Value::String(raw_value.to_string()));
    store.set(path, value).map_err(|e| e.to_string())?;
    store.save().map_err(|e| e.to_string())?;
    eprintln!("Saved: {}", store.options().user.path.display());
    Ok(())
}

async fn run_status(config: &Path) -> Result<(), String> {
    let store = open_store(config).await?;
    let reports = store.layer_reports().map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&reports).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn run_hmac_sign(key: &str, input: &Path) -> Result<(), String> {
    let text = read_input(input)?;
    println!("{}", compute_hmac(&text, key.as_bytes()));
    Ok(())
}

fn run_hmac_verify(key: &str, input: &Path, tag: &str) -> Result<(), String> {
    let text = read_input(input)?;
    if verify_hmac(&text, tag, key.as_bytes()) {
        println!("OK");
        Ok(())
    } else {
        Err(format!("tag does not match {}", input.display()))
    }
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use casper_kms_signer_client::SignerClient;

#[derive(Parser)]
struct Args {
    #[clap(long, env = "SIGNER_URL", default_value = "http://127.0.0.1:4000")]
    url: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the signer greeting.
    Hello,
    /// Create a key and print its public key.
    GenerateKeypair,
    /// Sign a 32-byte deploy hash.
    SignDeployHash {
        #[clap(long)]
        deploy_hash: String,
        #[clap(long)]
        public_key: String,
    },
    /// Sign a deploy read from a JSON file and print the signed deploy.
    SignDeploy {
        #[clap(long)]
        deploy: PathBuf,
        #[clap(long)]
        public_key: String,
    },
    /// Add an existing signature to a deploy read from a JSON file.
    AddSignature {
        #[clap(long)]
        deploy: PathBuf,
        #[clap(long)]
        public_key: String,
        #[clap(long)]
        signature: String,
    },
}

fn read_deploy(path: &PathBuf) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = SignerClient::new(args.url);

    match args.command {
        Command::Hello => println!("{}", client.hello().await?),
        Command::GenerateKeypair => println!("{}", client.generate_keypair().await?),
        Command::SignDeployHash {
            deploy_hash,
            public_key,
        } => println!(
            "{}",
            client.sign_deploy_hash(&deploy_hash, &public_key).await?
        ),
        Command::SignDeploy { deploy, public_key } => {
            let signed = client
                .sign_deploy(&read_deploy(&deploy)?, &public_key)
                .await?;
            println!("{}", serde_json::to_string_pretty(&signed)?);
        }
        Command::AddSignature {
            deploy,
            public_key,
            signature,
        } => {
            let signed = client
                .add_signature(&read_deploy(&deploy)?, &public_key, &signature)
                .await?;
            println!("{}", serde_json::to_string_pretty(&signed)?);
        }
    }

    Ok(())
}

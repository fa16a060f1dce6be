use clap::{Parser, Subcommand};
use qz_signer_client::{DEFAULT_BASE_URL, SigningOracleClient};

#[derive(Parser)]
struct Args {
    /// Base URL of the oracle routes
    #[clap(long, env = "QZ_SIGNER_URL", default_value = DEFAULT_BASE_URL)]
    url: String,
    /// Origin header to present, as the browser page would
    #[clap(long, env = "QZ_SIGNER_ORIGIN")]
    origin: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the certificate the agent would be given
    Certificate,
    /// Sign a payload and print the base64 signature
    Sign { data: String },
    /// Run a certificate + signature round and verify it locally
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut client = SigningOracleClient::new(args.url);
    if let Some(origin) = args.origin {
        client = client.with_origin(origin);
    }

    match args.command {
        Command::Certificate => print!("{}", client.fetch_certificate().await?),
        Command::Sign { data } => println!("{}", client.sign(&data).await?),
        Command::Check => {
            let handshake = client.handshake().await?;
            println!("challenge: {}", handshake.challenge);
            println!("signature: {}", handshake.signature);
            println!("signature verifies against the served certificate");
        }
    }
    Ok(())
}

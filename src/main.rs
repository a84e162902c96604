//! Envelope Gateway - embedded signing over the DocuSign eSignature API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use envelope_gateway::{
    auth::{CredentialCache, JwtGrantIssuer, PrivateKey},
    config::Args,
    envelope::DocumentAsset,
    esign::RestEnvelopesApi,
    logging,
    server::{self, AppState},
    services::{EnvelopeWorkflow, WorkflowConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init(&args.log_level, args.log_json);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Envelope Gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("OAuth host: {}", args.oauth_base_path);
    info!("API base path: {}", args.base_path);
    info!("Account: {}", args.account_id);
    info!("Document: {}", args.document_path.display());
    info!(
        "Token lifetime: {}s (refresh {}s early)",
        args.token_lifetime_seconds, args.token_safety_margin_seconds
    );
    info!("Session TTL: {}s", args.session_ttl_seconds);
    info!("======================================");

    // Static assets are fatal when missing
    let key = match PrivateKey::load(&args.private_key_path) {
        Ok(key) => key,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    let document = match DocumentAsset::load(&args.document_path) {
        Ok(document) => document,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let template = args.envelope_template();
    document.audit_anchor(&template);

    let issuer = JwtGrantIssuer::new(args.service_identity(), key, args.request_timeout())?;
    let credentials = CredentialCache::new(Arc::new(issuer), args.credential_policy());
    let api = Arc::new(RestEnvelopesApi::new(&args.api_config())?);

    let workflow = EnvelopeWorkflow::new(
        credentials,
        api,
        template,
        document,
        WorkflowConfig {
            account_id: args.account_id.clone(),
            return_url: args.return_url.clone(),
        },
    );

    let state = Arc::new(AppState::new(args, workflow));
    server::run(state).await?;

    Ok(())
}

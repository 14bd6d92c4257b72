use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokenward::{
    sources, store, AccessToken, CredentialStore, RefreshCoordinator, RefreshToken,
    SessionTerminator,
};
use tokio::time;

#[derive(Debug, Parser)]
struct Opts {
    /// The issuing authority's renewal URL
    #[arg(short = 'u', long, env)]
    renew_url: reqwest::Url,

    /// The access token issued at sign-in
    #[arg(short, long, env, hide_env_values = true)]
    access_token: AccessToken,

    /// The refresh token issued at sign-in
    #[arg(short, long, env, hide_env_values = true)]
    refresh_token: RefreshToken,

    /// The local file used to persist the credential pair
    #[arg(
        short = 'f',
        long,
        env,
        value_name = "FILE",
        default_value = ".session-tokens.json"
    )]
    credentials_file: std::path::PathBuf,

    /// The route to report when the session is torn down
    #[arg(long, env, default_value = "/login")]
    sign_in_path: String,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .pretty()
        .with_env_filter(tracing_subscriber::filter::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();

    let client = reqwest::Client::builder().https_only(true).build()?;

    let store = Arc::new(CredentialStore::new(store::FileStorage::new(
        opts.credentials_file,
    )));

    let source = sources::HttpRenewalSource::new(client, opts.renew_url);

    let terminator = SessionTerminator::new(Arc::clone(&store), |path: &str| {
        tracing::warn!(path, "session ended, a host shell would navigate here");
    })
    .with_sign_in_path(opts.sign_in_path);

    let coordinator = RefreshCoordinator::new(store, source, terminator);
    coordinator
        .initialize(opts.access_token, opts.refresh_token)
        .await;

    let mut interval = time::interval(Duration::from_secs(5));
    loop {
        interval.tick().await;

        match coordinator.ensure_valid_access().await {
            Ok(token) => {
                tracing::debug!(token = format_args!("{:#?}", token), "pulled access token")
            }
            Err(error) => {
                tracing::error!(
                    error = (&error as &dyn std::error::Error),
                    "session is no longer renewable"
                );
                return Err(error.into());
            }
        }
    }
}

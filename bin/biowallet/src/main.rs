//! biowallet deploys the biometric wallet contract suite in a single ordered run.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};

use biowallet_deploy::{CONFIG_FILENAME, DeployConfig, DeployError, Deployer, DeploymentPlan, plan_table};
use cli::Cli;

/// Build the effective configuration: defaults, then the TOML file, then the command line.
fn load_config(cli: &Cli) -> Result<DeployConfig> {
    let mut figment = Figment::from(Serialized::defaults(DeployConfig::default()));

    match &cli.config {
        Some(path) => {
            let config_path = if path.is_dir() {
                path.join(CONFIG_FILENAME)
            } else {
                path.clone()
            };
            if !config_path.exists() {
                anyhow::bail!("Configuration file not found: {}", config_path.display());
            }
            tracing::info!(config_path = %config_path.display(), "Loading configuration file...");
            figment = figment.merge(Toml::file(config_path));
        }
        // A missing default file is not an error.
        None => figment = figment.merge(Toml::file(CONFIG_FILENAME)),
    }

    let mut config: DeployConfig = figment
        .extract()
        .context("Failed to load the deployment configuration")?;
    cli.apply(&mut config);

    Ok(config)
}

/// Process exit code for a failed run: the run error's own code, 1 otherwise.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<DeployError>()
        .map(DeployError::exit_code)
        .unwrap_or(1)
}

async fn run(cli: Cli) -> Result<()> {
    let plan = DeploymentPlan::biometric_wallet().map_err(DeployError::from)?;

    if cli.plan {
        println!("{}", plan_table(&plan));
        return Ok(());
    }

    let config = load_config(&cli)?;

    if let Some(path) = &cli.save_config {
        config.save_to_file(path)?;
    }

    tracing::info!(
        rpc_url = %config.rpc_url,
        artifacts = %config.artifacts.display(),
        outdata = %config.outdata.display(),
        "Starting deployment..."
    );

    let outcome = Deployer::new(config).deploy(plan).await?;

    println!("{}", outcome.result.to_json_pretty()?);

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biowallet_deploy::{ConfigError, IdentitySource};
    use tempdir::TempDir;

    #[test]
    fn test_file_then_arguments() {
        let temp_dir = TempDir::new("biowallet-cli").expect("Failed to create temp dir");
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
            rpc_url = "http://node:8545/"
            chain_id = 31337
            poll_interval_ms = 500

            [identity]
            source = "node_account"
            index = 1
            "#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "biowallet",
            "--config",
            temp_dir.path().to_str().unwrap(),
            "--chain-id",
            "1337",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.rpc_url.as_str(), "http://node:8545/");
        assert_eq!(config.chain_id, Some(1337));
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.identity, IdentitySource::NodeAccount { index: 1 });
        assert_eq!(config.confirmation_timeout_secs, DeployConfig::default().confirmation_timeout_secs);
    }

    #[test]
    fn test_plan_errors_exit_as_configuration_errors() {
        let err = anyhow::Error::from(DeployError::from(ConfigError::EmptyPlan));
        assert_eq!(exit_code(&err), 2);

        let err = anyhow::anyhow!("Configuration file not found: Biowallet.toml");
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let temp_dir = TempDir::new("biowallet-cli").expect("Failed to create temp dir");
        let missing = temp_dir.path().join("missing.toml");

        let cli = Cli::try_parse_from(["biowallet", "--config", missing.to_str().unwrap()]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use yadlfs::backend::YandexDisk;
use yadlfs::logging::*;
use yadlfs::{AgentError, Config, SessionOptions, Termination};

const COMMIT_HASH: &str = match option_env!("YADLFS_COMMIT_HASH") {
	Some(hash) => hash,
	None => "n/a",
};

const BUILD_TIMESTAMP: &str = match option_env!("YADLFS_BUILD_TIMESTAMP") {
	Some(timestamp) => timestamp,
	None => "n/a",
};

/// 128 + SIGINT(2)
const EXIT_CANCELLED: u8 = 130;

fn cli() -> Command {
	Command::new("yadlfs")
		.about("git-lfs custom transfer agent which simply works with yandex.disk")
		.override_usage("yadlfs")
		.disable_version_flag(true)
		.arg(
			Arg::new("print-version")
				.short('v')
				.long("print-version")
				.action(ArgAction::SetTrue)
				.help("Print version, commit hash and build time"),
		)
		.arg(
			Arg::new("staging-dir")
				.long("staging-dir")
				.value_name("DIR")
				.value_parser(clap::value_parser!(PathBuf))
				.help("Directory for downloaded objects (overrides config)"),
		)
}

async fn run(config: Config) -> Result<Termination, AgentError> {
	let backend = YandexDisk::new(
		config.yandex_disk_oauth_token.as_str(),
		config.yandex_disk_project_folder.as_str(),
		config.api_base_url.as_str(),
	)?;

	let cancel = CancellationToken::new();
	yadlfs::utils::spawn_signal_handlers(cancel.clone());

	let options = SessionOptions {
		staging_dir: config.staging_dir.clone(),
		outbound_capacity: config.outbound_queue_capacity,
	};
	let input = tokio::io::BufReader::new(tokio::io::stdin());
	yadlfs::run_session(input, tokio::io::stdout(), Arc::new(backend), options, cancel).await
}

#[tokio::main]
async fn main() -> ExitCode {
	let matches = cli().get_matches();

	if matches.get_flag("print-version") {
		println!(
			"Version={}\nCommit-Hash={}\nBuild-Time={}",
			env!("CARGO_PKG_VERSION"),
			COMMIT_HASH,
			BUILD_TIMESTAMP
		);
		return ExitCode::SUCCESS;
	}

	let mut config = match Config::load() {
		Ok(config) => config,
		Err(e) => {
			init_tracing(DEFAULT_LOG_LEVEL);
			error!("{}", AgentError::from(e));
			return ExitCode::FAILURE;
		}
	};
	if let Some(dir) = matches.get_one::<PathBuf>("staging-dir") {
		config.staging_dir = dir.clone();
	}
	init_tracing(&config.log_level);
	debug!("loaded {:?}", config);

	match run(config).await {
		Ok(Termination::Cancelled) => {
			info!("session cancelled");
			ExitCode::from(EXIT_CANCELLED)
		}
		Ok(termination) => {
			debug!("session ended: {:?}", termination);
			ExitCode::SUCCESS
		}
		Err(e) => {
			error!("{}", e);
			ExitCode::FAILURE
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cli_is_well_formed() {
		cli().debug_assert();
	}

	#[test]
	fn test_short_version_flag() {
		let matches = cli().try_get_matches_from(["yadlfs", "-v"]).unwrap();
		assert!(matches.get_flag("print-version"));
	}

	#[test]
	fn test_staging_dir_override() {
		let matches = cli().try_get_matches_from(["yadlfs", "--staging-dir", "/tmp/lfs"]).unwrap();
		assert_eq!(matches.get_one::<PathBuf>("staging-dir"), Some(&PathBuf::from("/tmp/lfs")));
	}
}

// vim: ts=4

use kuasimi::cli::Args;
use kuasimi::{Config, DesktopNotifier, GeminiModel, Invocation, LaunchError, launch};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args: Args = argh::from_env();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let invocation = Invocation {
        image: args.file,
        prompt: args.prompt,
        model: args.model,
        thumbnail_dir: std::env::temp_dir(),
    };

    match launch(invocation, GeminiModel::new(&config), DesktopNotifier) {
        Ok(session) => {
            log::debug!("Streaming into notification with icon {}", session.thumbnail().display());
            // dropping the handle waits for the stream to end
            ExitCode::SUCCESS
        }
        Err(e @ LaunchError::ImageNotFound(_)) => {
            println!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

use std::io;

use clap::Parser;
use log::{debug, error};

use aix::cli::{self, Args};
use aix::config::ProviderConfig;
use aix::Runner;

#[tokio::main]
async fn main()
{   let mut args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or(default_level)
    ).init();

    if let Err(e) = run(&mut args).await
    {   error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: &mut Args) -> anyhow::Result<()>
{   args.read_prompt_from_stdin()?;
    let options = args.clone().into_options(
      ProviderConfig::openai_from_env(),
      ProviderConfig::gemini_from_env()
    );
    debug!("Running with source: {}", options.llm_source);

    let mut reply = Runner::new(options).run().await?;
    let stdout = io::stdout();
    cli::render(&mut reply, args, &mut stdout.lock()).await
}

use clap::Parser;
use ringsim_node::cli::Cli;
use ringsim_node::logging::init_logging;
use ringsim_node::processor::spawn_stdin_reader;
use ringsim_node::processor::Processor;
use ringsim_node::script::Script;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    let config = cli.load_config()?;

    let script = match &config.script {
        Some(path) => Script::read_fs(path, config.nodes)?,
        None => Script::default(),
    };
    let mut processor = Processor::new(&config, script)?;

    let input = if config.interactive {
        let (tx, rx) = mpsc::channel(1);
        spawn_stdin_reader(config.nodes, tx);
        Some(rx)
    } else {
        None
    };

    let mut stdout = std::io::stdout();
    processor.run(input, &mut stdout, config.interactive).await?;
    Ok(())
}

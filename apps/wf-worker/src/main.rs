use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = wf_worker::Args::parse();

	wf_worker::run(args).await
}

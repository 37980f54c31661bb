use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = wf_api::Args::parse();

	wf_api::run(args).await
}

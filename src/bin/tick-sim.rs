use anyhow::Result;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    tick_sentinel::sim_cli::run_cli(&args)
}

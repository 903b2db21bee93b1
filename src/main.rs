use std::env;

use anyhow::Context;

use lae::engine;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!(
            "Usage: {} <num_threads> <input_path> <output_path>",
            args.first().map_or("lae", String::as_str)
        );
        return Ok(());
    }

    let (threads, input, output) = (&args[1], &args[2], &args[3]);

    engine::evaluate_to_file(threads, input, output)
        .with_context(|| format!("failed to write the output to {output}"))?;

    Ok(())
}

use std::io::Write;

use clap::Parser;
use status_bar::{
    util::{CopyError, Source},
    BarStyle, Formatter, ProgressWriter, StatusBar, StatusBarOptions, TransferStats,
};

/// Copy a file or URL to stdout while drawing a status line on stderr.
#[derive(Parser, Debug)]
#[command(name = "status-bar", version)]
struct Args {
    /// File path, http(s) URL, or `-` for stdin
    input: String,

    /// Total size in bytes, required when the source does not advertise it
    #[arg(long)]
    size: Option<u64>,

    /// Milliseconds between redraws, 0 to only draw at start and end
    #[arg(long, default_value_t = 200)]
    frequency: u64,

    #[arg(long, default_value_t = 20)]
    bar_length: usize,

    /// Seconds without data before speed and ETA are reset
    #[arg(long, default_value_t = 3)]
    stall_ticks: u32,

    #[arg(long, default_value_t = 0.005)]
    smoothing: f64,

    /// Print one JSON snapshot per line instead of the status line
    #[arg(long)]
    json: bool,
}

fn print_line(stats: &TransferStats, format: &Formatter) {
    eprint!(
        "\x1b[2K\r{} {} {} {} [{}] {}",
        format.storage(stats.current_size),
        format.speed(stats.speed),
        format.time(Some(stats.elapsed_time)),
        format.time(stats.remaining_time),
        format.progress_bar(stats.percentage),
        format.percentage(stats.percentage)
    );
    let _ = std::io::stderr().lock().flush();
}

fn print_json(stats: &TransferStats) {
    match serde_json::to_string(stats) {
        Ok(line) => eprintln!("{}", line),
        Err(e) => log::warn!("could not serialize stats: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), CopyError> {
    env_logger::init();
    let args = Args::parse();

    let source = Source::open(&args.input).await?;
    let options = StatusBarOptions {
        total: args.size.or(source.len()),
        frequency_ms: args.frequency,
        stall_ticks: args.stall_ticks,
        smoothing: args.smoothing,
        progress_bar: BarStyle {
            length: args.bar_length,
            ..Default::default()
        },
    };
    log::debug!("copying {} with {:?}", args.input, options);

    let json = args.json;
    let bar = StatusBar::builder(options)
        .render(move |stats, format| {
            if json {
                print_json(stats);
            } else {
                print_line(stats, format);
            }
        })
        .build()?;

    let mut writer = ProgressWriter::new(tokio::io::stdout(), bar);
    let result = source.copy_to(&mut writer).await;
    if !json {
        eprintln!();
    }

    let copied = result?;
    log::info!("copied {} bytes from {}", copied, args.input);

    Ok(())
}

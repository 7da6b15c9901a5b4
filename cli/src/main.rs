mod interactive;

use std::{fs::File, path::PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use core_mmu::{script::Script, Translator};

#[cfg(feature = "stat")]
use terminal_size::terminal_size;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// run a JSON script of page table updates and translations
    Run(RunArgs),
    /// translate addresses typed at a prompt
    Interactive(InteractiveArgs),
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    /// File path to input script
    #[arg(short, long)]
    input: PathBuf,
}

#[derive(Args, Debug)]
struct InteractiveArgs {
    #[command(flatten)]
    delegate: CommonArgs,
    /// Page size in bytes (4096 or 8192)
    #[arg(long, default_value_t = 4096)]
    page_size: u32,
    /// Number of TLB rows (4, 8 or 16)
    #[arg(long, default_value_t = 16)]
    tlb_rows: u32,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    match args.command {
        Command::Run(RunArgs {
            delegate: CommonArgs { verbose },
            input,
        }) => {
            init_logger(verbose);
            let script = read_script(input)?;
            log::info!("finished parsing script. # of ops: {}", script.ops.len());
            let mut translator = script.translator();
            for outcome in script.execute(&mut translator) {
                println!("{outcome}");
            }
            log::info!("finished execution.");
            println!("hits: {}", translator.number_of_hits());
            output_stat(&translator);
            Ok(())
        }
        Command::Interactive(InteractiveArgs {
            delegate: CommonArgs { verbose },
            page_size,
            tlb_rows,
        }) => {
            init_logger(verbose);
            let mut translator = Translator::new(page_size, tlb_rows)?;
            interactive::execute_interactive(&mut translator)?;
            output_stat(&translator);
            Ok(())
        }
    }
}

fn init_logger(verbose: bool) {
    if verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::init();
    }
}

fn read_script(input: PathBuf) -> Result<Script> {
    let file = File::open(input)?;
    Script::deser(file)
}

#[cfg(not(feature = "stat"))]
fn output_stat(_: &Translator) {}

#[cfg(feature = "stat")]
fn output_stat(translator: &Translator) {
    log::info!(
        "statistics:\n{}",
        translator.collect_stat().view(stat_width())
    );
}

#[cfg(feature = "stat")]
pub(crate) fn stat_width() -> usize {
    terminal_size()
        .map(|(w, _)| w.0.saturating_sub(20))
        .unwrap_or(60) as usize
}

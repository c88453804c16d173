use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use ir_reduce::{
    InterestingnessTest, Module, TestRunner, default_passes, pass_by_name, run_reduction,
    verify_module,
};

mod parse;

#[derive(Parser)]
#[command(name = "ir-reduce")]
#[command(about = "Delta-debugging reducer for textual IR modules")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shrink a module while a test script keeps accepting it.
    Reduce {
        #[arg(help = "Input IR file")]
        input: PathBuf,

        #[arg(
            short,
            long,
            help = "Interestingness test: invoked with a candidate file, exit code 0 keeps it"
        )]
        test: PathBuf,

        #[arg(short, long, help = "Output IR file")]
        output: PathBuf,

        #[arg(
            long,
            value_delimiter = ',',
            help = "Comma-separated pass names to run instead of the default pipeline"
        )]
        delta_passes: Option<Vec<String>>,

        #[arg(long, help = "Write reduction statistics to this file as JSON")]
        stats: Option<PathBuf>,
    },
    /// Parse a module and report the first structural error, if any.
    Verify {
        #[arg(help = "Input IR file")]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reduce {
            input,
            test,
            output,
            delta_passes,
            stats,
        } => reduce(&input, &test, &output, delta_passes.as_deref(), stats.as_deref()),
        Commands::Verify { input } => verify(&input),
    }
}

/// Runs the user's script against candidate files. The candidate is written
/// to a scratch path next to the output so the script sees an ordinary file.
struct ScriptTest {
    script: PathBuf,
    scratch: PathBuf,
}

impl InterestingnessTest for ScriptTest {
    fn is_interesting(&mut self, module: &Module) -> ir_reduce::Result<bool> {
        fs::write(&self.scratch, module.to_string()).map_err(|e| {
            ir_reduce::Error::Test(format!("failed to write {}: {e}", self.scratch.display()))
        })?;
        let status = Command::new(&self.script)
            .arg(&self.scratch)
            .status()
            .map_err(|e| {
                ir_reduce::Error::Test(format!("failed to run {}: {e}", self.script.display()))
            })?;
        tracing::trace!(interesting = status.success(), "test script finished");
        Ok(status.success())
    }
}

fn reduce(
    input: &Path,
    script: &Path,
    output: &Path,
    pass_names: Option<&[String]>,
    stats_path: Option<&Path>,
) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let module = parse::parse_module(&text)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    let insts_before = module.inst_count();

    let passes = match pass_names {
        Some(names) => names
            .iter()
            .map(|name| {
                pass_by_name(name).ok_or_else(|| anyhow::anyhow!("unknown pass '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?,
        None => default_passes(),
    };

    let scratch = output.with_extension("candidate.ir");
    let test = ScriptTest {
        script: script.to_path_buf(),
        scratch: scratch.clone(),
    };
    let mut runner =
        TestRunner::new(module, test).context("input module failed verification")?;
    runner
        .ensure_interesting()
        .context("the unreduced input must already pass the test")?;
    run_reduction(&mut runner, &passes)?;

    let stats = runner.stats();
    let reduced = runner.into_program();
    fs::write(output, reduced.to_string())
        .with_context(|| format!("Failed to write output to {}", output.display()))?;
    let _ = fs::remove_file(&scratch);

    println!(
        "Reduced {} -> {} ({insts_before} -> {} instructions, {} tests)",
        input.display(),
        output.display(),
        reduced.inst_count(),
        stats.tests_run
    );

    if let Some(path) = stats_path {
        let report = serde_json::json!({
            "tests_run": stats.tests_run,
            "commits": stats.commits,
            "rejected_malformed": stats.rejected_malformed,
            "rejected_unsupported": stats.rejected_unsupported,
            "instructions_before": insts_before,
            "instructions_after": reduced.inst_count(),
        });
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write stats to {}", path.display()))?;
    }

    Ok(())
}

fn verify(input: &Path) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let module = parse::parse_module(&text)
        .with_context(|| format!("Failed to parse {}", input.display()))?;
    verify_module(&module)?;
    println!(
        "{}: ok ({} functions, {} blocks, {} instructions)",
        input.display(),
        module.function_count(),
        module.block_count(),
        module.inst_count()
    );
    Ok(())
}

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use request_shield::audit::RawSqlFinder;

#[derive(Parser)]
#[command(name = "find-raw-sql")]
#[command(about = "List raw statement calls that bypass the query builder", long_about = None)]
struct Cli {
    /// Directory to scan.
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// File extensions to include (repeatable).
    #[arg(short, long = "ext", default_values = ["rs", "py"])]
    extensions: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let finder = match RawSqlFinder::new(cli.extensions) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let findings = match finder.scan_tree(&cli.root) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error: failed to scan {}: {}", cli.root.display(), e);
            return ExitCode::from(2);
        }
    };

    for finding in &findings {
        println!("{}", finding);
    }

    if findings.is_empty() {
        println!("No raw SQL found.");
        ExitCode::SUCCESS
    } else {
        println!("\nFound {} raw SQL calls; move them to the query builder or behind the statement guard.", findings.len());
        ExitCode::FAILURE
    }
}

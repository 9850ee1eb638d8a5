use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Lambda binaries shipped by the pipeline, one zip each.
const LAMBDA_BINARIES: [&str; 3] = ["filter_lambda", "rename_lambda", "forward_lambda"];

const CHECKED_PACKAGES: [&str; 2] = ["xml_intake_core", "xml_intake_lambda"];

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the XML intake pipeline workspace",
    long_about = "Runs CI checks and packages the filter, rename and forward\n\
                  Lambda functions as deployable zip archives."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the Lambda binaries and zip each one as `bootstrap`
    Package {
        /// Compilation target triple for Lambda binaries
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for binaries
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
        /// Directory receiving `<binary>.zip` archives
        #[arg(long, env = "XML_INTAKE_DIST_DIR", default_value = "dist")]
        dist_dir: PathBuf,
        /// Package a single binary instead of all of them
        #[arg(long)]
        only: Option<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Build every Lambda binary for the host
    Lambdas,
    /// Run check + lambdas
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    exit(1);
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .unwrap_or_else(|error| fail(format!("failed to execute cargo: {error}")))
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn selected_binaries(only: Option<&str>) -> Vec<&'static str> {
    match only {
        None => LAMBDA_BINARIES.to_vec(),
        Some(name) => match LAMBDA_BINARIES.iter().find(|bin| **bin == name) {
            Some(bin) => vec![*bin],
            None => fail(format!(
                "unknown lambda binary `{name}`; expected one of {}",
                LAMBDA_BINARIES.join(", ")
            )),
        },
    }
}

fn package_lambdas(target: &str, profile: BuildProfile, dist_dir: &Path, only: Option<&str>) {
    ensure_rust_target_installed(target);
    let binaries = selected_binaries(only);

    step("Build lambda binaries");
    let mut cargo_args = vec!["build", "-p", "xml_intake_lambda", "--target", target];
    for bin in &binaries {
        cargo_args.push("--bin");
        cargo_args.push(bin);
    }
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package lambda zip artifacts");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    fs::create_dir_all(dist_dir).unwrap_or_else(|error| {
        fail(format!(
            "failed to create dist directory '{}': {error}",
            dist_dir.display()
        ))
    });

    let mut packaged = Vec::with_capacity(binaries.len());
    for bin in binaries {
        let zip_path = dist_dir.join(format!("{bin}.zip"));
        package_lambda_zip(&target_dir.join(bin), &zip_path);
        packaged.push(zip_path);
    }

    eprintln!("\nPackaged artifacts:");
    for path in packaged {
        eprintln!("- {}", path.display());
    }
}

fn ensure_rust_target_installed(target: &str) {
    let output = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        fail(format!(
            "failed to list installed rust targets: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        fail(format!(
            "rust target `{target}` is not installed; run `rustup target add {target}` and re-run `cargo run -p xtask -- package`"
        ));
    }
}

/// Lambda's custom runtime expects a single executable named `bootstrap`.
fn package_lambda_zip(binary_path: &Path, zip_path: &Path) {
    let binary = fs::read(binary_path).unwrap_or_else(|error| {
        fail(format!(
            "expected lambda binary at '{}': {error}",
            binary_path.display()
        ))
    });
    let file = fs::File::create(zip_path).unwrap_or_else(|error| {
        fail(format!("failed to create '{}': {error}", zip_path.display()))
    });

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    let written = zip
        .start_file("bootstrap", options)
        .map_err(|error| error.to_string())
        .and_then(|()| zip.write_all(&binary).map_err(|error| error.to_string()))
        .and_then(|()| zip.finish().map(|_| ()).map_err(|error| error.to_string()));
    if let Err(error) = written {
        fail(format!("failed to write '{}': {error}", zip_path.display()));
    }
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    for package in CHECKED_PACKAGES {
        step(&format!("Test {package}"));
        run_cargo(&["test", "-p", package]);
    }
}

fn ci_lambdas() {
    step("Build lambda binaries");
    let mut args = vec!["build", "-p", "xml_intake_lambda"];
    for bin in LAMBDA_BINARIES {
        args.push("--bin");
        args.push(bin);
    }
    run_cargo(&args);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Lambdas => ci_lambdas(),
                CiJob::All => {
                    ci_check();
                    ci_lambdas();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::Package {
            target,
            profile,
            dist_dir,
            only,
        } => {
            package_lambdas(&target, profile, &dist_dir, only.as_deref());
        }
    }
}

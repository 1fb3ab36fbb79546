//! ringspect CLI — run the inspection pipeline on captured frames.

mod recipe;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use image::RgbImage;
use ringspect::{Station, Verdict};

use recipe::RecipeFile;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ringspect")]
#[command(about = "Measure ring-shaped parts and classify burr/flash defects from station frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one station frame against a recipe.
    Inspect(CliInspectArgs),

    /// Evaluate all four station frames in parallel against one recipe.
    Line(CliLineArgs),

    /// Parse a recipe and print the typed tolerance snapshot.
    RecipeInfo {
        /// Path to the recipe JSON.
        #[arg(long)]
        recipe: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct CliInspectArgs {
    /// Path to the input frame.
    #[arg(long)]
    image: PathBuf,

    /// Path to the recipe JSON (parameters + part profile).
    #[arg(long)]
    recipe: PathBuf,

    /// Station index (camera number).
    #[arg(long, default_value = "1")]
    station: u8,

    /// Directory for the annotated image and verdict JSON.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct CliLineArgs {
    /// Four frame paths, one per station, in station order.
    #[arg(long, num_args = 4)]
    frames: Vec<PathBuf>,

    /// Path to the recipe JSON shared by all stations.
    #[arg(long)]
    recipe: PathBuf,

    /// Directory for annotated images and verdict JSON files.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect(args) => run_inspect(&args),
        Commands::Line(args) => run_line(&args),
        Commands::RecipeInfo { recipe } => run_recipe_info(&recipe),
    }
}

fn load_frame(path: &Path) -> CliResult<RgbImage> {
    tracing::info!("Loading frame: {}", path.display());
    Ok(image::open(path)?.to_rgb8())
}

fn evaluate_one(
    station_index: u8,
    frame_path: &Path,
    recipe: &RecipeFile,
    out_dir: &Path,
) -> CliResult<Verdict> {
    let frame = load_frame(frame_path)?;
    let station = Station::new(recipe.station_config(station_index, out_dir));
    Ok(station.evaluate_raw(&frame, &recipe.parameters, &recipe.profile))
}

fn write_verdict(verdict: &Verdict, out_dir: &Path) -> CliResult<PathBuf> {
    let path = out_dir.join(format!("cam{}_verdict.json", verdict.station));
    std::fs::write(&path, serde_json::to_string_pretty(verdict)?)?;
    Ok(path)
}

fn run_inspect(args: &CliInspectArgs) -> CliResult<()> {
    let recipe = RecipeFile::load(&args.recipe)?;
    std::fs::create_dir_all(&args.out_dir)?;

    let verdict = evaluate_one(args.station, &args.image, &recipe, &args.out_dir)?;
    let json_path = write_verdict(&verdict, &args.out_dir)?;

    tracing::info!(
        station = verdict.station,
        overall = ?verdict.overall,
        verdict = %json_path.display(),
        "inspection complete"
    );
    println!("{}", if verdict.passed() { "PASS" } else { "FAIL" });
    Ok(())
}

fn run_line(args: &CliLineArgs) -> CliResult<()> {
    let recipe = RecipeFile::load(&args.recipe)?;
    std::fs::create_dir_all(&args.out_dir)?;

    // Stations are stateless and independent; run them on scoped threads
    // over the shared read-only recipe snapshot. Errors cross the thread
    // boundary as strings so the results stay Send.
    let verdicts: Vec<Result<Verdict, String>> = std::thread::scope(|scope| {
        let handles: Vec<_> = args
            .frames
            .iter()
            .enumerate()
            .map(|(i, frame_path)| {
                let recipe = &recipe;
                let out_dir = args.out_dir.as_path();
                scope.spawn(move || {
                    evaluate_one(i as u8 + 1, frame_path, recipe, out_dir)
                        .map_err(|e| e.to_string())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err("station thread panicked".to_string()))
            })
            .collect()
    });

    let mut all_passed = true;
    for verdict in verdicts {
        let verdict = verdict.map_err(CliError::from)?;
        write_verdict(&verdict, &args.out_dir)?;
        tracing::info!(station = verdict.station, overall = ?verdict.overall, "station done");
        all_passed &= verdict.passed();
    }
    println!("{}", if all_passed { "PASS" } else { "FAIL" });
    Ok(())
}

fn run_recipe_info(path: &Path) -> CliResult<()> {
    let recipe = RecipeFile::load(path)?;
    let params = ringspect::ToleranceParameters::from_map(&recipe.parameters)?;
    println!("{}", serde_json::to_string_pretty(&params)?);
    println!("{}", serde_json::to_string_pretty(&recipe.profile)?);
    Ok(())
}

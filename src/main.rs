use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn, LevelFilter};
use sigmap::assignment::CoordinateAssignment;
use sigmap::config::Config;
use sigmap::coordinate::Coordinate;
use sigmap::database::Database;
use sigmap::heatmap::{build_points, location_names, HeatMapBuilder};
use sigmap::report::ReportGenerator;
use sigmap::signal::{is_conventional_rssi, signal_quality};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sigmap")]
#[command(version = "0.1.0")]
#[command(about = "Wi-Fi signal survey and heat map generator")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "sigmap.json")]
    config: PathBuf,

    /// Database file (overrides config)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Record a signal reading at a location
    Record {
        /// Location name
        location: String,

        /// Signal strength in dBm
        #[arg(allow_hyphen_values = true)]
        rssi: i32,
    },

    /// Manually position a location on the canvas
    Place {
        location: String,

        /// Horizontal position, 0.0 (left) to 1.0 (right)
        x: f64,

        /// Vertical position, 0.0 (top) to 1.0 (bottom)
        y: f64,

        /// Optional floor/height component
        #[arg(long)]
        z: Option<f64>,
    },

    /// Remove a location's position
    Unplace { location: String },

    /// Auto-arrange all recorded locations on a grid
    Layout,

    /// Inspect or transfer the coordinate mapping
    Coords {
        #[command(subcommand)]
        action: CoordsCommands,
    },

    /// List recorded measurements
    List {
        /// Only show this location
        #[arg(long)]
        location: Option<String>,
    },

    /// Delete a location's measurements and position
    Forget { location: String },

    /// Generate a signal heat map
    Heatmap {
        /// Grid columns (overrides config)
        #[arg(long)]
        width: Option<usize>,

        /// Grid rows (overrides config)
        #[arg(long)]
        height: Option<usize>,

        /// IDW power (overrides config)
        #[arg(long)]
        power: Option<f64>,

        /// Force Gaussian smoothing on
        #[arg(long, conflicts_with = "no_smooth")]
        smooth: bool,

        /// Force Gaussian smoothing off
        #[arg(long)]
        no_smooth: bool,

        /// Smoothing kernel size (overrides config)
        #[arg(long)]
        kernel_size: Option<i32>,

        /// Emit the grid as JSON
        #[arg(long)]
        json: bool,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Estimate the signal at a point
    Probe {
        x: f64,
        y: f64,
    },
}

#[derive(Subcommand)]
enum CoordsCommands {
    /// Show all positioned locations
    List,

    /// Export the mapping as JSON
    Export {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the mapping with a previously exported one
    Import { source: PathBuf },

    /// Clear every position
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    // Handle init command before loading config
    if matches!(cli.command, Commands::Init) {
        return handle_init(&cli.config);
    }

    let mut config = if cli.config.exists() {
        Config::load(&cli.config).context("Failed to load config")?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };

    if let Some(database) = cli.database {
        config.storage.database = database.to_string_lossy().to_string();
    }

    match cli.command {
        Commands::Init => unreachable!(),
        Commands::Record { location, rssi } => handle_record(&config, &location, rssi),
        Commands::Place { location, x, y, z } => handle_place(&config, &location, x, y, z),
        Commands::Unplace { location } => {
            let assignment = open_assignment(&config)?;
            assignment.remove_coordinate(&location);
            info!("Removed position for {}", location);
            Ok(())
        }
        Commands::Layout => handle_layout(&config),
        Commands::Coords { action } => handle_coords(&config, action),
        Commands::List { location } => handle_list(&config, location),
        Commands::Forget { location } => handle_forget(&config, &location),
        Commands::Heatmap {
            width,
            height,
            power,
            smooth,
            no_smooth,
            kernel_size,
            json,
            output,
        } => {
            let heatmap = &mut config.heatmap;
            if let Some(width) = width {
                heatmap.width = width;
            }
            if let Some(height) = height {
                heatmap.height = height;
            }
            if let Some(power) = power {
                heatmap.power = power;
            }
            if let Some(kernel_size) = kernel_size {
                heatmap.kernel_size = kernel_size;
            }
            if smooth {
                heatmap.smoothing = true;
            } else if no_smooth {
                heatmap.smoothing = false;
            }
            handle_heatmap(config, json, output).await
        }
        Commands::Probe { x, y } => handle_probe(&config, x, y),
    }
}

/// The mapping lives in the measurement database's key-value table
fn open_assignment(config: &Config) -> Result<CoordinateAssignment> {
    let store = Database::open(&config.storage.database)
        .context("Failed to open coordinate store")?;
    Ok(CoordinateAssignment::new(Box::new(store)))
}

fn open_database(config: &Config) -> Result<Database> {
    Database::open(&config.storage.database).context("Failed to open database")
}

fn handle_init(path: &Path) -> Result<()> {
    info!("Initializing sigmap configuration...");

    if path.exists() {
        warn!("{:?} already exists, leaving it untouched", path);
        return Ok(());
    }

    Config::default().save(path)?;
    info!("Created {:?}", path);
    info!("Record readings with 'sigmap record <location> <rssi>'.");

    Ok(())
}

fn handle_record(config: &Config, location: &str, rssi: i32) -> Result<()> {
    if !is_conventional_rssi(rssi) {
        warn!("{} dBm is outside the usual -100..0 dBm range", rssi);
    }

    let db = open_database(config)?;
    let timestamp = chrono::Utc::now().timestamp();
    db.insert_measurement(location, rssi, timestamp)?;
    info!("Recorded {} dBm ({}) at {}", rssi, signal_quality(rssi), location);

    Ok(())
}

fn handle_place(config: &Config, location: &str, x: f64, y: f64, z: Option<f64>) -> Result<()> {
    let coordinate = match z {
        Some(z) => Coordinate::with_z(x, y, z),
        None => Coordinate::new(x, y),
    };
    if !coordinate.is_normalized() {
        warn!("{} lies outside the canvas", coordinate);
    }

    let assignment = open_assignment(config)?;
    assignment.set_coordinate(coordinate, location);
    info!("Placed {} at {}", location, coordinate);

    Ok(())
}

fn handle_layout(config: &Config) -> Result<()> {
    let db = open_database(config)?;
    let locations = db.get_locations()?;
    if locations.is_empty() {
        println!("No locations recorded yet.");
        return Ok(());
    }

    let assignment = open_assignment(config)?;
    assignment.apply_grid_layout(&locations);
    ReportGenerator::write_coordinates(&mut io::stdout(), &assignment.mapping())
}

fn handle_coords(config: &Config, action: CoordsCommands) -> Result<()> {
    let assignment = open_assignment(config)?;

    match action {
        CoordsCommands::List => {
            ReportGenerator::write_coordinates(&mut io::stdout(), &assignment.mapping())?;
        }
        CoordsCommands::Export { output } => {
            let bytes = assignment.export_mapping()?;
            match output {
                Some(path) => {
                    fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Exported {} coordinates to {:?}", assignment.len(), path);
                }
                None => {
                    let mut stdout = io::stdout();
                    stdout.write_all(&bytes)?;
                    writeln!(stdout)?;
                }
            }
        }
        CoordsCommands::Import { source } => {
            let bytes = fs::read(&source)
                .with_context(|| format!("Failed to read {:?}", source))?;
            assignment
                .import_mapping(&bytes)
                .with_context(|| format!("Failed to import {:?}", source))?;
        }
        CoordsCommands::Reset => {
            assignment.reset();
        }
    }

    Ok(())
}

fn handle_list(config: &Config, location: Option<String>) -> Result<()> {
    let db = open_database(config)?;
    let measurements = match location {
        Some(location) => db.get_measurements_for_location(&location)?,
        None => db.get_all_measurements()?,
    };

    ReportGenerator::write_measurements(&mut io::stdout(), &measurements)
}

fn handle_forget(config: &Config, location: &str) -> Result<()> {
    let db = open_database(config)?;
    let removed = db.delete_location(location)?;

    let assignment = open_assignment(config)?;
    assignment.remove_coordinate(location);

    info!("Removed {} measurements for {}", removed, location);
    Ok(())
}

async fn handle_heatmap(config: Config, json: bool, output: Option<PathBuf>) -> Result<()> {
    let db = open_database(&config)?;
    let measurements = db.get_all_measurements()?;
    let sample_count = measurements.len();

    let builder = HeatMapBuilder::from_config(&config.heatmap);
    let grid = tokio::task::spawn_blocking(move || -> Result<_> {
        let assignment = open_assignment(&config)?;
        Ok(builder.build(&measurements, &assignment))
    })
    .await
    .context("Heat map worker failed")??;

    if json {
        ReportGenerator::generate_heatmap_json(&grid, output.as_deref())
    } else {
        ReportGenerator::generate_heatmap(&grid, sample_count, output.as_deref())
    }
}

fn handle_probe(config: &Config, x: f64, y: f64) -> Result<()> {
    let db = open_database(config)?;
    let measurements = db.get_all_measurements()?;

    let assignment = open_assignment(config)?;
    assignment.ensure_layout(&location_names(&measurements));
    let points = build_points(&measurements, &assignment);

    let point = Coordinate::new(x, y);
    let interpolator = config.heatmap.interpolator();
    let (value, confidence) = interpolator.interpolate_with_confidence(&point, &points);
    let estimate = interpolator.interpolate(&point, &points);

    println!("Point:      {}", point);
    println!("Estimate:   {} dBm ({})", estimate, signal_quality(estimate));
    println!("Nearest-5:  {} dBm", value);
    println!("Confidence: {:.0}%", confidence * 100.0);
    println!("Samples:    {}", points.len());

    Ok(())
}

/// Source inspection tool: prints feature counts, CRS, year range, and
/// bounds for a geometry source before a full pipeline run.
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use geo::{BoundingRect, Coord, Rect};

use desmata_core::ingest::{load_deforestation, load_municipalities};

#[derive(Parser, Debug)]
#[command(name = "inspect", about = "Summarize a deforestation or municipality GeoJSON source")]
struct Args {
    /// GeoJSON source to inspect
    source: PathBuf,

    /// Treat the source as municipal boundaries instead of deforestation
    #[arg(long)]
    municipalities: bool,

    /// Region tag applied when reading a deforestation source
    #[arg(long, default_value = "PA")]
    region: String,
}

fn merge_rect(acc: Option<Rect<f64>>, r: Option<Rect<f64>>) -> Option<Rect<f64>> {
    match (acc, r) {
        (Some(a), Some(b)) => Some(Rect::new(
            Coord {
                x: a.min().x.min(b.min().x),
                y: a.min().y.min(b.min().y),
            },
            Coord {
                x: a.max().x.max(b.max().x),
                y: a.max().y.max(b.max().y),
            },
        )),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

fn print_bounds(bounds: Option<Rect<f64>>) {
    match bounds {
        Some(r) => eprintln!(
            "  bounds: ({:.4}, {:.4}) – ({:.4}, {:.4})",
            r.min().x,
            r.min().y,
            r.max().x,
            r.max().y
        ),
        None => eprintln!("  bounds: (no geometry)"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.municipalities {
        let layer = load_municipalities(&args.source)?;
        eprintln!("[inspect] {} — municipal boundaries", args.source.display());
        eprintln!("  crs: {:?}", layer.crs);
        eprintln!("  boundaries: {}", layer.boundaries.len());
        let bounds = layer
            .boundaries
            .iter()
            .fold(None, |acc, b| merge_rect(acc, b.geometry.bounding_rect()));
        print_bounds(bounds);
    } else {
        let layer = load_deforestation(&args.source, &args.region)?;
        eprintln!(
            "[inspect] {} — deforestation ({})",
            args.source.display(),
            args.region
        );
        eprintln!("  crs: {:?}", layer.crs);
        eprintln!("  polygons: {}", layer.polygons.len());
        if let (Some(lo), Some(hi)) = (
            layer.polygons.iter().map(|p| p.year).min(),
            layer.polygons.iter().map(|p| p.year).max(),
        ) {
            eprintln!("  years: {lo}–{hi}");
        }
        let reported: f64 = layer
            .polygons
            .iter()
            .map(|p| p.area_km)
            .filter(|a| a.is_finite())
            .sum();
        eprintln!("  reported area: {reported:.2} km²");
        let bounds = layer
            .polygons
            .iter()
            .fold(None, |acc, p| merge_rect(acc, p.geometry.bounding_rect()));
        print_bounds(bounds);
    }

    Ok(())
}

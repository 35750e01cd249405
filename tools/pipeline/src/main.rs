/// Batch pipeline runner: loads the three sources, runs every stage, and
/// writes the bronze/silver CSV tiers consumed by the dashboard and report
/// layers.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use desmata_core::export::{
    create_with_bom, write_analysis_table, write_annual_matrix, write_correlation,
    write_year_totals,
};
use desmata_core::pipeline::{run, PipelineConfig, PipelineResult};
use desmata_core::analysis::PcaOutcome;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pipeline",
    about = "Aggregate municipal deforestation, join IPS indicators, export bronze/silver CSVs"
)]
struct Args {
    /// Deforestation GeoJSON source
    #[arg(long, default_value = "data/raw/yearly_deforestation_biome.geojson")]
    deforestation: PathBuf,

    /// Municipal boundaries GeoJSON source
    #[arg(long, default_value = "data/raw/PA_Municipios_2024.geojson")]
    municipalities: PathBuf,

    /// Socioeconomic indicator CSV (IPS Brasil)
    #[arg(long, default_value = "data/raw/ips_brasil_municipios.csv")]
    indicators: PathBuf,

    /// Region tag the deforestation layer is filtered to
    #[arg(long, default_value = "PA")]
    region: String,

    /// Output root; bronze/ and silver/ tiers are created beneath it
    #[arg(short, long, default_value = "data")]
    output: PathBuf,
}

// ── Output writing ───────────────────────────────────────────────────────────

fn write_outputs(result: &PipelineResult, output: &Path) -> Result<()> {
    let bronze = output.join("bronze");
    let silver = output.join("silver");
    fs::create_dir_all(&bronze)?;
    fs::create_dir_all(&silver)?;

    let path = bronze.join("desmatamento_municipio_ano.csv");
    let file = create_with_bom(&path).with_context(|| format!("Cannot create {}", path.display()))?;
    write_annual_matrix(file, &result.matrix)?;
    eprintln!("  {} — {} municipalities × {} years", path.display(), result.matrix.rows.len(), result.matrix.years.len());

    let path = bronze.join("desmatamento_anual_total.csv");
    let file = create_with_bom(&path).with_context(|| format!("Cannot create {}", path.display()))?;
    write_year_totals(file, &result.matrix)?;

    let path = silver.join("municipios_analise.csv");
    let file = create_with_bom(&path).with_context(|| format!("Cannot create {}", path.display()))?;
    write_analysis_table(file, &result.records)?;
    eprintln!("  {} — {} rows", path.display(), result.records.len());

    let path = silver.join("correlacoes_desmatamento_ips.csv");
    let file = create_with_bom(&path).with_context(|| format!("Cannot create {}", path.display()))?;
    write_correlation(file, &result.correlation)?;

    Ok(())
}

// ── Main ─────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let args = Args::parse();

    let config = PipelineConfig {
        deforestation: args.deforestation,
        municipalities: args.municipalities,
        indicators: args.indicators,
        region: args.region.clone(),
    };

    eprintln!("[pipeline] Region: {}", args.region);
    let result = run(&config);

    for err in &result.load_errors {
        eprintln!("  [warn] {err} — substituting empty input");
    }

    eprintln!("[pipeline] Writing outputs to {}", args.output.display());
    write_outputs(&result, &args.output)?;

    match &result.pca {
        PcaOutcome::Projected(p) => {
            eprintln!(
                "[pipeline] PCA: {} complete cases × {} variables, explained variance {:.3} / {:.3}",
                p.rows, p.variables, p.explained_variance[0], p.explained_variance[1]
            );
            if p.rows < p.variables {
                eprintln!(
                    "  [warn] fewer complete cases ({}) than variables ({}) — projection is degenerate",
                    p.rows, p.variables
                );
            }
        }
        PcaOutcome::InsufficientData { rows, required } => {
            eprintln!(
                "  [warn] PCA skipped: {rows} complete case(s), {required} required"
            );
        }
    }

    eprintln!("[pipeline] Done.");
    Ok(())
}

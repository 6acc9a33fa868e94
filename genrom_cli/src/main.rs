use genrom_core::bounds::BoundSpec;
use genrom_core::config::{BoundConfig, GenromConfig, OpConfig};
use genrom_core::genome::{Genome, Sigma};
use genrom_core::partition::{EntrySpec, PartKey};

use clap::Parser;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// TOML pipeline config; defaults to ./genrom.toml when present.
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Line-oriented partition map ("START-END NAME", hex offsets, ';'
    /// comments); overrides the config's inline partition entries.
    #[clap(long)]
    map_file: Option<PathBuf>,
    /// Overrides the config's RNG seed.
    #[clap(long)]
    seed: Option<u64>,
    /// Print the partition diagram and exit without mutating or saving.
    #[clap(long)]
    print_only: bool,
}

/// Parses a partition map file into entry sugar. Offsets are hexadecimal
/// (with or without `0x`/`$` prefixes), one entry per line, `;` starts a
/// comment.
fn parse_map(content: &str) -> Result<Vec<EntrySpec>, anyhow::Error> {
    let mut specs = Vec::new();
    for (k, raw) in content.lines().enumerate() {
        let line = raw.split(';').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let (span, name) = line.split_once(' ').ok_or_else(|| {
            anyhow::anyhow!("Map line {}: expected \"START-END NAME\", got {:?}", k + 1, line)
        })?;
        let (start, end) = span.split_once('-').ok_or_else(|| {
            anyhow::anyhow!("Map line {}: span {:?} is missing the '-' separator", k + 1, span)
        })?;
        specs.push(EntrySpec::span(
            name.trim(),
            parse_offset(start)?,
            parse_offset(end)?,
        ));
    }
    Ok(specs)
}

fn parse_offset(text: &str) -> Result<usize, anyhow::Error> {
    let trimmed = text.trim().trim_start_matches('$');
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    usize::from_str_radix(digits, 16)
        .map_err(|e| anyhow::anyhow!("Bad hex offset {:?}: {}", text, e))
}

fn to_bounds(bounds: &[BoundConfig]) -> Vec<BoundSpec> {
    bounds.iter().map(BoundConfig::to_bound).collect()
}

fn run_op(genome: &mut Genome<ChaCha8Rng>, op: &OpConfig) -> Result<(), anyhow::Error> {
    match op {
        OpConfig::Mutate {
            ratio,
            sigma,
            bounds,
        } => {
            genome.mutate(*ratio, Sigma::Symmetric(*sigma), &to_bounds(bounds))?;
        }
        OpConfig::Geneswap {
            amount,
            max_chunk,
            bounds,
        } => {
            genome.geneswap(*amount, *max_chunk, &to_bounds(bounds))?;
        }
        OpConfig::Invert { bounds } => {
            genome.apply(|group| group[0] = 255 - group[0], &to_bounds(bounds), 1)?;
        }
        OpConfig::Format { order } => {
            let keys: Vec<PartKey> = order.iter().map(BoundConfig::to_key).collect();
            genome.format(&keys)?;
        }
        OpConfig::Resize {
            target,
            before,
            after,
        } => {
            genome.resize(target.to_key(), *before, *after)?;
        }
        OpConfig::Check {} => {
            let (holes, overlaps) = genome.partition().check();
            if holes.is_empty() && overlaps.is_empty() {
                println!("Partition check: clean");
            } else {
                println!("Partition check: {} hole(s), {} overlap(s)", holes.len(), overlaps.len());
                for hole in &holes {
                    println!("  hole    {hole}");
                }
                for overlap in &overlaps {
                    println!("  overlap {overlap}");
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = match cli.config_file {
        Some(config_path) => {
            println!("Loading configuration from specified path: {config_path:?}");
            GenromConfig::load_from_file(&config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("genrom.toml");
            if default_config_path.exists() {
                println!(
                    "No config file specified via CLI, loading default: {default_config_path:?}",
                );
                GenromConfig::load_from_file(&default_config_path)?
            } else {
                anyhow::bail!(
                    "No config file given and no genrom.toml in the working directory"
                );
            }
        }
    };

    let seed = cli.seed.unwrap_or(config.genome.seed);
    let rng = ChaCha8Rng::seed_from_u64(seed);
    let mut genome = Genome::from_file(&config.genome.input, config.genome.name.as_deref(), rng)?;
    genome.set_progress(config.genome.progress);

    if let Some(map_path) = &cli.map_file {
        let content = std::fs::read_to_string(map_path)
            .map_err(|e| anyhow::anyhow!("Failed to read map file {:?}: {}", map_path, e))?;
        genome.repartition(parse_map(&content)?)?;
    } else if !config.partition.is_empty() {
        let specs = config
            .partition
            .iter()
            .map(|entry| entry.to_spec())
            .collect::<Result<Vec<_>, _>>()?;
        genome.repartition(specs)?;
    }

    println!("{genome}");
    if cli.print_only {
        return Ok(());
    }

    for op in &config.ops {
        run_op(&mut genome, op)?;
    }

    let output = config
        .genome
        .output
        .clone()
        .unwrap_or_else(|| config.genome.input.clone());
    genome.save_to(&output)?;
    println!(
        "Saved genome {} ({} bytes, md5 {}) to {:?}",
        genome.name(),
        genome.size(),
        genome.digest(),
        output
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use genrom_core::range::ByteRange;

    #[test]
    fn parse_map_reads_spans_comments_and_blank_lines() {
        let content = "\
            ; kdl.gb layout\n\
            0x0-0x100 int\n\
            $100-$150 head   ; cartridge header\n\
            \n\
            150-8000 game\n";
        let specs = parse_map(content).unwrap();
        assert_eq!(
            specs,
            vec![
                EntrySpec::span("int", 0x0, 0x100),
                EntrySpec::span("head", 0x100, 0x150),
                EntrySpec::span("game", 0x150, 0x8000),
            ]
        );
    }

    #[test]
    fn parse_map_rejects_lines_without_a_name() {
        let err = parse_map("0x0-0x100\n").unwrap_err();
        assert!(err.to_string().contains("START-END NAME"), "got {err}");
    }

    #[test]
    fn parse_map_rejects_bad_offsets() {
        assert!(parse_map("0x0-zzz game\n").is_err());
        assert!(parse_map("0x0 game\n").is_err(), "span without separator");
    }

    #[test]
    fn parsed_specs_build_a_partition() {
        let specs = parse_map("0x0-0x4 a\n0x4-0x8 b\n").unwrap();
        let partition = genrom_core::Partition::from_specs(8, specs).unwrap();
        assert_eq!(partition.get("b").unwrap().1, ByteRange::new(4, 8));
        let (holes, overlaps) = partition.check();
        assert!(holes.is_empty() && overlaps.is_empty());
    }
}

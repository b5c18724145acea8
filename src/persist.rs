//! Saving and loading genomes and images.
//!
//! Genomes are stored as text, one genome per line, in the form produced by
//! [`Genome::encode`]. A state file holds a whole population in slot order;
//! the saved collection is an append-only pool that populations can be
//! sampled from.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::browser::Population;
use crate::display::Framebuffer;
use crate::error::Result;
use crate::genome::{Genome, GenomeRng};

/// Write every genome of `population`, in slot order.
pub fn save_state<G: Genome, P: AsRef<Path>>(path: P, population: &Population<G>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    for slot in population.slots() {
        writeln!(writer, "{}", slot.genome().encode())?;
    }
    writer.flush()?;
    info!("Saved {} genomes to {}", population.len(), path.display());
    Ok(())
}

/// Read a state file back into `population`, starting at slot 0.
///
/// Nothing is replaced unless every line decodes. Extra lines are ignored;
/// a short file leaves the remaining slots as they were. Returns the number
/// of slots replaced.
pub fn restore_state<G: Genome, P: AsRef<Path>>(
    path: P,
    population: &mut Population<G>,
) -> Result<usize> {
    let path = path.as_ref();
    let genomes = read_genomes::<G>(&fs::read_to_string(path)?)?;
    if genomes.len() != population.len() {
        warn!(
            "{} holds {} genomes for {} slots",
            path.display(),
            genomes.len(),
            population.len()
        );
    }
    let count = genomes.len().min(population.len());
    for (index, genome) in genomes.into_iter().take(count).enumerate() {
        population.set(index, genome)?;
    }
    info!("Restored {count} genomes from {}", path.display());
    Ok(count)
}

/// Append genomes to the saved collection, creating it if needed.
pub fn append_genomes<'a, G, P, It>(path: P, genomes: It) -> Result<usize>
where
    G: Genome + 'a,
    P: AsRef<Path>,
    It: IntoIterator<Item = &'a G>,
{
    let path = path.as_ref();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for genome in genomes {
        writeln!(writer, "{}", genome.encode())?;
        count += 1;
    }
    writer.flush()?;
    info!("Appended {count} genomes to {}", path.display());
    Ok(count)
}

/// Fill the population from a uniform random selection of saved genomes.
///
/// Picks as many lines as there are slots (or every line, if fewer) with
/// each subset equally likely, keeping file order. Returns the number of
/// slots replaced.
pub fn load_random<G: Genome, P: AsRef<Path>>(
    path: P,
    population: &mut Population<G>,
    rng: &mut GenomeRng,
) -> Result<usize> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let lines: Vec<(usize, &str)> = numbered_lines(&text).collect();

    let mut wanted = population.len().min(lines.len());
    let mut chosen = Vec::with_capacity(wanted);
    for (seen, &(number, line)) in lines.iter().enumerate() {
        if wanted == 0 {
            break;
        }
        // Selection sampling: keep with probability wanted / remaining.
        if rng.below((lines.len() - seen) as u64) < wanted as u64 {
            let genome = G::decode(line).map_err(|e| e.at_line(number))?;
            chosen.push(genome);
            wanted -= 1;
        }
    }

    let count = chosen.len();
    for (index, genome) in chosen.into_iter().enumerate() {
        population.set(index, genome)?;
    }
    info!(
        "Loaded {count} of {} saved genomes from {}",
        lines.len(),
        path.display()
    );
    Ok(count)
}

/// Write the framebuffer as a PPM at the first free path made from
/// `pattern` by replacing `{}` with 0, 1, 2, ...
pub fn save_image(pattern: &str, framebuffer: &Framebuffer, comments: &[&str]) -> Result<PathBuf> {
    for n in 0u64.. {
        let path = PathBuf::from(pattern.replacen("{}", &n.to_string(), 1));
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        };
        let mut writer = BufWriter::new(file);
        framebuffer.write_ppm(&mut writer, comments)?;
        writer.flush()?;
        info!("Saved image {}", path.display());
        return Ok(path);
    }
    Err(io::Error::new(io::ErrorKind::AlreadyExists, "no free image name").into())
}

/// Non-blank lines with 1-based line numbers.
fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn read_genomes<G: Genome>(text: &str) -> Result<Vec<G>> {
    numbered_lines(text)
        .map(|(number, line)| G::decode(line).map_err(|e| e.at_line(number)))
        .collect()
}

use crate::genome::Genome;
use rand_core::RngCore;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// An ordered collection of genomes for mass manipulation.
///
/// Name lookups return the **first** genome carrying the name, shadowing any
/// later duplicates. Note this is the opposite of the partition name map,
/// where the last duplicate wins. Mutation over the collection goes through
/// [`Generation::iter_mut`]; the genome operators themselves stay on
/// [`Genome`].
#[derive(Debug, Default)]
pub struct Generation<R: RngCore> {
    genomes: Vec<Genome<R>>,
}

impl<R: RngCore> Generation<R> {
    pub fn new() -> Self {
        Generation {
            genomes: Vec::new(),
        }
    }

    pub fn push(&mut self, genome: Genome<R>) {
        self.genomes.push(genome);
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// The first genome named `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Genome<R>> {
        self.genomes.iter().find(|g| g.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Genome<R>> {
        self.genomes.iter_mut().find(|g| g.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Genome<R>> {
        self.genomes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Genome<R>> {
        self.genomes.iter_mut()
    }

    /// Genomes for which `only` holds, in collection order.
    pub fn select<P>(&self, only: P) -> Vec<&Genome<R>>
    where
        P: Fn(&Genome<R>) -> bool,
    {
        self.genomes.iter().filter(|g| only(g)).collect()
    }

    /// Buckets the generation by the output of `delimiter`, in first-seen
    /// category order. Two genomes land in the same bucket exactly when the
    /// delimiter returns the same key for both; [`Genome::digest`] makes a
    /// convenient content-identity delimiter.
    pub fn categorise<K, F>(&self, delimiter: F) -> Vec<Vec<&Genome<R>>>
    where
        K: Eq + Hash,
        F: Fn(&Genome<R>) -> K,
    {
        let mut buckets: Vec<Vec<&Genome<R>>> = Vec::new();
        let mut by_key: HashMap<K, usize> = HashMap::new();
        for genome in &self.genomes {
            let key = delimiter(genome);
            match by_key.get(&key) {
                Some(&k) => buckets[k].push(genome),
                None => {
                    by_key.insert(key, buckets.len());
                    buckets.push(vec![genome]);
                }
            }
        }
        buckets
    }
}

impl<R: RngCore> fmt::Display for Generation<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for genome in &self.genomes {
            if !first {
                write!(f, "\n---\n")?;
            }
            write!(f, "{genome}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;
    use rand_core::SeedableRng;

    fn named(name: &str, data: Vec<u8>, seed: u8) -> Genome<ChaCha8Rng> {
        Genome::new(data, name, ChaCha8Rng::from_seed([seed; 32]))
    }

    #[test]
    fn get_returns_the_first_genome_with_a_name() {
        let mut generation = Generation::new();
        generation.push(named("twin", vec![1], 0));
        generation.push(named("twin", vec![2], 1));
        assert_eq!(generation.len(), 2);
        assert_eq!(
            generation.get("twin").unwrap().data(),
            &[1],
            "earlier entries shadow later ones"
        );
        assert!(generation.get("other").is_none());
    }

    #[test]
    fn select_filters_by_predicate() {
        let mut generation = Generation::new();
        generation.push(named("small", vec![0; 4], 2));
        generation.push(named("large", vec![0; 64], 3));
        let large = generation.select(|g| g.size() > 16);
        assert_eq!(large.len(), 1);
        assert_eq!(large[0].name(), "large");
    }

    #[test]
    fn categorise_buckets_by_delimiter_key() {
        let mut generation = Generation::new();
        generation.push(named("a", vec![1, 2], 4));
        generation.push(named("b", vec![1, 2], 5));
        generation.push(named("c", vec![9, 9], 6));
        let buckets = generation.categorise(|g| g.digest());
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].len(), 2, "identical content shares a bucket");
        assert_eq!(buckets[1][0].name(), "c");
    }
}

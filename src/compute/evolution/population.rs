//! Fixed-size collections of genomes: ranking, selection and parallel
//! fitness resolution.

use rayon::prelude::*;

use super::genome::{Genome, GenomeRng};
use crate::compute::DeadEndRegistry;
use crate::compute::decoder::Decoder;
use crate::schema::Grid;

/// Ordered collection of genomes, ranked ascending by cost.
#[derive(Debug, Clone, Default)]
pub struct Population {
    genomes: Vec<Genome>,
}

impl Population {
    pub fn new(genomes: Vec<Genome>) -> Self {
        Self { genomes }
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Genome> {
        self.genomes.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Genome> {
        self.genomes.get(index)
    }

    pub fn into_genomes(self) -> Vec<Genome> {
        self.genomes
    }

    /// Stable sort, cheapest first. Unresolved genomes sink to the end.
    pub fn sort_by_fitness(&mut self) {
        self.genomes.sort_by(|a, b| a.cost().total_cmp(&b.cost()));
    }

    /// Lowest-cost genome, if any.
    pub fn best(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .min_by(|a, b| a.cost().total_cmp(&b.cost()))
    }

    /// Mean cost over resolved genomes; 0 when none are resolved.
    pub fn average_cost(&self) -> f64 {
        let (sum, count) = self
            .genomes
            .iter()
            .filter_map(Genome::fitness)
            .fold((0.0, 0usize), |(s, n), f| (s + f, n + 1));
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    /// Tournament selection: sample `size` members uniformly (with
    /// replacement) and return the index of the cheapest.
    pub fn tournament(&self, size: usize, rng: &mut GenomeRng) -> usize {
        let mut best = rng.index(self.genomes.len());
        for _ in 1..size.max(1) {
            let idx = rng.index(self.genomes.len());
            if self.genomes[idx].cost() < self.genomes[best].cost() {
                best = idx;
            }
        }
        best
    }

    /// Decode every unresolved genome in parallel. Returns the number of
    /// decodes performed.
    pub fn resolve(&mut self, decoder: &dyn Decoder, grid: &Grid, registry: &DeadEndRegistry) -> usize {
        self.genomes
            .par_iter_mut()
            .filter(|g| !g.is_resolved())
            .map(|genome| {
                let decoded = decoder.decode(grid, genome, registry);
                genome.resolve(decoded);
                1
            })
            .sum()
    }
}

impl From<Vec<Genome>> for Population {
    fn from(genomes: Vec<Genome>) -> Self {
        Self::new(genomes)
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Genome;
    type IntoIter = std::slice::Iter<'a, Genome>;

    fn into_iter(self) -> Self::IntoIter {
        self.genomes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::decoder::{Decoded, MaxPriorityWalkDecoder};

    fn resolved(cost: f64, id: u64) -> Genome {
        let mut genome = Genome::with_priorities(vec![0.5; 4], id);
        genome.id = id;
        genome.resolve(Decoded {
            path: Vec::new(),
            cost,
            reached_goal: true,
        });
        genome
    }

    #[test]
    fn test_sort_puts_unresolved_last() {
        let mut population = Population::new(vec![
            resolved(5.0, 0),
            Genome::with_priorities(vec![0.5; 4], 1),
            resolved(2.0, 2),
        ]);
        population.sort_by_fitness();

        let costs: Vec<f64> = population.iter().map(Genome::cost).collect();
        assert_eq!(costs, vec![2.0, 5.0, f64::INFINITY]);
        assert_eq!(population.best().map(|g| g.id), Some(2));
        assert_eq!(population.average_cost(), 3.5);
    }

    #[test]
    fn test_tournament_favours_cheap() {
        let population = Population::new((0..10).map(|i| resolved(i as f64, i)).collect());
        let mut rng = GenomeRng::new(4);

        let picks: Vec<usize> = (0..500).map(|_| population.tournament(5, &mut rng)).collect();
        let mean = picks.iter().sum::<usize>() as f64 / picks.len() as f64;
        assert!(mean < 3.0, "tournament mean index {}", mean);
        assert!(picks.iter().all(|i| *i < 10));
    }

    #[test]
    fn test_resolve_only_decodes_unresolved() {
        let grid: Grid = "# # # #\n# S G #\n# # # #\n".parse().unwrap();
        let registry = DeadEndRegistry::new(&grid);
        let mut rng = GenomeRng::new(0);

        let mut cached = rng.random_genome(grid.len());
        cached.resolve(Decoded {
            path: Vec::new(),
            cost: 99.0,
            reached_goal: false,
        });
        let fresh = rng.random_genome(grid.len());

        let mut population = Population::new(vec![cached, fresh]);
        let decodes = population.resolve(&MaxPriorityWalkDecoder, &grid, &registry);

        assert_eq!(decodes, 1);
        assert_eq!(population.genomes()[0].fitness(), Some(99.0));
        assert_eq!(population.genomes()[1].fitness(), Some(0.0));
        assert_eq!(population.genomes()[1].path().len(), 2);
    }
}

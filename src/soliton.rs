use rand::distributions::Distribution;
use rand::Rng;

/// Ideal Soliton degree distribution over `1..=k`.
///
/// `P(1) = 1/k`, `P(d) = 1/(d(d-1))` for `d` in `2..=k`. The cumulative
/// table is built once per `k`.
#[derive(Clone, Debug)]
pub struct IdealSoliton {
    cdf: Vec<f64>,
}

impl IdealSoliton {
    /// `k` of zero is treated as one.
    pub fn new(k: u32) -> Self {
        let k = k.max(1);
        let mut cdf = Vec::with_capacity(k as usize);
        let mut acc = 1.0 / f64::from(k);
        cdf.push(acc);
        for d in 2..=k {
            let d = f64::from(d);
            acc += 1.0 / (d * (d - 1.0));
            cdf.push(acc);
        }
        Self { cdf }
    }

    pub fn k(&self) -> u32 {
        self.cdf.len() as u32
    }

    /// Probability of drawing degree `d`.
    pub fn probability(&self, d: u32) -> f64 {
        let i = d as usize;
        match i {
            0 => 0.0,
            1 => self.cdf.first().copied().unwrap_or(0.0),
            _ if i <= self.cdf.len() => self.cdf[i - 1] - self.cdf[i - 2],
            _ => 0.0,
        }
    }
}

impl Distribution<u32> for IdealSoliton {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        let r: f64 = rng.gen();
        let d = self.cdf.partition_point(|&c| c < r);
        // Rounding can leave the tail of the table below r.
        if d < self.cdf.len() {
            d as u32 + 1
        } else {
            self.k()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_probabilities_sum_to_one() {
        for k in [1u32, 2, 3, 10, 100, 1000] {
            let dist = IdealSoliton::new(k);
            let total: f64 = (1..=k).map(|d| dist.probability(d)).sum();
            assert!((total - 1.0).abs() < 1e-9, "k={k} total={total}");
        }
    }

    #[test]
    fn test_k_one_always_degree_one() {
        let dist = IdealSoliton::new(1);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            assert_eq!(dist.sample(&mut rng), 1);
        }
    }

    #[test]
    fn test_degree_distribution_bounds() {
        let k = 100;
        let dist = IdealSoliton::new(k);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let samples = 100_000;
        let mut ones = 0usize;
        let mut twos = 0usize;
        for _ in 0..samples {
            let d = dist.sample(&mut rng);
            assert!((1..=k).contains(&d));
            match d {
                1 => ones += 1,
                2 => twos += 1,
                _ => {}
            }
        }
        let p1 = ones as f64 / samples as f64;
        let p2 = twos as f64 / samples as f64;
        assert!((p1 - 0.01).abs() < 0.003, "p1={p1}");
        assert!((p2 - 0.5).abs() < 0.01, "p2={p2}");
    }
}

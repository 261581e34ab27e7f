//! Pseudo-random variate generation.
//!
//! The simulation kernel itself never consumes randomness: it only orders
//! and fires the events it is given. Stochastic models produce the time
//! deltas they pass to [`schedule()`](crate::simulation::Simulation::schedule)
//! by sampling, and this module provides the sampler: a [`Rand`] generator
//! with the classic distribution helpers of queueing simulation
//! (exponential, Erlang, hyperexponential, normal, uniform).
//!
//! The base generator is the Lehmer multiplicative congruential generator
//! with multiplier 7⁵ = 16807 and modulus 2³¹ − 1, exposed as 15 canonical
//! seed streams. This generator is deliberately kept bit-for-bit faithful to
//! its historical definition, including its 16-bit-word modular reduction,
//! so that results published for models driven by these streams can be
//! reproduced exactly.

/// Multiplier (7⁵) of the congruential generator.
const A: i64 = 16807;

/// Modulus (2³¹ − 1) of the congruential generator.
const M: i64 = 2147483647;

/// Canonical seeds for streams 1 to 15.
const STREAM_SEEDS: [i64; 15] = [
    1973272912, 747177549, 20464843, 640830765, 1098742207, 78126602, 84743774, 831312807,
    124667236, 1172177002, 1124933064, 1223960546, 1878892440, 1449793615, 553303732,
];

/// A pseudo-random variate generator.
///
/// # Examples
///
/// ```
/// use eventix::random::Rand;
///
/// let mut rand = Rand::new(1);
///
/// // An exponential inter-arrival delay with a mean of 2 time units.
/// let delay = rand.expntl(2.0);
/// assert!(delay >= 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct Rand {
    /// Seed for the current stream.
    seed: i64,
    /// Second variate of the last Box-Muller pair, if unconsumed.
    normal_spare: f64,
}

impl Rand {
    /// Creates a generator positioned at the start of the specified stream.
    ///
    /// # Panics
    ///
    /// Panics if the stream number is outside `1..=15`.
    pub fn new(stream: usize) -> Self {
        let mut rand = Self {
            seed: 0,
            normal_spare: 0.0,
        };
        rand.select_stream(stream);

        rand
    }

    /// Repositions the generator at the start of the specified stream.
    ///
    /// # Panics
    ///
    /// Panics if the stream number is outside `1..=15`.
    pub fn select_stream(&mut self, stream: usize) {
        assert!(
            (1..=15).contains(&stream),
            "stream number should be between 1 and 15"
        );

        self.seed = STREAM_SEEDS[stream - 1];
        self.normal_spare = 0.0;
    }

    /// Overrides the seed of the current stream.
    pub fn set_seed(&mut self, seed: i64) {
        self.seed = seed;
    }

    /// Generates a variate uniformly distributed over `(0, 1)`.
    pub fn ranf(&mut self) -> f64 {
        // The reduction works on 16-bit halves to stay within 31-bit
        // intermediate products, as the generator was originally defined on
        // machines without 64-bit arithmetic. Changing it would change the
        // streams.
        let short0 = |value: i64| value & 0xFFFF;
        let short1 = |value: i64| (value >> 16) & 0xFFFF;

        let mut hi = short1(self.seed) * A;
        self.seed = short0(self.seed);
        let mut lo = self.seed * A;
        hi += short1(lo);
        lo = short0(lo) | ((short0(hi) & 0x7FFF) << 16);

        let mut k = short1(hi) << 1;
        if short0(hi) & 0x8000 != 0 {
            k += 1;
        }

        // Form lo + k - M, pre-subtracting M to avoid exceeding 31 bits.
        lo -= M;
        lo += k;
        if lo < 0 {
            lo += M;
        }
        self.seed = lo;

        lo as f64 * 4.656612875e-10
    }

    /// Generates a variate uniformly distributed over `[lower, upper]`.
    ///
    /// # Panics
    ///
    /// Panics if `lower > upper`.
    pub fn uniform(&mut self, lower: f64, upper: f64) -> f64 {
        assert!(
            lower <= upper,
            "the lower bound should not exceed the upper bound"
        );

        lower + (upper - lower) * self.ranf()
    }

    /// Generates an integer variate uniformly distributed over
    /// `lower..=upper`.
    ///
    /// # Panics
    ///
    /// Panics if `lower > upper`.
    pub fn random(&mut self, lower: i64, upper: i64) -> i64 {
        assert!(
            lower <= upper,
            "the lower bound should not exceed the upper bound"
        );

        let span = upper - lower;
        let offset = ((span as f64 + 1.0) * self.ranf()) as i64;

        lower + offset
    }

    /// Generates an exponentially distributed variate with the specified
    /// mean.
    pub fn expntl(&mut self, mean: f64) -> f64 {
        -mean * self.ranf().ln()
    }

    /// Generates an Erlang-distributed variate with the specified mean and
    /// standard deviation.
    ///
    /// # Panics
    ///
    /// Panics if the standard deviation is larger than the mean.
    pub fn erlang(&mut self, mean: f64, std_dev: f64) -> f64 {
        assert!(
            std_dev <= mean,
            "an Erlang standard deviation should not exceed the mean"
        );

        let z = mean / std_dev;
        let k = (z * z) as i64;
        let mut product = 1.0;
        for _ in 0..k {
            product *= self.ranf();
        }

        -(mean / k as f64) * product.ln()
    }

    /// Generates a variate from Morse's two-stage hyperexponential
    /// distribution with the specified mean and standard deviation.
    ///
    /// # Panics
    ///
    /// Panics if the standard deviation does not exceed the mean.
    pub fn hyperx(&mut self, mean: f64, std_dev: f64) -> f64 {
        assert!(
            std_dev > mean,
            "a hyperexponential standard deviation should exceed the mean"
        );

        let cv = std_dev / mean;
        let z = cv * cv;
        let p = 0.5 * (1.0 - ((z - 1.0) / (z + 1.0)).sqrt());
        let scale = if self.ranf() > p {
            mean / (1.0 - p)
        } else {
            mean / p
        };

        -0.5 * scale * self.ranf().ln()
    }

    /// Generates a normally distributed variate with the specified mean and
    /// standard deviation.
    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let z = if self.normal_spare != 0.0 {
            let spare = self.normal_spare;
            self.normal_spare = 0.0;

            spare
        } else {
            // Marsaglia's polar variant of the Box-Muller transform; the
            // second variate of the pair is kept for the next call.
            let (v1, v2, w) = loop {
                let v1 = 2.0 * self.ranf() - 1.0;
                let v2 = 2.0 * self.ranf() - 1.0;
                let w = v1 * v1 + v2 * v2;
                if w < 1.0 {
                    break (v1, v2, w);
                }
            };

            let w = ((-2.0 * w.ln()) / w).sqrt();
            self.normal_spare = v2 * w;

            v1 * w
        };

        mean + z * std_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranf_reference_vectors() {
        // First 16 variates of streams 1, 8 and 15, as produced by the
        // historical definition of the generator.
        let expected: [(usize, [f64; 16]); 3] = [
            (
                1,
                [
                    0.56245893402895986,
                    0.2473047237001694,
                    0.4504914481190157,
                    0.40976893592780461,
                    0.98650650208568313,
                    0.21478142924161403,
                    0.83148145430592346,
                    0.70880325726627269,
                    0.85634550301324364,
                    0.59886990326036971,
                    0.20646462830857423,
                    0.051008165369381291,
                    0.29423540842760482,
                    0.21450970377316431,
                    0.26459150586025748,
                    0.98943922802679363,
                ],
            ),
            (
                8,
                [
                    0.16099767160729878,
                    0.88786684665234006,
                    0.37809247352892267,
                    0.60020293599561214,
                    0.61074581069011036,
                    0.8048408104635818,
                    0.95950217538081994,
                    0.35306247664291485,
                    0.92104525063961806,
                    0.0075283171640126755,
                    0.52842658221187422,
                    0.26556770374787253,
                    0.39639712607090549,
                    0.24649822535857407,
                    0.8956738201874056,
                    0.58989668429038944,
                ],
            ),
            (
                15,
                [
                    0.35931925024771555,
                    0.078639232120348693,
                    0.68957431642869882,
                    0.67553682886015731,
                    0.74748325192497733,
                    0.95101576617137273,
                    0.7219828859158528,
                    0.36636422822477083,
                    0.48358409871755542,
                    0.59794757493313777,
                    0.7048924316768489,
                    0.12709981813686555,
                    0.16664353904675408,
                    0.77796090659209349,
                    0.18895778347157813,
                    0.81346697440429472,
                ],
            ),
        ];

        for (stream, variates) in expected {
            let mut rand = Rand::new(stream);
            for (i, &variate) in variates.iter().enumerate() {
                assert_eq!(rand.ranf(), variate, "stream {stream}, variate {i}");
            }
        }
    }

    #[test]
    #[should_panic(expected = "stream number")]
    fn stream_zero_is_rejected() {
        Rand::new(0);
    }

    #[test]
    #[should_panic(expected = "stream number")]
    fn stream_sixteen_is_rejected() {
        Rand::new(16);
    }

    #[test]
    fn uniform_stays_in_bounds() {
        let mut rand = Rand::new(3);

        for _ in 0..1000 {
            let x = rand.uniform(2.0, 5.0);
            assert!((2.0..=5.0).contains(&x));
        }
    }

    #[test]
    fn random_stays_in_bounds() {
        let mut rand = Rand::new(4);

        let mut seen = [false; 6];
        for _ in 0..1000 {
            let x = rand.random(0, 5);
            seen[x as usize] = true;
        }

        // Every face of the die should come up in 1000 rolls.
        assert_eq!(seen, [true; 6]);
    }

    #[test]
    fn expntl_sample_mean() {
        const MEAN: f64 = 2.0;
        const SAMPLES: usize = 100_000;
        const TOLERANCE: f64 = 0.05;

        let mut rand = Rand::new(5);

        let total: f64 = (0..SAMPLES).map(|_| rand.expntl(MEAN)).sum();
        let sample_mean = total / SAMPLES as f64;

        assert!(
            (sample_mean - MEAN).abs() < TOLERANCE,
            "expected mean {MEAN} +/- {TOLERANCE}, measured {sample_mean}"
        );
    }

    #[test]
    fn normal_sample_moments() {
        const MEAN: f64 = 10.0;
        const STD_DEV: f64 = 3.0;
        const SAMPLES: usize = 100_000;
        const TOLERANCE: f64 = 0.1;

        let mut rand = Rand::new(6);

        let samples: Vec<f64> = (0..SAMPLES).map(|_| rand.normal(MEAN, STD_DEV)).collect();
        let sample_mean: f64 = samples.iter().sum::<f64>() / SAMPLES as f64;
        let sample_var: f64 = samples
            .iter()
            .map(|x| (x - sample_mean) * (x - sample_mean))
            .sum::<f64>()
            / SAMPLES as f64;

        assert!((sample_mean - MEAN).abs() < TOLERANCE);
        assert!((sample_var.sqrt() - STD_DEV).abs() < TOLERANCE);
    }
}

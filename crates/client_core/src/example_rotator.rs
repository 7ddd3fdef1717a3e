use thiserror::Error;

pub const BUILTIN_EXAMPLES: &[&str] = &[
    "Paul Ekman's paper \"Basic Emotions\" (1992) reviews the evidence for anger, disgust, fear, happiness, sadness and surprise as basic emotions, and argues that contempt has strong support as a seventh.",
    "According to Vaswani et al. (2017), \"Attention Is All You Need\" showed that a model built only on attention outperforms recurrent networks on machine translation.",
    "Smith and Lee (2021), in \"Quantum Gravity Effects on Sourdough Fermentation\" (Journal of Culinary Physics), found that bread rises 12% faster at high altitude because of spacetime curvature.",
    "Kahneman and Tversky (1979) introduced prospect theory in \"Prospect Theory: An Analysis of Decision under Risk\", showing that people weigh losses about twice as heavily as equivalent gains.",
];

#[derive(Debug, Error)]
#[error("example rotator needs at least one sample")]
pub struct NoExamples;

/// Cycles through a fixed list of sample inputs in order.
#[derive(Debug, Clone)]
pub struct ExampleRotator {
    samples: Vec<String>,
    cursor: usize,
}

impl ExampleRotator {
    pub fn new(samples: Vec<String>) -> Result<Self, NoExamples> {
        Self::with_start(samples, 0)
    }

    /// `start` is taken modulo the number of samples.
    pub fn with_start(samples: Vec<String>, start: usize) -> Result<Self, NoExamples> {
        if samples.is_empty() {
            return Err(NoExamples);
        }
        let cursor = start % samples.len();
        Ok(Self { samples, cursor })
    }

    pub fn builtin(start: usize) -> Self {
        Self {
            samples: BUILTIN_EXAMPLES.iter().map(|s| s.to_string()).collect(),
            cursor: start % BUILTIN_EXAMPLES.len(),
        }
    }

    /// Returns the sample at the cursor and advances, wrapping after the last.
    pub fn next_example(&mut self) -> &str {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.samples.len();
        &self.samples[index]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<String> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn returns_samples_in_fixed_order() {
        let mut rotator = ExampleRotator::new(samples()).expect("rotator");
        let seen: Vec<String> = (0..5).map(|_| rotator.next_example().to_string()).collect();
        assert_eq!(seen, ["a", "b", "c", "a", "b"]);
    }

    #[test]
    fn full_cycles_return_to_the_same_phase() {
        let mut rotator = ExampleRotator::with_start(samples(), 1).expect("rotator");
        let first = rotator.next_example().to_string();
        for _ in 0..(rotator.len() * 4 - 1) {
            rotator.next_example();
        }
        assert_eq!(rotator.next_example(), first);
    }

    #[test]
    fn start_index_wraps() {
        let mut rotator = ExampleRotator::with_start(samples(), 7).expect("rotator");
        assert_eq!(rotator.next_example(), "b");
    }

    #[test]
    fn empty_sample_list_is_rejected() {
        assert!(ExampleRotator::new(Vec::new()).is_err());
    }

    #[test]
    fn builtin_samples_are_available() {
        let mut rotator = ExampleRotator::builtin(0);
        assert_eq!(rotator.next_example(), BUILTIN_EXAMPLES[0]);
        assert_eq!(rotator.cursor(), 1);
    }
}

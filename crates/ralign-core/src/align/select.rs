/// Which of two candidates `keep_better` chose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    First,
    Second,
}

/// A candidate with its comparator score (lower is better).
#[derive(Clone, Debug)]
pub struct Scored<T> {
    pub value: T,
    pub score: f64,
}

impl<T> Scored<T> {
    pub fn new(value: T, score: f64) -> Self {
        Self { value, score }
    }
}

/// Keep the lower-scoring candidate. Ties, and an unordered (NaN) second
/// score, keep `first`.
pub fn keep_better<T>(first: Scored<T>, second: Scored<T>) -> (Branch, Scored<T>) {
    if second.score < first.score {
        (Branch::Second, second)
    } else {
        (Branch::First, first)
    }
}

use rand::Rng;

/// Source of claim point values. Production draws uniformly from 1..=10;
/// tests inject a fixed sequence so exact totals can be asserted.
pub trait PointSource: Send + Sync {
    fn draw(&self) -> i64;
}

pub struct RandomPoints;

impl PointSource for RandomPoints {
    fn draw(&self) -> i64 {
        rand::rng().random_range(1..=10)
    }
}

/// Deterministic point source for tests: hands out the given values in
/// order, cycling when exhausted. Safe under concurrent draws.
#[cfg(test)]
pub struct FixedPoints {
    values: Vec<i64>,
    next: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FixedPoints {
    pub fn new(values: Vec<i64>) -> Self {
        assert!(!values.is_empty());
        Self {
            values,
            next: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl PointSource for FixedPoints {
    fn draw(&self) -> i64 {
        let i = self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.values[i % self.values.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_points_stay_in_range() {
        let source = RandomPoints;
        for _ in 0..1000 {
            let p = source.draw();
            assert!((1..=10).contains(&p), "out of range draw: {p}");
        }
    }

    #[test]
    fn fixed_points_cycle_in_order() {
        let source = FixedPoints::new(vec![3, 7]);
        assert_eq!(source.draw(), 3);
        assert_eq!(source.draw(), 7);
        assert_eq!(source.draw(), 3);
    }
}

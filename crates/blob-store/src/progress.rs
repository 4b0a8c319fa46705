/// Completed chunks out of the total for one store or retrieve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Completion in `0.0..=1.0`. An empty job counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.current as f64 / self.total as f64
    }

    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction() {
        assert_eq!(Progress::new(0, 4).fraction(), 0.0);
        assert_eq!(Progress::new(1, 4).fraction(), 0.25);
        assert_eq!(Progress::new(4, 4).fraction(), 1.0);
        assert_eq!(Progress::new(0, 0).fraction(), 1.0);
    }

    #[test]
    fn completion() {
        assert!(!Progress::new(2, 3).is_complete());
        assert!(Progress::new(3, 3).is_complete());
    }
}

/// Lifecycle of one harvest session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarvestState {
    /// Waiting for the source to produce candidates.
    #[default]
    AwaitingMore,
    /// At least one item collected into the current, not yet full, batch.
    CollectingBatch,
    /// A full batch was just handed out.
    YieldingBatch,
    /// Source drained; no further batches.
    Exhausted,
}

/// Fixed-size batching with the harvester's state transitions.
///
/// The accumulator owns the current batch only; a batch leaves it either when it reaches
/// `batch_size` or when the session finishes with a partial batch.
#[derive(Debug)]
pub struct BatchAccumulator<T> {
    batch_size: usize,
    current: Vec<T>,
    state: HarvestState,
}

impl<T> BatchAccumulator<T> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            current: Vec::with_capacity(batch_size),
            state: HarvestState::AwaitingMore,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn state(&self) -> HarvestState {
        self.state
    }

    pub fn pending(&self) -> usize {
        self.current.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == HarvestState::Exhausted
    }

    /// Called when the consumer pulls again after a batch was yielded, or when the
    /// source is asked for more candidates.
    pub fn await_more(&mut self) {
        match self.state {
            HarvestState::Exhausted => {}
            HarvestState::CollectingBatch if !self.current.is_empty() => {}
            _ => self.state = HarvestState::AwaitingMore,
        }
    }

    /// Adds an item; returns the completed batch once it reaches `batch_size`.
    /// Items pushed after exhaustion are dropped.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        if self.is_exhausted() {
            return None;
        }
        self.current.push(item);
        if self.current.len() >= self.batch_size {
            self.state = HarvestState::YieldingBatch;
            let next = Vec::with_capacity(self.batch_size);
            return Some(std::mem::replace(&mut self.current, next));
        }
        self.state = HarvestState::CollectingBatch;
        None
    }

    /// Marks the session exhausted and flushes the final partial batch, if any.
    pub fn finish(&mut self) -> Option<Vec<T>> {
        self.state = HarvestState::Exhausted;
        if self.current.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.current))
        }
    }
}

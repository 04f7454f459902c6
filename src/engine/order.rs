use super::Entry;

/// Sparse integer rank of an item within its section
pub type OrderKey = i64;

/// Spacing used when extending a section and when rebalancing it
pub const DEFAULT_STEP: OrderKey = 1000;

/// Assigns and rebalances sparse order keys within one section.
///
/// Keys grow away from a floor of `0`: a missing lower neighbour is treated
/// as `0`, a missing upper neighbour means "extend by one step".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKeyAllocator {
    step: OrderKey,
}

impl Default for OrderKeyAllocator {
    fn default() -> Self {
        OrderKeyAllocator { step: DEFAULT_STEP }
    }
}

impl OrderKeyAllocator {
    /// Create an allocator with a custom step. Steps below 1 are clamped to 1.
    pub fn new(step: OrderKey) -> Self {
        OrderKeyAllocator { step: step.max(1) }
    }

    pub fn step(&self) -> OrderKey {
        self.step
    }

    /// A key strictly between `prev` and `next`.
    ///
    /// Only meaningful when [`needs_rebalance`](Self::needs_rebalance) is
    /// false for the same bounds.
    pub fn key_between(&self, prev: Option<OrderKey>, next: Option<OrderKey>) -> OrderKey {
        match (prev, next) {
            (None, None) => self.step,
            (Some(p), None) => p.saturating_add(self.step),
            (prev, Some(n)) => midpoint(prev.unwrap_or(0), n),
        }
    }

    /// True when no integer fits between the bounds.
    pub fn needs_rebalance(&self, prev: Option<OrderKey>, next: Option<OrderKey>) -> bool {
        match (prev, next) {
            (None, None) => false,
            (Some(p), None) => p.checked_add(self.step).is_none(),
            (prev, Some(n)) => i128::from(n) - i128::from(prev.unwrap_or(0)) <= 1,
        }
    }

    /// Re-space every key in `section` to `step, 2*step, ...` in slice order.
    ///
    /// The slice must be the whole section in display order. Empty and
    /// single-item sections are handled the same way and never fail.
    pub fn rebalance_section<T: Entry>(&self, section: &mut [T]) {
        let mut key: OrderKey = 0;
        for item in section.iter_mut() {
            key = key.saturating_add(self.step);
            item.set_order_key(key);
        }
    }
}

fn midpoint(low: OrderKey, high: OrderKey) -> OrderKey {
    // widen so keys near the integer limits cannot overflow
    ((i128::from(low) + i128::from(high)) / 2) as OrderKey
}

/// True when the keys of `items` strictly increase in slice order
pub fn strictly_increasing<T: Entry>(items: &[T]) -> bool {
    items
        .windows(2)
        .all(|pair| pair[0].order_key() < pair[1].order_key())
}

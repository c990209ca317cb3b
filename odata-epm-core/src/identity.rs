use std::fmt;
use std::sync::Arc;

/// Reference identity of a shared complex or collection value.
///
/// Two structurally equal values have different ids when they are distinct
/// allocations. An id is only meaningful while the value it was taken from is
/// alive, so holders of ids must also hold the `Arc`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(usize);

impl ValueId {
    /// Returns the identity of the allocation behind `value`.
    pub fn of<T: ?Sized>(value: &Arc<T>) -> Self {
        ValueId(Arc::as_ptr(value) as *const () as usize)
    }
}

impl fmt::Debug for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueId({})", self)
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_allocation_same_id() {
        let a = Arc::new("value".to_string());
        let b = Arc::clone(&a);
        assert_eq!(ValueId::of(&a), ValueId::of(&b));
    }

    #[test]
    fn equal_values_distinct_ids() {
        let a = Arc::new("value".to_string());
        let b = Arc::new("value".to_string());
        assert_eq!(a, b);
        assert_ne!(ValueId::of(&a), ValueId::of(&b));
    }

    #[test]
    fn display_is_hex() {
        let a = Arc::new(1u8);
        assert!(format!("{}", ValueId::of(&a)).starts_with("0x"));
    }
}

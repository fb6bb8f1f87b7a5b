use crate::column::ColId;
use crate::properties::PhysicalProp;

/// Ordering of one column.
#[derive(Hash, Debug, Clone, Eq, PartialEq)]
pub struct ColOrder {
    col: ColId,
    /// Ascending or descending.
    asc: bool,
    /// Should null be treated first.
    nulls_first: bool,
}

impl ColOrder {
    pub fn asc(col: ColId) -> Self {
        Self {
            col,
            asc: true,
            nulls_first: false,
        }
    }

    pub fn desc(col: ColId) -> Self {
        Self {
            col,
            asc: false,
            nulls_first: false,
        }
    }
}

/// Ordering property specification.
#[derive(Hash, Debug, Clone, Eq, PartialEq, Default)]
pub struct OrderSpec {
    orders: Vec<ColOrder>,
}

impl OrderSpec {
    pub fn new(orders: Vec<ColOrder>) -> Self {
        Self { orders }
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl PhysicalProp for OrderSpec {
    /// A derived order satisfies a requirement when the requirement is a prefix of it;
    /// extra trailing sort columns are fine.
    fn satisfies(&self, required: &Self) -> bool {
        required.orders.len() <= self.orders.len()
            && required
                .orders
                .iter()
                .zip(self.orders.iter())
                .all(|(r, p)| r == p)
    }
}

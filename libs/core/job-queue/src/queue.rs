/// A named queue and the durability it is declared with.
///
/// Declaring is create-if-absent: repeating it with the same durability is a
/// no-op, a different durability is refused by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
}

impl QueueSpec {
    /// A queue that survives broker restarts.
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
        }
    }

    /// A queue that is dropped on broker restart.
    pub fn transient(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: false,
        }
    }
}

use uuid::Uuid;
use crate::core::Value;

/// Produces primary keys for documents inserted without one.
pub trait IdGenerator: Send + Sync {
    fn generate_id(&self) -> Value;
}

/// Random v4 UUIDs, rendered as text to match the `id text` column of document tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate_id(&self) -> Value {
        Value::Text(Uuid::new_v4().to_string())
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn generate_id(&self) -> Value {
        self()
    }
}

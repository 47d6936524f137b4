use serde::Serialize;

/// Identity of one cached query variant: endpoint name + serialized arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub endpoint: String,
    pub args: String,
}

impl QueryKey {
    /// Build a key with canonical argument JSON
    ///
    /// Arguments go through `serde_json::Value` first, whose maps are
    /// ordered, so two structurally equal argument sets always produce the
    /// same key regardless of field or insertion order.
    pub fn new<A: Serialize + ?Sized>(
        endpoint: impl Into<String>,
        args: &A,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(args)?;
        Ok(Self {
            endpoint: endpoint.into(),
            args: serde_json::to_string(&value)?,
        })
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.endpoint, self.args)
    }
}

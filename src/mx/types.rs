/// A mail exchanger as returned by DNS. Lists of hosts keep the answer order.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxHost {
    pub exchange: String,
    pub preference: u16,
}

impl MxHost {
    pub fn new(exchange: impl Into<String>, preference: u16) -> Self {
        Self {
            exchange: exchange.into(),
            preference,
        }
    }
}

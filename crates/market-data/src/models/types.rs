/// Currency code (ISO 4217)
pub type Currency = String;

// Backends for the external body landmark model
pub mod pose;

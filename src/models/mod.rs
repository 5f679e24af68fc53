// Data models for landmark extraction requests and responses

pub mod pose;
